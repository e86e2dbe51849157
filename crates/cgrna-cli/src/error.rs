use crate::utils::parser::ParseError;
use cgrna::engine::config::ConfigError;
use cgrna::engine::error::ModelError;
use cgrna::engine::serialize::CgError;
use cgrna::workflows::build::BuildError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to build models from '{path}': {source}", path = path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: BuildError,
    },

    #[error("Failed to process '{path}': {source}", path = path.display())]
    CgFile {
        path: PathBuf,
        #[source]
        source: CgError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to format output: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Invalid argument: {0}")]
    Argument(#[from] ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
