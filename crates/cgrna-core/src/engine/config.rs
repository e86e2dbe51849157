use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Program used to find base pairs in an atomic structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnnotationTool {
    /// The external MC-Annotate program, looked up on `PATH` unless given
    /// as a path.
    McAnnotate { program: String },
    /// Built-in detection of canonical pairs from base geometry.
    Geometric,
}

impl Default for AnnotationTool {
    fn default() -> Self {
        AnnotationTool::McAnnotate {
            program: DEFAULT_MC_ANNOTATE.to_string(),
        }
    }
}

pub const DEFAULT_MC_ANNOTATE: &str = "MC-Annotate";

/// Options for turning an atomic structure into coarse-grained models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BuildConfig {
    pub annotation_tool: AnnotationTool,
    /// Chains to keep; all chains when `None`.
    pub load_chains: Option<Vec<String>>,
    pub remove_pseudoknots: bool,
    pub dissolve_length_one_stems: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            annotation_tool: AnnotationTool::default(),
            load_chains: None,
            remove_pseudoknots: true,
            dissolve_length_one_stems: false,
        }
    }
}

impl BuildConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: BuildConfig = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(chains) = &self.load_chains {
            if chains.is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "load-chains",
                    reason: "the chain list is empty".into(),
                });
            }
            if chains.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::InvalidParameter {
                    name: "load-chains",
                    reason: "chain ids must not be blank".into(),
                });
            }
        }
        if let AnnotationTool::McAnnotate { program } = &self.annotation_tool {
            if program.trim().is_empty() {
                return Err(ConfigError::MissingParameter("annotation-tool.program"));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    annotation_tool: Option<AnnotationTool>,
    load_chains: Option<Vec<String>>,
    remove_pseudoknots: Option<bool>,
    dissolve_length_one_stems: Option<bool>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: BuildConfig) -> Self {
        Self {
            annotation_tool: Some(config.annotation_tool),
            load_chains: config.load_chains,
            remove_pseudoknots: Some(config.remove_pseudoknots),
            dissolve_length_one_stems: Some(config.dissolve_length_one_stems),
        }
    }

    pub fn annotation_tool(mut self, tool: AnnotationTool) -> Self {
        self.annotation_tool = Some(tool);
        self
    }
    pub fn load_chains(mut self, chains: Vec<String>) -> Self {
        self.load_chains = Some(chains);
        self
    }
    pub fn remove_pseudoknots(mut self, remove: bool) -> Self {
        self.remove_pseudoknots = Some(remove);
        self
    }
    pub fn dissolve_length_one_stems(mut self, dissolve: bool) -> Self {
        self.dissolve_length_one_stems = Some(dissolve);
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let defaults = BuildConfig::default();
        let config = BuildConfig {
            annotation_tool: self.annotation_tool.unwrap_or(defaults.annotation_tool),
            load_chains: self.load_chains,
            remove_pseudoknots: self
                .remove_pseudoknots
                .unwrap_or(defaults.remove_pseudoknots),
            dissolve_length_one_stems: self
                .dissolve_length_one_stems
                .unwrap_or(defaults.dissolve_length_one_stems),
        };
        config.validate()?;
        Ok(config)
    }
}
