use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

/// Log level for the `-v` count; `--quiet` silences everything.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: compact output on stderr, plus a plain
/// text copy in `log_file` when one is given.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info, warn};

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0, false), LevelFilter::WARN);
        assert_eq!(level_filter(1, false), LevelFilter::INFO);
        assert_eq!(level_filter(2, false), LevelFilter::DEBUG);
        assert_eq!(level_filter(7, false), LevelFilter::TRACE);
        assert_eq!(level_filter(3, true), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn file_layer_records_build_messages() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("build.log");
        let file = File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(level_filter(2, false))
            .with(fmt::layer().with_writer(file).with_ansi(false));

        tracing::subscriber::with_default(subscriber, || {
            debug!(models = 2, "Built coarse-grained models.");
            info!("Wrote 1XYZ.cg");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Built coarse-grained models."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("models=2"));
    }

    #[test]
    #[serial]
    fn quiet_filter_drops_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("quiet.log");
        let file = File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(level_filter(0, true))
            .with(fmt::layer().with_writer(file).with_ansi(false));

        tracing::subscriber::with_default(subscriber, || {
            warn!("Skipping conflicting base pair");
        });

        assert!(std::fs::read_to_string(log_path).unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn unwritable_log_file_propagates_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(dir.path()));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
