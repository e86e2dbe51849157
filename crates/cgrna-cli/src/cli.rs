use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cgrna - build, store, and inspect coarse-grained 3D models of RNA.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build coarse-grained models from PDB or mmCIF files.
    Build(BuildArgs),
    /// Print summary statistics of coarse-grained model files.
    Stats(StatsArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Input structure files (.pdb, .cif, .mmcif).
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving one `<model-name>.cg` file per model.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Build configuration in TOML format. Command-line flags override it.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Comma-separated chains to keep, e.g. `A,B`.
    #[arg(long, value_name = "CHAINS")]
    pub chains: Option<String>,

    /// Remove stems made of a single base pair.
    #[arg(long)]
    pub dissolve_length_one_stems: bool,

    /// Keep pseudoknotted base pairs instead of removing them.
    #[arg(long)]
    pub keep_pseudoknots: bool,

    #[command(flatten)]
    pub tool: ToolSelection,

    /// Store the positions of all virtual residues in the output files.
    #[arg(long)]
    pub with_vres: bool,
}

/// Mutually exclusive annotation tool overrides.
#[derive(Args, Debug, Clone)]
#[group(required = false, multiple = false)]
pub struct ToolSelection {
    /// Run this MC-Annotate executable for base-pair annotation.
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,
    /// Detect canonical base pairs from geometry instead of running a tool.
    #[arg(long)]
    pub geometric: bool,
}

/// Arguments for the `stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Coarse-grained model files (.cg).
    #[arg(required = true, value_name = "CG")]
    pub inputs: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_arguments_parse() {
        let cli = Cli::try_parse_from([
            "cgrna", "-vv", "build", "a.pdb", "b.cif", "-o", "out", "--chains", "A,B", "--geometric",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.inputs, vec![PathBuf::from("a.pdb"), PathBuf::from("b.cif")]);
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.chains.as_deref(), Some("A,B"));
        assert!(args.tool.geometric);
        assert!(!args.with_vres);
    }

    #[test]
    fn tool_and_geometric_conflict() {
        let result = Cli::try_parse_from(["cgrna", "build", "a.pdb", "--tool", "x", "--geometric"]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["cgrna", "-q", "-v", "stats", "x.cg"]).is_err());
    }
}
