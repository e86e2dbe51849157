use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::parse_chain_list;
use crate::utils::progress::CliProgressHandler;
use cgrna::engine::config::{AnnotationTool, BuildConfig, BuildConfigBuilder};
use cgrna::engine::progress::ProgressReporter;
use cgrna::workflows;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(args: BuildArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    std::fs::create_dir_all(&args.output_dir)?;

    let progress_handler = CliProgressHandler::new(args.inputs.len() as u64);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let mut written: Vec<PathBuf> = Vec::new();
    for input in &args.inputs {
        progress_handler.start_input(input);
        info!("Building models from {:?}", input);

        let models = workflows::build::run(input, &config, &reporter).map_err(|source| {
            if source.is_tool_unavailable() {
                warn!("The annotation tool is not installed; pass --geometric to detect base pairs without it.");
            }
            CliError::Build {
                path: input.clone(),
                source,
            }
        })?;
        if models.is_empty() {
            warn!("No models were built from {:?}", input);
        }

        for mut model in models {
            if args.with_vres {
                model.add_all_virtual_residues()?;
            }
            let output_path = args.output_dir.join(format!("{}.cg", model.name()));
            model
                .to_cg_file(&output_path)
                .map_err(|source| CliError::CgFile {
                    path: output_path.clone(),
                    source,
                })?;
            info!("Wrote {:?}", &output_path);
            written.push(output_path);
        }
        progress_handler.finish_input();
    }
    progress_handler.finish();

    for path in &written {
        println!("  {}", path.display());
    }
    println!("✓ Wrote {} model file(s).", written.len());
    Ok(())
}

/// Starts from the config file (or the defaults) and applies the
/// command-line overrides.
fn resolve_config(args: &BuildArgs) -> Result<BuildConfig> {
    let base = match &args.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };
    let mut builder = BuildConfigBuilder::from_config(base);

    if let Some(chains) = &args.chains {
        builder = builder.load_chains(parse_chain_list(chains)?);
    }
    if args.dissolve_length_one_stems {
        builder = builder.dissolve_length_one_stems(true);
    }
    if args.keep_pseudoknots {
        builder = builder.remove_pseudoknots(false);
    }
    if let Some(program) = &args.tool.tool {
        builder = builder.annotation_tool(AnnotationTool::McAnnotate {
            program: program.clone(),
        });
    } else if args.tool.geometric {
        builder = builder.annotation_tool(AnnotationTool::Geometric);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ToolSelection;
    use cgrna::core::io::pdb::PdbFile;
    use cgrna::core::io::traits::StructureFile;
    use cgrna::core::models::atom::Atom;
    use cgrna::core::models::system::AtomicStructure;
    use cgrna::engine::model::CoarseGrainRna;
    use nalgebra::Point3;
    use std::io::Write;
    use std::path::Path;

    fn args(inputs: Vec<PathBuf>, output_dir: &Path) -> BuildArgs {
        BuildArgs {
            inputs,
            output_dir: output_dir.to_path_buf(),
            config: None,
            chains: None,
            dissolve_length_one_stems: false,
            keep_pseudoknots: false,
            tool: ToolSelection {
                tool: None,
                geometric: true,
            },
            with_vres: false,
        }
    }

    /// A short single strand with only C1' atoms, spaced like a backbone.
    fn write_strand(path: &Path) {
        let mut s = AtomicStructure::new();
        let chain = s.add_chain("A");
        for (i, name) in ["G", "A", "C", "U"].iter().enumerate() {
            let r = s.add_residue(chain, i as i32 + 1, None, name).unwrap();
            let pos = Point3::new(i as f64 * 5.5, 0.0, 0.0);
            s.add_atom_to_residue(r, Atom::new("C1'", r, pos)).unwrap();
        }
        PdbFile::write_to_path(&s, path).unwrap();
    }

    mod config {
        use super::*;

        #[test]
        fn flags_override_the_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let mut a = args(vec![], dir.path());
            a.chains = Some("A, B".into());
            a.keep_pseudoknots = true;
            a.dissolve_length_one_stems = true;
            let config = resolve_config(&a).unwrap();
            assert_eq!(config.annotation_tool, AnnotationTool::Geometric);
            assert_eq!(config.load_chains, Some(vec!["A".into(), "B".into()]));
            assert!(!config.remove_pseudoknots);
            assert!(config.dissolve_length_one_stems);
        }

        #[test]
        fn tool_flag_replaces_file_setting() {
            let dir = tempfile::tempdir().unwrap();
            let config_path = dir.path().join("build.toml");
            let mut file = std::fs::File::create(&config_path).unwrap();
            writeln!(file, "remove-pseudoknots = false\n\n[annotation-tool]\nkind = \"geometric\"").unwrap();

            let mut a = args(vec![], dir.path());
            a.config = Some(config_path);
            a.tool = ToolSelection {
                tool: Some("/opt/mca/MC-Annotate".into()),
                geometric: false,
            };
            let config = resolve_config(&a).unwrap();
            assert_eq!(
                config.annotation_tool,
                AnnotationTool::McAnnotate {
                    program: "/opt/mca/MC-Annotate".into()
                }
            );
            assert!(!config.remove_pseudoknots);
        }

        #[test]
        fn malformed_chain_list_is_an_argument_error() {
            let dir = tempfile::tempdir().unwrap();
            let mut a = args(vec![], dir.path());
            a.chains = Some("A,,B".into());
            assert!(matches!(resolve_config(&a), Err(CliError::Argument(_))));
        }
    }

    mod run {
        use super::*;

        #[test]
        fn writes_one_cg_file_per_model() {
            let dir = tempfile::tempdir().unwrap();
            let input = dir.path().join("strand.pdb");
            write_strand(&input);
            let out = dir.path().join("models");

            let mut a = args(vec![input], &out);
            a.with_vres = true;
            run(a).unwrap();

            let cg = CoarseGrainRna::from_cg_file(out.join("strand.cg")).unwrap();
            assert_eq!(cg.name(), "strand");
            assert_eq!(cg.graph().seq(), "GACU");
            assert!(cg.embeds_virtual_residues());
        }

        #[test]
        fn missing_input_reports_the_path() {
            let dir = tempfile::tempdir().unwrap();
            let input = dir.path().join("absent.pdb");
            let err = run(args(vec![input.clone()], dir.path())).unwrap_err();
            match err {
                CliError::Build { path, .. } => assert_eq!(path, input),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
