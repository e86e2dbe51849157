use crate::cli::StatsArgs;
use crate::error::{CliError, Result};
use cgrna::core::graph::element::ElementKind;
use cgrna::engine::model::CoarseGrainRna;
use cgrna::engine::stats::RogMethod;
use std::fmt::Write;
use tracing::info;

const KINDS: [(ElementKind, &str); 6] = [
    (ElementKind::Stem, "stems"),
    (ElementKind::Interior, "interior loops"),
    (ElementKind::Multiloop, "multiloop segments"),
    (ElementKind::Hairpin, "hairpins"),
    (ElementKind::Fiveprime, "5' tails"),
    (ElementKind::Threeprime, "3' tails"),
];

pub fn run(args: StatsArgs) -> Result<()> {
    for path in &args.inputs {
        info!("Reading {:?}", path);
        let cg = CoarseGrainRna::from_cg_file(path).map_err(|source| CliError::CgFile {
            path: path.clone(),
            source,
        })?;
        print!("{}", summarize(&cg)?);
    }
    Ok(())
}

/// Human-readable summary of a model: element counts, radius of gyration,
/// and per-stem geometry.
pub fn summarize(cg: &CoarseGrainRna) -> Result<String> {
    let mut out = String::new();
    write_summary(cg, &mut out)?;
    Ok(out)
}

fn write_summary(cg: &CoarseGrainRna, out: &mut impl Write) -> Result<()> {
    let graph = cg.graph();
    writeln!(out, "{}", cg.name())?;
    writeln!(
        out,
        "  residues: {}  chains: {}",
        cg.seq_length(),
        graph.chains().join(",")
    )?;
    writeln!(out, "  structure: {}", graph.to_dotbracket_string())?;
    for (kind, label) in KINDS {
        let count = graph.elements_of(kind).count();
        if count > 0 {
            writeln!(out, "  {}: {}", label, count)?;
        }
    }

    if !cg.is_complete() {
        writeln!(out, "  geometry: incomplete")?;
        return Ok(());
    }
    writeln!(
        out,
        "  radius of gyration: {:.3} (endpoints), {:.3} (virtual residues)",
        cg.radius_of_gyration(RogMethod::Fast)?,
        cg.radius_of_gyration(RogMethod::Vres)?
    )?;
    for stem in graph.stem_iterator() {
        let stat = cg.get_stem_stats(stem)?;
        writeln!(
            out,
            "  {}: {} bp, length {:.2}, twist {:.1} deg",
            stem,
            stat.bp_length,
            stat.phys_length,
            stat.twist_angle.to_degrees()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgrna::core::graph::element::ElementId;
    use nalgebra::{Point3, Vector3};
    use std::path::PathBuf;

    fn hairpin() -> CoarseGrainRna {
        let mut cg = CoarseGrainRna::from_dotbracket("((((....))))", Some("GGGGAAAACCCC")).unwrap();
        cg.set_name("hp");
        let s0: ElementId = "s0".parse().unwrap();
        let h0: ElementId = "h0".parse().unwrap();
        let top = Point3::new(0.0, 0.0, 3.0 * 2.81);
        cg.set_coords(s0, Point3::origin(), top).unwrap();
        cg.set_twists(s0, Vector3::x(), Vector3::y()).unwrap();
        cg.set_coords(h0, top, top + Vector3::z() * 6.0).unwrap();
        cg
    }

    #[test]
    fn summary_lists_counts_and_stems() {
        let text = summarize(&hairpin()).unwrap();
        assert!(text.starts_with("hp\n"));
        assert!(text.contains("residues: 12  chains: A"));
        assert!(text.contains("((((....))))"));
        assert!(text.contains("stems: 1"));
        assert!(text.contains("hairpins: 1"));
        assert!(!text.contains("interior loops"));
        assert!(text.contains("s0: 4 bp, length 8.43, twist 90.0 deg"));
        assert!(text.contains("radius of gyration"));
    }

    #[test]
    fn model_without_geometry_is_marked_incomplete() {
        let cg = CoarseGrainRna::from_dotbracket("((..))", None).unwrap();
        let text = summarize(&cg).unwrap();
        assert!(text.contains("geometry: incomplete"));
        assert!(!text.contains("radius"));
    }

    #[test]
    fn output_failures_are_propagated() {
        struct Closed;
        impl Write for Closed {
            fn write_str(&mut self, _: &str) -> std::fmt::Result {
                Err(std::fmt::Error)
            }
        }
        let err = write_summary(&hairpin(), &mut Closed).unwrap_err();
        assert!(matches!(err, CliError::Format(_)));
    }

    #[test]
    fn run_reads_cg_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hp.cg");
        hairpin().to_cg_file(&path).unwrap();
        run(StatsArgs { inputs: vec![path] }).unwrap();
    }

    #[test]
    fn unreadable_file_reports_the_path() {
        let path = PathBuf::from("/nonexistent/model.cg");
        let err = run(StatsArgs {
            inputs: vec![path.clone()],
        })
        .unwrap_err();
        assert!(matches!(err, CliError::CgFile { path: p, .. } if p == path));
    }
}
