use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::system::AtomicStructure;
use crate::core::utils::identifiers::residue_atom_order;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must reach column 54)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Reader and writer for fixed-column PDB files.
///
/// Only the first MODEL of a multi-model file (e.g., an NMR ensemble) is
/// read; later models are skipped with a warning.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<AtomicStructure, Self::Error> {
        let mut structure = AtomicStructure::new();
        let mut models_seen = 0usize;
        let mut atoms_read = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "MODEL" => models_seen += 1,
                "ENDMDL" if models_seen == 0 => models_seen = 1,
                "END" => break,
                "ATOM" | "HETATM" if models_seen <= 1 => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let name_str = slice_and_trim(&line, 12, 16);
                    let res_name_str = slice_and_trim(&line, 17, 20);
                    let chain_str = slice_and_trim(&line, 21, 22);
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let icode = line.get(26..27).and_then(|s| s.chars().next());
                    let occupancy_str = slice_and_trim(&line, 54, 60);
                    let element_str = slice_and_trim(&line, 76, 78);

                    if name_str.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let number: i32 = res_seq_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26".into(),
                            value: res_seq_str.into(),
                        },
                    })?;
                    let position = Point3::new(
                        parse_float(&line, line_num, 30, 38)?,
                        parse_float(&line, line_num, 38, 46)?,
                        parse_float(&line, line_num, 46, 54)?,
                    );
                    let occupancy = if occupancy_str.is_empty() {
                        1.0
                    } else {
                        parse_float(&line, line_num, 54, 60)?
                    };

                    let chain_id = structure.add_chain(chain_str);
                    let icode = icode.filter(|c| !c.is_whitespace());
                    let residue_id = structure
                        .add_residue(chain_id, number, icode, res_name_str)
                        .ok_or_else(|| {
                            PdbError::Inconsistency(format!("Chain '{}' vanished", chain_str))
                        })?;

                    let mut atom = Atom::new(name_str, residue_id, position);
                    atom.serial = serial_str.parse().unwrap_or(0);
                    atom.occupancy = occupancy;
                    atom.element = (!element_str.is_empty()).then(|| element_str.to_string());
                    structure.add_atom_to_residue(residue_id, atom);
                    atoms_read += 1;
                }
                _ => {}
            }
        }

        if models_seen > 1 {
            warn!(
                ignored_models = models_seen - 1,
                "Structure contains {} models; only the first is used.", models_seen
            );
        }
        if atoms_read == 0 {
            return Err(PdbError::MissingRecord("ATOM/HETATM".into()));
        }
        Ok(structure)
    }

    fn write_to(structure: &AtomicStructure, writer: &mut impl Write) -> Result<(), Self::Error> {
        let mut serial = 1usize;
        for (_, chain) in structure.chains_iter() {
            let mut chain_chars = chain.id.chars();
            let chain_char = match (chain_chars.next(), chain_chars.next()) {
                (Some(c), None) => c,
                (None, _) => ' ',
                _ => {
                    return Err(PdbError::Inconsistency(format!(
                        "Chain id '{}' does not fit the PDB chain column",
                        chain.id
                    )));
                }
            };

            let mut last_residue = None;
            for &residue_id in chain.residues() {
                let Some(residue) = structure.residue(residue_id) else {
                    continue;
                };
                let mut atoms: Vec<&Atom> = residue
                    .atoms()
                    .iter()
                    .filter_map(|&id| structure.atom(id))
                    .collect();
                atoms.sort_by(|a, b| residue_atom_order(&a.name, &b.name));

                for atom in atoms {
                    let name = if atom.name.len() >= 4 {
                        atom.name.clone()
                    } else {
                        format!(" {}", atom.name)
                    };
                    let element = atom
                        .element
                        .clone()
                        .unwrap_or_else(|| atom.name.chars().take(1).collect());
                    writeln!(
                        writer,
                        "ATOM  {:>5} {:<4} {:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        serial % 100_000,
                        name,
                        residue.name,
                        chain_char,
                        residue.number,
                        residue.insertion_code.unwrap_or(' '),
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        0.0,
                        element
                    )?;
                    serial += 1;
                }
                last_residue = Some(residue);
            }
            if let Some(residue) = last_residue {
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}{}",
                    serial % 100_000,
                    residue.name,
                    chain_char,
                    residue.number,
                    residue.insertion_code.unwrap_or(' ')
                )?;
                serial += 1;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    const TWO_MODELS: &str = "\
MODEL        1
ATOM      1  P     G A   1       1.000   2.000   3.000  1.00  0.00           P
ATOM      2  C1'   G A   1       4.000   5.000   6.000  1.00  0.00           C
ATOM      3  C1'   C A   2A      7.000   8.000   9.000  1.00  0.00           C
ENDMDL
MODEL        2
ATOM      1  P     G A   1      11.000  12.000  13.000  1.00  0.00           P
ENDMDL
MODEL        3
ATOM      1  P     G A   1      21.000  22.000  23.000  1.00  0.00           P
ENDMDL
END
";

    fn read(text: &str) -> Result<AtomicStructure, PdbError> {
        PdbFile::read_from(&mut BufReader::new(Cursor::new(text)))
    }

    mod reading {
        use super::*;

        #[test]
        fn only_first_model_is_read() {
            let s = read(TWO_MODELS).unwrap();
            assert_eq!(s.atom_count(), 3);
            let r = s.find_residue("A", 1, None).unwrap();
            assert_eq!(s.atom_position(r, "P"), Some(Point3::new(1.0, 2.0, 3.0)));
        }

        #[test]
        fn insertion_codes_are_preserved() {
            let s = read(TWO_MODELS).unwrap();
            assert!(s.find_residue("A", 2, Some('A')).is_some());
            assert!(s.find_residue("A", 2, None).is_none());
        }

        #[test]
        fn legacy_star_names_are_normalized() {
            let text = "ATOM      1  C1*   U B  -3       0.000   0.000   0.000  1.00  0.00\n";
            let s = read(text).unwrap();
            let r = s.find_residue("B", -3, None).unwrap();
            assert!(s.residue(r).unwrap().has_atom("C1'"));
        }

        #[test]
        fn alternate_locations_keep_the_first_record() {
            let text = "\
ATOM      1  C1'A  G A   1       1.000   0.000   0.000  0.30  0.00           C
ATOM      2  C1'B  G A   1       2.000   0.000   0.000  0.70  0.00           C
";
            let s = read(text).unwrap();
            let r = s.find_residue("A", 1, None).unwrap();
            assert_eq!(s.atom_position(r, "C1'").unwrap().x, 1.0);
        }

        #[test]
        fn malformed_coordinates_are_reported_with_line() {
            let text = "ATOM      1  P     G A   1       x.000   2.000   3.000  1.00  0.00\n";
            assert!(matches!(
                read(text),
                Err(PdbError::Parse {
                    line: 1,
                    kind: PdbParseErrorKind::InvalidFloat { .. }
                })
            ));
        }

        #[test]
        fn file_without_atoms_is_rejected() {
            assert!(matches!(read("HEADER x\nEND\n"), Err(PdbError::MissingRecord(_))));
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn written_file_reads_back() {
            let s = read(TWO_MODELS).unwrap();
            let mut out = Vec::new();
            PdbFile::write_to(&s, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.ends_with("END\n"));
            let back = read(&text).unwrap();
            assert_eq!(back.atom_count(), 3);
            let r = back.find_residue("A", 2, Some('A')).unwrap();
            assert_eq!(back.atom_position(r, "C1'"), Some(Point3::new(7.0, 8.0, 9.0)));
        }

        #[test]
        fn multi_character_chain_cannot_be_written() {
            let mut s = AtomicStructure::new();
            let c = s.add_chain("AB");
            let r = s.add_residue(c, 1, None, "G").unwrap();
            s.add_atom_to_residue(r, Atom::new("P", r, Point3::origin()));
            let mut out = Vec::new();
            assert!(matches!(
                PdbFile::write_to(&s, &mut out),
                Err(PdbError::Inconsistency(_))
            ));
        }

        #[test]
        fn path_helpers_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("out.pdb");
            let s = read(TWO_MODELS).unwrap();
            PdbFile::write_to_path(&s, &path).unwrap();
            assert_eq!(PdbFile::read_from_path(&path).unwrap().atom_count(), 3);
        }
    }
}
