use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::system::AtomicStructure;
use crate::core::utils::identifiers::residue_atom_order;
use nalgebra::Point3;
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MmcifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: MmcifParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum MmcifParseErrorKind {
    #[error("Required _atom_site column '{0}' is absent")]
    MissingColumn(String),
    #[error("Invalid number in column '{column}' (value: '{value}')")]
    InvalidNumber { column: String, value: String },
    #[error("Unterminated quoted token")]
    UnterminatedQuote,
}

/// Splits a CIF data line into tokens. A quote only closes a token when it is
/// followed by whitespace or the end of the line, so atom names like `C1'`
/// survive inside double quotes.
fn tokenize(line: &str) -> Result<Vec<String>, MmcifParseErrorKind> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        if chars[i] == '#' {
            break;
        }
        if chars[i] == '\'' || chars[i] == '"' {
            let quote = chars[i];
            let start = i + 1;
            let mut j = start;
            loop {
                if j >= chars.len() {
                    return Err(MmcifParseErrorKind::UnterminatedQuote);
                }
                if chars[j] == quote && chars.get(j + 1).is_none_or(|c| c.is_whitespace()) {
                    break;
                }
                j += 1;
            }
            tokens.push(chars[start..j].iter().collect());
            i = j + 1;
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    Ok(tokens)
}

fn is_missing(value: &str) -> bool {
    value == "?" || value == "."
}

struct AtomSiteColumns {
    atom_name: usize,
    residue_name: usize,
    chain: usize,
    number: usize,
    icode: Option<usize>,
    x: usize,
    y: usize,
    z: usize,
    occupancy: Option<usize>,
    model: Option<usize>,
    serial: Option<usize>,
    element: Option<usize>,
}

impl AtomSiteColumns {
    fn resolve(names: &[String], line: usize) -> Result<Self, MmcifError> {
        let index: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let any = |candidates: &[&str]| candidates.iter().find_map(|c| index.get(c).copied());
        let require = |candidates: &[&str]| {
            any(candidates).ok_or_else(|| MmcifError::Parse {
                line,
                kind: MmcifParseErrorKind::MissingColumn(candidates[0].to_string()),
            })
        };
        Ok(Self {
            atom_name: require(&["auth_atom_id", "label_atom_id"])?,
            residue_name: require(&["auth_comp_id", "label_comp_id"])?,
            chain: require(&["auth_asym_id", "label_asym_id"])?,
            number: require(&["auth_seq_id", "label_seq_id"])?,
            icode: any(&["pdbx_PDB_ins_code"]),
            x: require(&["Cartn_x"])?,
            y: require(&["Cartn_y"])?,
            z: require(&["Cartn_z"])?,
            occupancy: any(&["occupancy"]),
            model: any(&["pdbx_PDB_model_num"]),
            serial: any(&["id"]),
            element: any(&["type_symbol"]),
        })
    }
}

/// Reader and writer for the `_atom_site` category of mmCIF files.
///
/// Author chain ids, residue numbers, and insertion codes are preferred over
/// their `label_` counterparts. Only the first model is read.
pub struct MmcifFile;

impl MmcifFile {
    fn add_row(
        structure: &mut AtomicStructure,
        columns: &AtomSiteColumns,
        row: &[String],
        line: usize,
    ) -> Result<(), MmcifError> {
        let number_at = |col: usize, name: &str| -> Result<f64, MmcifError> {
            row[col].parse::<f64>().map_err(|_| MmcifError::Parse {
                line,
                kind: MmcifParseErrorKind::InvalidNumber {
                    column: name.to_string(),
                    value: row[col].clone(),
                },
            })
        };

        let number: i32 = row[columns.number]
            .parse()
            .map_err(|_| MmcifError::Parse {
                line,
                kind: MmcifParseErrorKind::InvalidNumber {
                    column: "auth_seq_id".into(),
                    value: row[columns.number].clone(),
                },
            })?;
        let icode = columns
            .icode
            .map(|c| row[c].as_str())
            .filter(|v| !is_missing(v))
            .and_then(|v| v.chars().next());
        let position = Point3::new(
            number_at(columns.x, "Cartn_x")?,
            number_at(columns.y, "Cartn_y")?,
            number_at(columns.z, "Cartn_z")?,
        );

        let chain_id = structure.add_chain(&row[columns.chain]);
        let Some(residue_id) =
            structure.add_residue(chain_id, number, icode, &row[columns.residue_name])
        else {
            return Ok(());
        };

        let mut atom = Atom::new(&row[columns.atom_name], residue_id, position);
        if let Some(col) = columns.occupancy.filter(|&c| !is_missing(&row[c])) {
            atom.occupancy = number_at(col, "occupancy")?;
        }
        atom.serial = columns
            .serial
            .and_then(|c| row[c].parse().ok())
            .unwrap_or(0);
        atom.element = columns
            .element
            .map(|c| row[c].clone())
            .filter(|e| !is_missing(e));
        structure.add_atom_to_residue(residue_id, atom);
        Ok(())
    }
}

impl StructureFile for MmcifFile {
    type Error = MmcifError;

    fn read_from(reader: &mut impl BufRead) -> Result<AtomicStructure, Self::Error> {
        let mut structure = AtomicStructure::new();
        let mut in_loop_header = false;
        let mut in_text_field = false;
        let mut column_names: Vec<String> = Vec::new();
        let mut columns: Option<AtomSiteColumns> = None;
        let mut pending: Vec<String> = Vec::new();
        let mut first_model: Option<String> = None;
        let mut ignored_models = BTreeSet::new();
        let mut atoms_read = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            if line.starts_with(';') {
                in_text_field = !in_text_field;
                continue;
            }
            if in_text_field {
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if trimmed.starts_with("loop_") {
                in_loop_header = true;
                column_names.clear();
                columns = None;
                continue;
            }
            if let Some(field) = trimmed.strip_prefix("_atom_site.") {
                if in_loop_header {
                    column_names.push(field.trim().to_string());
                }
                continue;
            }
            if trimmed.starts_with('_') || trimmed.starts_with("data_") {
                in_loop_header = false;
                columns = None;
                continue;
            }

            if in_loop_header {
                in_loop_header = false;
                if !column_names.is_empty() {
                    columns = Some(AtomSiteColumns::resolve(&column_names, line_num)?);
                }
            }
            let Some(cols) = columns.as_ref() else {
                continue;
            };

            let tokens = tokenize(&line).map_err(|kind| MmcifError::Parse {
                line: line_num,
                kind,
            })?;
            pending.extend(tokens);
            while pending.len() >= column_names.len() {
                let row: Vec<String> = pending.drain(..column_names.len()).collect();
                if let Some(model) = cols.model.map(|c| row[c].clone()) {
                    let first = first_model.get_or_insert_with(|| model.clone());
                    if *first != model {
                        ignored_models.insert(model);
                        continue;
                    }
                }
                Self::add_row(&mut structure, cols, &row, line_num)?;
                atoms_read += 1;
            }
        }

        if !ignored_models.is_empty() {
            warn!(
                ignored_models = ignored_models.len(),
                "Structure contains {} models; only the first is used.",
                ignored_models.len() + 1
            );
        }
        if atoms_read == 0 {
            return Err(MmcifError::MissingRecord("_atom_site".into()));
        }
        Ok(structure)
    }

    fn write_to(structure: &AtomicStructure, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "data_cgrna")?;
        writeln!(writer, "loop_")?;
        for field in [
            "group_PDB",
            "id",
            "type_symbol",
            "auth_atom_id",
            "auth_comp_id",
            "auth_asym_id",
            "auth_seq_id",
            "pdbx_PDB_ins_code",
            "Cartn_x",
            "Cartn_y",
            "Cartn_z",
            "occupancy",
            "pdbx_PDB_model_num",
        ] {
            writeln!(writer, "_atom_site.{}", field)?;
        }

        let quote = |s: &str| {
            if s.contains('\'') {
                format!("\"{}\"", s)
            } else {
                s.to_string()
            }
        };

        let mut serial = 1usize;
        for (_, residue) in structure.residues_in_order() {
            let chain = structure
                .chain(residue.chain_id)
                .map(|c| c.id.as_str())
                .unwrap_or("?");
            let mut atoms: Vec<&Atom> = residue
                .atoms()
                .iter()
                .filter_map(|&id| structure.atom(id))
                .collect();
            atoms.sort_by(|a, b| residue_atom_order(&a.name, &b.name));
            for atom in atoms {
                let element = atom
                    .element
                    .clone()
                    .unwrap_or_else(|| atom.name.chars().take(1).collect());
                writeln!(
                    writer,
                    "ATOM {} {} {} {} {} {} {} {:.3} {:.3} {:.3} {:.2} 1",
                    serial,
                    element,
                    quote(&atom.name),
                    residue.name,
                    chain,
                    residue.number,
                    residue.insertion_code.map_or("?".to_string(), |c| c.to_string()),
                    atom.position.x,
                    atom.position.y,
                    atom.position.z,
                    atom.occupancy,
                )?;
                serial += 1;
            }
        }
        writeln!(writer, "#")?;
        Ok(())
    }
}
