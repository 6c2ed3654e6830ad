//! Single-field extraction: one output row per retained log line position.
//!
//! Unlike the table-block merge, lines are aligned by position rather than by
//! table key, so every follower must reproduce the reference's line structure
//! exactly: same blank lines, same program headers, same number of rows.

use crate::config::{Extraction, FieldLayout};
use crate::discover::Rank;
use crate::error::MergeError;
use crate::merge::{FileRole, IdentityCheck};
use crate::profile::{LineKind, ScannedFile, ScannedLine, TableKey};

use std::path::Path;

/// One line of the extracted sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetLine {
    Blank,
    /// Written as the key followed by every rank label.
    Program(TableKey),
    Header {
        identity: Vec<String>,
        field: String,
    },
    Row {
        identity: Vec<String>,
        /// One value per rank, in rank order.
        values: Vec<String>,
    },
}

impl SheetLine {
    fn describe(&self) -> String {
        match self {
            SheetLine::Blank => "a blank line".to_string(),
            SheetLine::Program(key) => format!("table '{}'", key),
            SheetLine::Header { .. } => "a header row".to_string(),
            SheetLine::Row { .. } => "a data row".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSheet {
    pub extraction: String,
    pub ranks: Vec<Rank>,
    pub lines: Vec<SheetLine>,
}

/// Table currently open while walking a file: key, identity width, field index.
type OpenTable = Option<(TableKey, usize, usize)>;

fn open_table(extraction: &Extraction, key: &TableKey) -> OpenTable {
    match extraction.field_layout(&key.profile_type) {
        Some(FieldLayout::Extract {
            header_columns,
            field,
        }) => Some((key.clone(), header_columns, field)),
        _ => None,
    }
}

fn pick_value(
    path: &Path,
    line: &ScannedLine,
    open: &OpenTable,
    identity: &[String],
    values: &[String],
) -> Result<String, MergeError> {
    let Some((_, header_columns, field)) = open else {
        return Err(MergeError::UnexpectedLine {
            path: path.to_path_buf(),
            line: line.line,
            text: identity.join(" "),
        });
    };
    values
        .get(field - header_columns)
        .cloned()
        .ok_or_else(|| MergeError::MalformedRow {
            path: path.to_path_buf(),
            line: line.line,
            expected: field + 1,
            found: identity.len() + values.len(),
        })
}

/// Accumulates scanned files for one [`Extraction`], in rank order.
pub struct FieldMerger<'a> {
    extraction: &'a Extraction,
    check: IdentityCheck,
    ranks: Vec<Rank>,
    lines: Vec<SheetLine>,
}

impl<'a> FieldMerger<'a> {
    pub fn new(extraction: &'a Extraction, check: IdentityCheck) -> Self {
        Self {
            extraction,
            check,
            ranks: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn add_file(
        &mut self,
        rank: Rank,
        role: FileRole,
        file: &ScannedFile,
    ) -> Result<(), MergeError> {
        match role {
            FileRole::Reference => self.add_reference(file)?,
            FileRole::Follower => self.add_follower(&rank, file)?,
        }
        self.ranks.push(rank);
        Ok(())
    }

    fn add_reference(&mut self, file: &ScannedFile) -> Result<(), MergeError> {
        let mut open: OpenTable = None;
        for line in &file.lines {
            let sheet_line = match &line.kind {
                LineKind::Blank => {
                    open = None;
                    SheetLine::Blank
                }
                LineKind::Program(key) => {
                    open = open_table(self.extraction, key);
                    SheetLine::Program(key.clone())
                }
                LineKind::Header(tokens) => {
                    let (width, field) = open.as_ref().map_or((0, 0), |(_, n, f)| (*n, *f));
                    SheetLine::Header {
                        identity: tokens.iter().take(width).cloned().collect(),
                        field: tokens
                            .get(field)
                            .cloned()
                            .unwrap_or_else(|| format!("field{}", field)),
                    }
                }
                LineKind::Row { identity, values } => SheetLine::Row {
                    identity: identity.clone(),
                    values: vec![pick_value(&file.path, line, &open, identity, values)?],
                },
            };
            self.lines.push(sheet_line);
        }
        Ok(())
    }

    fn add_follower(&mut self, rank: &Rank, file: &ScannedFile) -> Result<(), MergeError> {
        if file.lines.len() != self.lines.len() {
            return Err(MergeError::LineCountMismatch {
                rank: rank.label.clone(),
                expected: self.lines.len(),
                found: file.lines.len(),
            });
        }

        let extraction = self.extraction;
        let check = self.check;
        let mut open: OpenTable = None;
        let mut row_in_table = 0;

        for (position, (line, sheet)) in file.lines.iter().zip(self.lines.iter_mut()).enumerate() {
            match (&line.kind, sheet) {
                (LineKind::Blank, SheetLine::Blank) => open = None,
                (LineKind::Program(key), SheetLine::Program(expected)) if key == expected => {
                    open = open_table(extraction, key);
                    row_in_table = 0;
                }
                (LineKind::Header(_), SheetLine::Header { .. }) => {}
                (
                    LineKind::Row { identity, values },
                    SheetLine::Row {
                        identity: expected,
                        values: merged,
                    },
                ) => {
                    if check == IdentityCheck::Strict && identity != expected {
                        return Err(MergeError::IdentityMismatch {
                            table: open
                                .as_ref()
                                .map(|(key, _, _)| key.to_string())
                                .unwrap_or_default(),
                            rank: rank.label.clone(),
                            row: row_in_table,
                            expected: expected.clone(),
                            found: identity.clone(),
                        });
                    }
                    merged.push(pick_value(&file.path, line, &open, identity, values)?);
                    row_in_table += 1;
                }
                (found, expected) => {
                    return Err(MergeError::StructureMismatch {
                        rank: rank.label.clone(),
                        position,
                        expected: expected.describe(),
                        found: found.describe(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> FieldSheet {
        FieldSheet {
            extraction: self.extraction.name.clone(),
            ranks: self.ranks,
            lines: self.lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Scanner, Tokenizer};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const RANK0: &str = "ServerTimers for Program scf\n\
                         PC Line Name Time BlkWtTime\n\
                         1 10 get 0.5 0.1\n\
                         2 11 put 0.7 0.2\n\
                         \n\
                         Timers for Program scf\n\
                         Name Time\n\
                         total 9.0\n";

    const RANK1: &str = "ServerTimers for Program scf\n\
                         PC Line Name Time BlkWtTime\n\
                         1 10 get 0.6 0.3\n\
                         2 11 put 0.8 0.4\n\
                         \n\
                         Timers for Program scf\n\
                         Name Time\n\
                         total 9.5\n";

    fn rank(label: &str) -> Rank {
        Rank {
            label: label.to_string(),
            path: PathBuf::from(format!("server.profile.{}", label)),
        }
    }

    fn extract(files: &[(&str, &str)]) -> Result<FieldSheet, MergeError> {
        let extraction = Extraction::builtin_blkwt();
        let scanner = Scanner::new(&extraction, Tokenizer::Whitespace).unwrap();
        let mut merger = FieldMerger::new(&extraction, IdentityCheck::Strict);
        for (position, (label, text)) in files.iter().enumerate() {
            let r = rank(label);
            let scanned = scanner.scan_str(&r.path, text)?;
            merger.add_file(r, FileRole::for_position(position), &scanned)?;
        }
        Ok(merger.finish())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_one_field_per_line_position() {
        let sheet = extract(&[("0", RANK0), ("1", RANK1)]).unwrap();

        assert_eq!(sheet.extraction, "blkwt");
        assert_eq!(
            sheet.lines,
            vec![
                SheetLine::Program(TableKey::new("scf", "ServerTimers", 0)),
                SheetLine::Header {
                    identity: strings(&["PC", "Line", "Name"]),
                    field: "BlkWtTime".to_string(),
                },
                SheetLine::Row {
                    identity: strings(&["1", "10", "get"]),
                    values: strings(&["0.1", "0.3"]),
                },
                SheetLine::Row {
                    identity: strings(&["2", "11", "put"]),
                    values: strings(&["0.2", "0.4"]),
                },
                SheetLine::Blank,
            ]
        );
    }

    #[test]
    fn differing_structure_is_reported() {
        let broken = RANK1.replacen("ServerTimers for Program scf", "ServerTimers for Program ccsd", 1);
        let err = extract(&[("0", RANK0), ("1", broken.as_str())]).unwrap_err();
        assert!(matches!(
            err,
            MergeError::StructureMismatch { position: 0, .. }
        ));
    }

    #[test]
    fn differing_line_count_is_reported() {
        let shorter = RANK1.replace("2 11 put 0.8 0.4\n", "");
        let err = extract(&[("0", RANK0), ("1", shorter.as_str())]).unwrap_err();
        assert!(matches!(
            err,
            MergeError::LineCountMismatch {
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn missing_field_token_fails_fast() {
        let short = RANK1.replace("1 10 get 0.6 0.3", "1 10 get 0.6");
        let err = extract(&[("0", RANK0), ("1", short.as_str())]).unwrap_err();
        assert!(matches!(
            err,
            MergeError::MalformedRow {
                line: 3,
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn differing_row_identity_is_reported() {
        let renamed = RANK1.replace("1 10 get", "1 10 put");
        let err = extract(&[("0", RANK0), ("1", renamed.as_str())]).unwrap_err();
        match err {
            MergeError::IdentityMismatch {
                table,
                rank,
                row,
                expected,
                found,
            } => {
                assert_eq!(table, "scf ServerTimers");
                assert_eq!(rank, "1");
                assert_eq!(row, 0);
                assert_eq!(expected, strings(&["1", "10", "get"]));
                assert_eq!(found, strings(&["1", "10", "put"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_header_row_names_field_by_index() {
        let text = "ServerTimers for Program scf\n\
                    PC Line Name Time\n\
                    1 10 get 0.5 0.1\n";
        let sheet = extract(&[("0", text)]).unwrap();
        assert_eq!(
            sheet.lines[1],
            SheetLine::Header {
                identity: strings(&["PC", "Line", "Name"]),
                field: "field4".to_string(),
            }
        );
    }
}
