use crate::config::{RowLayouts, TableLayout};
use crate::error::MergeError;
use crate::profile::table::{LineKind, ScannedFile, ScannedLine, TableKey};
use crate::profile::token::{Splitter, Tokenizer};

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// `<profile_type> for Program <program_name>`, keywords case-insensitive.
const PROGRAM_LINE_RE: &str = r"(?i)^\s*(\S.*?)\s+for\s+program\s+(\S.*?)\s*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    AfterHeader { header_columns: usize },
    DataRow { header_columns: usize },
    Skipping,
}

/// Splits a profile log into tables.
///
/// Grammar, per block (blocks separated by blank lines):
/// ```text
/// Timers for Program scf_rhf
/// Name        Time      Epochs
/// sip_barrier 0.25      4
/// ```
/// The first line after the program line is the column header; every further
/// non-blank line is a data row until a blank line or another program line.
pub struct Scanner<'a, L: RowLayouts> {
    layouts: &'a L,
    splitter: Splitter,
    program_re: Regex,
}

impl<'a, L: RowLayouts> Scanner<'a, L> {
    pub fn new(layouts: &'a L, tokenizer: Tokenizer) -> Result<Self, MergeError> {
        Ok(Self {
            layouts,
            splitter: Splitter::new(tokenizer)?,
            program_re: Regex::new(PROGRAM_LINE_RE)?,
        })
    }

    /// Read and scan one file. The file is closed before this returns.
    pub fn scan_file(&self, path: &Path) -> Result<ScannedFile, MergeError> {
        let text = fs::read_to_string(path).map_err(|source| MergeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.scan_str(path, &text)
    }

    pub fn scan_str(&self, path: &Path, text: &str) -> Result<ScannedFile, MergeError> {
        let mut state = State::Idle;
        let mut occurrences: HashMap<(String, String), usize> = HashMap::new();
        let mut lines = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let lno = lineno + 1;

            if raw.trim().is_empty() {
                state = State::Idle;
                lines.push(ScannedLine {
                    line: lno,
                    kind: LineKind::Blank,
                });
                continue;
            }
            if state == State::Skipping {
                continue;
            }

            if let Some(caps) = self.program_re.captures(raw) {
                let profile_type = caps[1].trim();
                let program = caps[2].trim();

                let layout = self.layouts.row_layout(profile_type).ok_or_else(|| {
                    MergeError::UnknownProfileType {
                        path: path.to_path_buf(),
                        line: lno,
                        profile_type: profile_type.to_string(),
                    }
                })?;

                match layout {
                    TableLayout::Skip => {
                        log::debug!(
                            "{}:{}: skipping {} table of {}",
                            path.display(),
                            lno,
                            profile_type,
                            program
                        );
                        state = State::Skipping;
                    }
                    TableLayout::Include { header_columns } => {
                        let seen = occurrences
                            .entry((program.to_string(), profile_type.to_string()))
                            .or_insert(0);
                        let key = TableKey::new(program, profile_type, *seen);
                        *seen += 1;

                        lines.push(ScannedLine {
                            line: lno,
                            kind: LineKind::Program(key),
                        });
                        state = State::AfterHeader { header_columns };
                    }
                }
                continue;
            }

            match state {
                State::Idle => {
                    return Err(MergeError::UnexpectedLine {
                        path: path.to_path_buf(),
                        line: lno,
                        text: raw.trim().to_string(),
                    });
                }
                State::AfterHeader { header_columns } => {
                    lines.push(ScannedLine {
                        line: lno,
                        kind: LineKind::Header(self.splitter.split(raw)),
                    });
                    state = State::DataRow { header_columns };
                }
                State::DataRow { header_columns } => {
                    let mut identity = self.splitter.split(raw);
                    if identity.len() < header_columns {
                        return Err(MergeError::MalformedRow {
                            path: path.to_path_buf(),
                            line: lno,
                            expected: header_columns,
                            found: identity.len(),
                        });
                    }
                    let values = identity.split_off(header_columns);
                    lines.push(ScannedLine {
                        line: lno,
                        kind: LineKind::Row { identity, values },
                    });
                }
                State::Skipping => {}
            }
        }

        log::debug!("{}: {} retained lines", path.display(), lines.len());
        Ok(ScannedFile {
            path: path.to_path_buf(),
            lines,
        })
    }
}
