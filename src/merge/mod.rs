//! Cross-rank alignment: fold scanned files into merged tables.
//!
//! The reference rank (first in rank order) fixes each table's header row and
//! identity columns. Followers only contribute values, and are checked
//! against the reference as they are added:
//! - every reference table exists in every follower and vice versa
//! - row counts agree
//! - identity tuples agree (unless the check is relaxed)

pub mod fields;

pub use fields::{FieldMerger, FieldSheet, SheetLine};

use crate::discover::Rank;
use crate::error::MergeError;
use crate::profile::{LineKind, ScannedFile, TableKey};

use std::collections::BTreeMap;

/// Which part a file plays in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Authoritative for header rows and header columns.
    Reference,
    /// Contributes data rows only.
    Follower,
}

impl FileRole {
    pub fn for_position(position: usize) -> Self {
        if position == 0 {
            FileRole::Reference
        } else {
            FileRole::Follower
        }
    }
}

/// How strictly follower rows are matched against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityCheck {
    /// Identity tuples must be equal row by row.
    #[default]
    Strict,
    /// Only row counts are compared.
    Relaxed,
}

/// One table merged across all ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTable {
    pub key: TableKey,
    pub header_row: Vec<String>,
    pub header_columns: Vec<Vec<String>>,
    /// `data[rank][row][field]`
    pub data: Vec<Vec<Vec<String>>>,
}

impl MergedTable {
    /// Number of identity columns, taken from the first reference row.
    pub fn identity_width(&self) -> usize {
        self.header_columns.first().map_or(0, Vec::len)
    }

    /// Number of value fields, taken from the first reference row.
    pub fn field_count(&self) -> usize {
        self.data
            .first()
            .and_then(|rows| rows.first())
            .map_or(0, Vec::len)
    }
}

/// Result of a table-block merge, ready to be written.
#[derive(Debug, Clone)]
pub struct MergedTables {
    pub ranks: Vec<Rank>,
    /// Sorted by key.
    pub tables: Vec<MergedTable>,
}

/// Rows of one table within a single file.
struct FileTable {
    header_row: Vec<String>,
    rows: Vec<(Vec<String>, Vec<String>)>,
}

fn collect_tables(file: &ScannedFile) -> BTreeMap<TableKey, FileTable> {
    let mut tables: BTreeMap<TableKey, FileTable> = BTreeMap::new();
    let mut current: Option<TableKey> = None;

    for line in &file.lines {
        match &line.kind {
            LineKind::Blank => current = None,
            LineKind::Program(key) => {
                tables.insert(
                    key.clone(),
                    FileTable {
                        header_row: Vec::new(),
                        rows: Vec::new(),
                    },
                );
                current = Some(key.clone());
            }
            LineKind::Header(tokens) => {
                if let Some(table) = current.as_ref().and_then(|k| tables.get_mut(k)) {
                    table.header_row = tokens.clone();
                }
            }
            LineKind::Row { identity, values } => {
                if let Some(table) = current.as_ref().and_then(|k| tables.get_mut(k)) {
                    table.rows.push((identity.clone(), values.clone()));
                }
            }
        }
    }

    tables
}

/// Accumulates scanned files, one rank at a time, in rank order.
#[derive(Debug, Default)]
pub struct TableMerger {
    check: IdentityCheck,
    ranks: Vec<Rank>,
    tables: BTreeMap<TableKey, MergedTable>,
}

impl TableMerger {
    pub fn new(check: IdentityCheck) -> Self {
        Self {
            check,
            ranks: Vec::new(),
            tables: BTreeMap::new(),
        }
    }

    pub fn add_file(
        &mut self,
        rank: Rank,
        role: FileRole,
        file: &ScannedFile,
    ) -> Result<(), MergeError> {
        let tables = collect_tables(file);
        match role {
            FileRole::Reference => self.add_reference(tables),
            FileRole::Follower => self.add_follower(&rank, tables)?,
        }
        self.ranks.push(rank);
        Ok(())
    }

    fn add_reference(&mut self, tables: BTreeMap<TableKey, FileTable>) {
        for (key, table) in tables {
            let (header_columns, values): (Vec<_>, Vec<_>) = table.rows.into_iter().unzip();
            self.tables.insert(
                key.clone(),
                MergedTable {
                    key,
                    header_row: table.header_row,
                    header_columns,
                    data: vec![values],
                },
            );
        }
    }

    fn add_follower(
        &mut self,
        rank: &Rank,
        mut tables: BTreeMap<TableKey, FileTable>,
    ) -> Result<(), MergeError> {
        let reference = self
            .ranks
            .first()
            .map(|r| r.label.clone())
            .unwrap_or_default();

        if let Some(key) = tables.keys().find(|k| !self.tables.contains_key(*k)) {
            return Err(MergeError::UnknownTable {
                table: key.to_string(),
                rank: rank.label.clone(),
                reference,
            });
        }

        for (key, merged) in self.tables.iter_mut() {
            let table = tables.remove(key).ok_or_else(|| MergeError::MissingTable {
                table: key.to_string(),
                rank: rank.label.clone(),
            })?;

            if table.rows.len() != merged.header_columns.len() {
                return Err(MergeError::RowCountMismatch {
                    table: key.to_string(),
                    rank: rank.label.clone(),
                    expected: merged.header_columns.len(),
                    found: table.rows.len(),
                });
            }

            let mut values = Vec::with_capacity(table.rows.len());
            for (row, (identity, row_values)) in table.rows.into_iter().enumerate() {
                if self.check == IdentityCheck::Strict && identity != merged.header_columns[row] {
                    return Err(MergeError::IdentityMismatch {
                        table: key.to_string(),
                        rank: rank.label.clone(),
                        row,
                        expected: merged.header_columns[row].clone(),
                        found: identity,
                    });
                }
                values.push(row_values);
            }
            merged.data.push(values);
        }

        Ok(())
    }

    /// Check value widths and header coverage, and hand back sorted tables.
    pub fn finish(self) -> Result<MergedTables, MergeError> {
        for table in self.tables.values() {
            let fields = table.field_count();
            for (rank, rows) in self.ranks.iter().zip(&table.data) {
                if let Some((row, values)) = rows.iter().enumerate().find(|(_, v)| v.len() < fields)
                {
                    return Err(MergeError::MissingField {
                        table: table.key.to_string(),
                        rank: rank.label.clone(),
                        row,
                        expected: fields,
                        found: values.len(),
                    });
                }
            }

            let needed = if fields == 0 {
                0
            } else {
                table.identity_width() + fields
            };
            if table.header_row.len() < needed {
                return Err(MergeError::ShortHeader {
                    table: table.key.to_string(),
                    expected: needed,
                    found: table.header_row.len(),
                });
            }
        }

        Ok(MergedTables {
            ranks: self.ranks,
            tables: self.tables.into_values().collect(),
        })
    }
}
