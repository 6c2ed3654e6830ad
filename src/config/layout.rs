//! Per-profile-type row layouts.
//!
//! Layout file shape (every section optional, missing sections keep the
//! built-in defaults):
//! {
//!   "tables": {
//!     "Timers": { "include": { "header_columns": 1 } },
//!     "ProfileTimers": "skip"
//!   },
//!   "extractions": {
//!     "blkwt": {
//!       "ServerTimers": { "extract": { "header_columns": 3, "field": 4 } },
//!       "Timers": "skip"
//!     }
//!   }
//! }
//!
//! Raw JSON is checked before use: an extracted field must sit after the
//! identity columns.

use crate::error::MergeError;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How a table of one profile type is split into identity and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// The first `header_columns` tokens of a data row identify the row.
    Include { header_columns: usize },
    /// Drop every table of this type.
    Skip,
}

/// Field-extraction layout: which single token to pull out of each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// `field` is an absolute token index, never inside the identity columns.
    Extract { header_columns: usize, field: usize },
    Skip,
}

impl FieldLayout {
    pub fn row_layout(&self) -> TableLayout {
        match *self {
            FieldLayout::Extract { header_columns, .. } => TableLayout::Include { header_columns },
            FieldLayout::Skip => TableLayout::Skip,
        }
    }
}

/// Lookup used by the scanner. `None` means the profile type is unknown.
pub trait RowLayouts {
    fn row_layout(&self, profile_type: &str) -> Option<TableLayout>;
}

/// Layouts for table-block merging, keyed by profile type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayouts(BTreeMap<String, TableLayout>);

impl TableLayouts {
    pub fn new(entries: BTreeMap<String, TableLayout>) -> Self {
        Self(entries)
    }

    pub fn builtin() -> Self {
        use TableLayout::{Include, Skip};
        let entries = [
            ("SialxTimers", Include { header_columns: 3 }),
            ("Timers", Include { header_columns: 1 }),
            ("Counters", Include { header_columns: 1 }),
            ("MaxCounters", Include { header_columns: 1 }),
            ("ServerTimers", Include { header_columns: 3 }),
            ("ProfileTimers", Skip),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl RowLayouts for TableLayouts {
    fn row_layout(&self, profile_type: &str) -> Option<TableLayout> {
        self.0.get(profile_type).copied()
    }
}

/// A named single-field extraction, written to `<process>_<name>.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub name: String,
    fields: BTreeMap<String, FieldLayout>,
}

impl Extraction {
    /// Build an extraction, rejecting fields that overlap the identity columns.
    pub fn new(
        name: impl Into<String>,
        fields: BTreeMap<String, FieldLayout>,
    ) -> Result<Self, MergeError> {
        for (profile_type, layout) in &fields {
            if let FieldLayout::Extract {
                header_columns,
                field,
            } = *layout
            {
                if field < header_columns {
                    return Err(MergeError::InvalidLayout {
                        profile_type: profile_type.clone(),
                        message: format!(
                            "field {} lies inside the {} identity columns",
                            field, header_columns
                        ),
                    });
                }
            }
        }
        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    pub fn field_layout(&self, profile_type: &str) -> Option<FieldLayout> {
        self.fields.get(profile_type).copied()
    }

    /// Block-wait time column of the SIAL and server timer tables.
    pub fn builtin_blkwt() -> Self {
        use FieldLayout::{Extract, Skip};
        Self::from_static(
            "blkwt",
            &[
                ("SialxTimers", Extract { header_columns: 3, field: 6 }),
                ("ServerTimers", Extract { header_columns: 3, field: 4 }),
                ("Timers", Skip),
                ("Counters", Skip),
                ("MaxCounters", Skip),
                ("ProfileTimers", Skip),
            ],
        )
    }

    /// Call/epoch count column of every table that has one.
    pub fn builtin_count() -> Self {
        use FieldLayout::{Extract, Skip};
        Self::from_static(
            "count",
            &[
                ("SialxTimers", Extract { header_columns: 3, field: 7 }),
                ("ServerTimers", Extract { header_columns: 3, field: 7 }),
                ("Timers", Extract { header_columns: 1, field: 2 }),
                ("Counters", Extract { header_columns: 1, field: 1 }),
                ("MaxCounters", Extract { header_columns: 1, field: 1 }),
                ("ProfileTimers", Skip),
            ],
        )
    }

    fn from_static(name: &str, entries: &[(&str, FieldLayout)]) -> Self {
        Self {
            name: name.to_string(),
            fields: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl RowLayouts for Extraction {
    fn row_layout(&self, profile_type: &str) -> Option<TableLayout> {
        self.field_layout(profile_type).map(|f| f.row_layout())
    }
}

/// Everything the merge needs to know about profile types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub tables: TableLayouts,
    pub extractions: Vec<Extraction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayoutConfig {
    #[serde(default)]
    tables: Option<BTreeMap<String, TableLayout>>,

    #[serde(default)]
    extractions: Option<BTreeMap<String, BTreeMap<String, FieldLayout>>>,
}

impl LayoutConfig {
    pub fn builtin() -> Self {
        Self {
            tables: TableLayouts::builtin(),
            extractions: vec![Extraction::builtin_blkwt(), Extraction::builtin_count()],
        }
    }

    pub fn from_json_str(text: &str, path: &Path) -> Result<Self, MergeError> {
        let raw: RawLayoutConfig =
            serde_json::from_str(text).map_err(|source| MergeError::LayoutFile {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::builtin();
        if let Some(tables) = raw.tables {
            config.tables = TableLayouts::new(tables);
        }
        if let Some(extractions) = raw.extractions {
            config.extractions = extractions
                .into_iter()
                .map(|(name, fields)| Extraction::new(name, fields))
                .collect::<Result<_, _>>()?;
        }
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MergeError> {
        let text = fs::read_to_string(path).map_err(|source| MergeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_tables_match_historical_offsets() {
        let layouts = TableLayouts::builtin();
        assert_eq!(
            layouts.row_layout("SialxTimers"),
            Some(TableLayout::Include { header_columns: 3 })
        );
        assert_eq!(layouts.row_layout("ProfileTimers"), Some(TableLayout::Skip));
        assert_eq!(layouts.row_layout("Bogus"), None);
    }

    #[test]
    fn layout_file_overrides_tables_and_keeps_builtin_extractions() {
        let json = r#"{
            "tables": {
                "Timers": { "include": { "header_columns": 2 } },
                "Counters": "skip"
            }
        }"#;
        let config = LayoutConfig::from_json_str(json, Path::new("layout.json")).unwrap();
        assert_eq!(
            config.tables.row_layout("Timers"),
            Some(TableLayout::Include { header_columns: 2 })
        );
        assert_eq!(config.tables.row_layout("Counters"), Some(TableLayout::Skip));
        assert_eq!(config.tables.row_layout("SialxTimers"), None);
        assert_eq!(config.extractions.len(), 2);
    }

    #[test]
    fn layout_file_extractions_are_sorted_by_name() {
        let json = r#"{
            "extractions": {
                "time": { "Timers": { "extract": { "header_columns": 1, "field": 1 } } },
                "avg": { "Timers": "skip" }
            }
        }"#;
        let config = LayoutConfig::from_json_str(json, Path::new("layout.json")).unwrap();
        let names: Vec<&str> = config.extractions.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["avg", "time"]);
        assert_eq!(
            config.extractions[1].row_layout("Timers"),
            Some(TableLayout::Include { header_columns: 1 })
        );
    }

    #[test]
    fn field_inside_identity_columns_is_rejected() {
        let json = r#"{
            "extractions": {
                "bad": { "ServerTimers": { "extract": { "header_columns": 3, "field": 1 } } }
            }
        }"#;
        let err = LayoutConfig::from_json_str(json, Path::new("layout.json")).unwrap_err();
        assert!(matches!(err, MergeError::InvalidLayout { .. }));
    }

    #[test]
    fn malformed_layout_file_reports_path() {
        let err = LayoutConfig::from_json_str("{ \"tables\": 3 }", Path::new("x.json"))
            .unwrap_err();
        assert!(err.to_string().contains("x.json"));
    }
}
