use std::fmt;
use std::path::PathBuf;

/// Identity of a profile table: `"<program> <profile_type>"`.
///
/// `occurrence` counts repeats of the same program/type pair inside one
/// file, so a table that reappears after a blank line gets its own key.
/// Ordering is by label first, which keeps the historical string sort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    pub label: String,
    pub occurrence: usize,
    pub profile_type: String,
}

impl TableKey {
    pub fn new(program: &str, profile_type: &str, occurrence: usize) -> Self {
        Self {
            label: format!("{} {}", program, profile_type),
            occurrence,
            profile_type: profile_type.to_string(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{} #{}", self.label, self.occurrence + 1)
        }
    }
}

/// What a retained log line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Table terminator.
    Blank,
    /// `<profile_type> for Program <program>`
    Program(TableKey),
    /// Column names of the table opened by the preceding `Program` line.
    Header(Vec<String>),
    /// Data row split into identity tuple and value fields.
    Row {
        identity: Vec<String>,
        values: Vec<String>,
    },
}

impl LineKind {
    /// Short description used in alignment errors.
    pub fn describe(&self) -> String {
        match self {
            LineKind::Blank => "a blank line".to_string(),
            LineKind::Program(key) => format!("table '{}'", key),
            LineKind::Header(_) => "a header row".to_string(),
            LineKind::Row { .. } => "a data row".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// 1-based line number in the source file.
    pub line: usize,
    pub kind: LineKind,
}

/// One input file after scanning. Lines inside skipped tables are absent.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub lines: Vec<ScannedLine>,
}
