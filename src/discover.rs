//! Input discovery: find `<process>.<stem>.*` files and derive rank labels.

use crate::error::MergeError;

use clap::ValueEnum;
use glob::Pattern;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One input file and the rank label derived from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank {
    /// File name with the prefix stripped, e.g. `12` for `worker.profile.12`.
    pub label: String,
    pub path: PathBuf,
}

/// Order of rank columns in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RankOrder {
    /// Sort by file name: `10` comes before `9`.
    #[default]
    Lexical,
    /// Sort numeric labels by value; non-numeric labels follow, sorted by name.
    Numeric,
}

impl RankOrder {
    fn compare(self, a: &Rank, b: &Rank) -> Ordering {
        match self {
            RankOrder::Lexical => a.label.cmp(&b.label),
            RankOrder::Numeric => {
                match (a.label.parse::<u64>().ok(), b.label.parse::<u64>().ok()) {
                    (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.label.cmp(&b.label)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => a.label.cmp(&b.label),
                }
            }
        }
    }
}

/// Find every regular file in `dir` whose name starts with `prefix`.
pub fn discover_ranks(dir: &Path, prefix: &str, order: RankOrder) -> Result<Vec<Rank>, MergeError> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(prefix)
    );
    let paths = glob::glob(&pattern).map_err(|e| MergeError::InvalidGlob {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut ranks = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| MergeError::Io(e.into()))?;
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("ignoring non UTF-8 file name {}", path.display());
            continue;
        };
        let label = name.strip_prefix(prefix).unwrap_or(name).to_string();
        ranks.push(Rank { label, path });
    }

    ranks.sort_by(|a, b| order.compare(a, b));
    log::debug!("{}: {} files", pattern, ranks.len());
    Ok(ranks)
}
