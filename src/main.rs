use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

mod config;
mod discover;
mod error;
mod merge;
mod profile;
mod render;

use config::{Extraction, LayoutConfig};
use discover::{Rank, RankOrder};
use merge::{FieldMerger, FileRole, IdentityCheck, TableMerger};
use profile::{Scanner, Tokenizer};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "profile-merge")]
#[command(about = "Merge per-rank worker/server profile tables into CSV", long_about = None)]
struct Cli {
    /// Directory holding the worker and server profile files.
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Output shape.
    #[arg(long, value_enum, default_value_t = Mode::Blocks)]
    mode: Mode,

    /// Input file naming: `worker.profile.*` or `worker.timer.*`.
    #[arg(long, value_enum, default_value_t = Stem::Profile)]
    stem: Stem,

    /// Directory the CSV files are written to.
    #[arg(short = 'o', long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = RankOrder::Lexical)]
    rank_order: RankOrder,

    #[arg(long, value_enum, default_value_t = Tokenizer::Whitespace)]
    tokenizer: Tokenizer,

    /// Compare only row counts across ranks, not row identities.
    #[arg(long)]
    relaxed: bool,

    /// JSON file replacing the built-in profile layouts.
    #[arg(long)]
    layout: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One block per table and value field (`<process>_profile.csv`).
    Blocks,
    /// One file per extraction (`<process>_<extraction>.csv`).
    Fields,
    /// Both of the above.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stem {
    Profile,
    Timer,
}

impl Stem {
    fn as_str(self) -> &'static str {
        match self {
            Stem::Profile => "profile",
            Stem::Timer => "timer",
        }
    }
}

/// Worker and server files are merged independently.
const PROCESSES: [&str; 2] = ["worker", "server"];

struct Run {
    dir: PathBuf,
    out_dir: PathBuf,
    stem: Stem,
    rank_order: RankOrder,
    tokenizer: Tokenizer,
    check: IdentityCheck,
    layouts: LayoutConfig,
}

impl Run {
    fn ranks(&self, process: &str) -> Result<Vec<Rank>> {
        let prefix = format!("{}.{}.", process, self.stem.as_str());
        let ranks = discover::discover_ranks(&self.dir, &prefix, self.rank_order)
            .with_context(|| format!("discover {}* in {}", prefix, self.dir.display()))?;
        if ranks.is_empty() {
            log::warn!("no {}* files in {}", prefix, self.dir.display());
        }
        Ok(ranks)
    }

    fn merge_blocks(&self, process: &str) -> Result<()> {
        let ranks = self.ranks(process)?;
        if ranks.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let rank_count = ranks.len();

        let scanner = Scanner::new(&self.layouts.tables, self.tokenizer)?;
        let mut merger = TableMerger::new(self.check);
        for (position, rank) in ranks.into_iter().enumerate() {
            let scanned = scanner.scan_file(&rank.path)?;
            merger.add_file(rank, FileRole::for_position(position), &scanned)?;
        }
        let merged = merger
            .finish()
            .with_context(|| format!("align {} tables", process))?;

        let out = self.out_dir.join(format!("{}_profile.csv", process));
        render::write_csv_file(&out, |file| render::write_table_blocks(&merged, file))
            .with_context(|| format!("write {}", out.display()))?;

        log::info!(
            "merged {} tables from {} ranks into {} in {:.3} ms",
            merged.tables.len(),
            rank_count,
            out.display(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        println!("Created file {}", out.display());
        Ok(())
    }

    fn merge_fields(&self, process: &str, extraction: &Extraction) -> Result<()> {
        let ranks = self.ranks(process)?;
        if ranks.is_empty() {
            return Ok(());
        }
        let started = Instant::now();

        let scanner = Scanner::new(extraction, self.tokenizer)?;
        let mut merger = FieldMerger::new(extraction, self.check);
        for (position, rank) in ranks.into_iter().enumerate() {
            let scanned = scanner.scan_file(&rank.path)?;
            merger
                .add_file(rank, FileRole::for_position(position), &scanned)
                .with_context(|| format!("align {} field '{}'", process, extraction.name))?;
        }
        let sheet = merger.finish();

        let out = self
            .out_dir
            .join(format!("{}_{}.csv", process, extraction.name));
        render::write_csv_file(&out, |file| render::write_field_sheet(&sheet, file))
            .with_context(|| format!("write {}", out.display()))?;

        log::info!(
            "extracted '{}' from {} ranks into {} in {:.3} ms",
            extraction.name,
            sheet.ranks.len(),
            out.display(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        println!("Created file {}", out.display());
        Ok(())
    }
}

fn load_layouts(path: Option<&Path>) -> Result<LayoutConfig> {
    match path {
        Some(path) => {
            log::info!("loading layouts from {}", path.display());
            Ok(LayoutConfig::from_json_file(path)?)
        }
        None => Ok(LayoutConfig::builtin()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let run = Run {
        layouts: load_layouts(cli.layout.as_deref())?,
        dir: cli.dir,
        out_dir: cli.out_dir,
        stem: cli.stem,
        rank_order: cli.rank_order,
        tokenizer: cli.tokenizer,
        check: if cli.relaxed {
            IdentityCheck::Relaxed
        } else {
            IdentityCheck::Strict
        },
    };

    for process in PROCESSES {
        if matches!(cli.mode, Mode::Blocks | Mode::All) {
            run.merge_blocks(process)?;
        }
        if matches!(cli.mode, Mode::Fields | Mode::All) {
            for extraction in &run.layouts.extractions {
                run.merge_fields(process, extraction)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn run_in(dir: &Path, out_dir: &Path) -> Run {
        Run {
            dir: dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            stem: Stem::Profile,
            rank_order: RankOrder::Lexical,
            tokenizer: Tokenizer::Whitespace,
            check: IdentityCheck::Strict,
            layouts: LayoutConfig::builtin(),
        }
    }

    fn csv_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn merges_worker_directory_into_profile_csv() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(
            input.path().join("worker.profile.0"),
            "Timers for Program foo\nName Value\na 1\nb 2\n",
        )
        .unwrap();
        fs::write(
            input.path().join("worker.profile.1"),
            "Timers for Program foo\nName Value\na 3\nb 4\n",
        )
        .unwrap();

        let run = run_in(input.path(), output.path());
        run.merge_blocks("worker").unwrap();
        run.merge_blocks("server").unwrap();

        assert_eq!(
            csv_lines(&output.path().join("worker_profile.csv")),
            vec!["foo Timers", "Name,Value(0),Value(1)", "a,1,3", "b,2,4", "", ""]
        );
        assert!(!output.path().join("server_profile.csv").exists());
    }

    #[test]
    fn failed_alignment_leaves_no_output() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(
            input.path().join("server.profile.0"),
            "Counters for Program foo\nName Count\na 1\nb 2\n",
        )
        .unwrap();
        fs::write(
            input.path().join("server.profile.1"),
            "Counters for Program foo\nName Count\na 1\n",
        )
        .unwrap();

        let run = run_in(input.path(), output.path());
        assert!(run.merge_blocks("server").is_err());
        assert!(!output.path().join("server_profile.csv").exists());
    }

    #[test]
    fn timer_stem_and_field_mode_write_named_extraction() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        for (rank, count) in [("0", 4), ("1", 6)] {
            fs::write(
                input.path().join(format!("worker.timer.{}", rank)),
                format!("Counters for Program foo\nName Count\nget {}\n", count),
            )
            .unwrap();
        }

        let mut run = run_in(input.path(), output.path());
        run.stem = Stem::Timer;
        run.merge_fields("worker", &Extraction::builtin_count()).unwrap();

        assert_eq!(
            csv_lines(&output.path().join("worker_count.csv")),
            vec!["foo Counters,0,1", "Name,Count(0),Count(1)", "get,4,6"]
        );
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["profile-merge"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("."));
        assert_eq!(cli.mode, Mode::Blocks);
        assert_eq!(cli.rank_order, RankOrder::Lexical);
        assert!(!cli.relaxed);

        let cli = Cli::try_parse_from([
            "profile-merge",
            "runs/42",
            "--mode",
            "all",
            "--rank-order",
            "numeric",
            "--tokenizer",
            "restricted",
        ])
        .unwrap();
        assert_eq!(cli.dir, PathBuf::from("runs/42"));
        assert_eq!(cli.mode, Mode::All);
        assert_eq!(cli.tokenizer, Tokenizer::Restricted);
    }
}
