//! CLI commands: commit, line, link, batch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::config::Config;
use crate::error;
use crate::history::{Coverage, RevisionIndex};
use crate::line::LineResolver;
use crate::link::Linker;
use crate::source_cache::SourceCache;
use crate::types::SymbolIdentity;

/// One row of `batch --json` output.
#[derive(Serialize)]
struct BatchEntry {
    /// Source file the symbol lives in.
    file: PathBuf,
    /// Line number as `line_of` reports it.
    line: usize,
    /// Deep link, absent for files outside `@types` packages.
    link: Option<String>,
    /// Qualified name that was looked up.
    qualified_name: String,
}

/// Link every symbol listed in a JSON file, sharing parses and package
/// revisions across the whole batch.
///
/// # Errors
///
/// Returns `Error::Io` if the input can't be read, `Error::Json` if it isn't a
/// JSON array of symbols, or `Error::Pattern` from linker setup.
pub fn batch(
    history: &RevisionIndex,
    config: &Config,
    input: &Path,
    json: bool,
) -> Result<(), error::Error> {
    let content = std::fs::read_to_string(input)?;
    let symbols: Vec<SymbolIdentity> = serde_json::from_str(&content)?;
    let mut linker = Linker::new(config, history, SourceCache::new())?;

    let mut entries = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let link = linker.link(&symbol);
        if link.is_none() {
            eprintln!("skip: not a DefinitelyTyped file: {}", symbol.file.display());
        }
        entries.push(BatchEntry {
            line: linker.line_of(&symbol),
            link,
            file: symbol.file,
            qualified_name: symbol.qualified_name,
        });
    }
    log::debug!("linked {} symbols from {} files", entries.len(), linker.parsed_files());

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for link in entries.iter().filter_map(|e| return e.link.as_deref()) {
        println!("{link}");
    }
    return Ok(());
}

/// Print the revision that was current at `timestamp`. Timestamps newer than
/// the known history, or falling into a gap wider than
/// `max_revision_gap_days`, print the default branch and exit with 1.
pub fn commit(history: &RevisionIndex, config: &Config, timestamp: f64) -> ExitCode {
    match history.resolve_covered(timestamp, config.max_revision_gap()) {
        Coverage::Covered(revision) => {
            println!("{}", revision.id);
            return ExitCode::SUCCESS;
        },
        Coverage::TooNew => eprintln!(
            "{timestamp} is newer than the known history, use the {} branch",
            config.default_branch
        ),
        Coverage::Gap(nearest) => eprintln!(
            "{timestamp} falls in a gap of the history snapshot (nearest older revision {} is more than {} days earlier), use the {} branch",
            nearest.id, config.max_revision_gap_days, config.default_branch
        ),
    }

    println!("{}", config.default_branch);
    return ExitCode::from(1);
}

/// Print the line number of one declaration.
pub fn line(file: PathBuf, qualified_name: String, offset: Option<usize>) {
    let mut lines = LineResolver::new(SourceCache::new());
    let symbol = SymbolIdentity {
        file,
        offset,
        qualified_name,
    };
    println!("{}", lines.line_of(&symbol));
}

/// Print the deep link for one declaration.
///
/// # Errors
///
/// Returns `Error::NotDefinitelyTyped` for files outside `@types` packages,
/// or `Error::Pattern` from linker setup.
pub fn link(
    history: &RevisionIndex,
    config: &Config,
    symbol: &SymbolIdentity,
) -> Result<(), error::Error> {
    let mut linker = Linker::new(config, history, SourceCache::new())?;
    let Some(link) = linker.link(symbol) else {
        return Err(error::Error::NotDefinitelyTyped {
            path: symbol.file.clone(),
        });
    };
    println!("{link}");
    return Ok(());
}
