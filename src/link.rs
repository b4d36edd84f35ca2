//! Deep links into the upstream repository.

use crate::config::Config;
use crate::error::Error;
use crate::history::RevisionIndex;
use crate::line::LineResolver;
use crate::package::{self, PublishRevisions};
use crate::source_cache::SourceCache;
use crate::types::SymbolIdentity;

/// Builds `…/blob/<revision>/types/<package>/<file>#L<line>` links. Parsed
/// files and package revisions are shared across every link it builds.
pub struct Linker<'a> {
    /// Settings for the repository URL.
    config: &'a Config,
    /// Line lookups over cached parses.
    lines: LineResolver,
    /// Per-package publish revisions.
    revisions: PublishRevisions<'a>,
}

impl<'a> Linker<'a> {
    /// Create a linker reading source files through `sources`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if the README pattern fails to compile.
    pub fn new(config: &'a Config, history: &'a RevisionIndex, sources: SourceCache) -> Result<Self, Error> {
        return Ok(Self {
            config,
            lines: LineResolver::new(sources),
            revisions: PublishRevisions::new(config, history)?,
        });
    }

    /// Link to the declaration `symbol` identifies, or `None` when the file
    /// isn't part of an installed `@types` package.
    pub fn link(&mut self, symbol: &SymbolIdentity) -> Option<String> {
        let package = package::locate(&symbol.file)?;
        let revision = self.revisions.revision_for(&package);
        let line = self.lines.line_of(symbol).saturating_add(1);

        return Some(format!(
            "{}/blob/{revision}/types/{}{}#L{line}",
            self.config.repository.trim_end_matches('/'),
            package.name,
            package.inner_path,
        ));
    }

    /// Line number for `symbol`, numbered as `LineResolver::line_of` does.
    pub fn line_of(&mut self, symbol: &SymbolIdentity) -> usize {
        return self.lines.line_of(symbol);
    }

    /// Number of distinct source files parsed so far.
    pub fn parsed_files(&self) -> usize {
        return self.lines.sources().parsed_count();
    }
}
