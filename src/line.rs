//! Line number lookup for a symbol identity.

use crate::discovery;
use crate::source_cache::SourceCache;
use crate::types::{DeclarationPath, SymbolIdentity};

/// Resolves symbols to line numbers, parsing each file at most once.
pub struct LineResolver {
    /// Parsed files shared by every lookup.
    sources: SourceCache,
}

impl LineResolver {
    /// A resolver that reads files through `sources`.
    pub const fn new(sources: SourceCache) -> Self {
        return Self { sources };
    }

    /// Line number of the declaration `symbol` identifies. Never fails.
    ///
    /// The numbering depends on the input, and link builders rely on it:
    /// - with an `offset`, the result is the one-based line of that offset;
    /// - otherwise the qualified name is located in the syntax tree and the
    ///   result is zero-based, or `0` when nothing matches.
    pub fn line_of(&mut self, symbol: &SymbolIdentity) -> usize {
        let file = self.sources.get_or_parse(&symbol.file);

        if let Some(offset) = symbol.offset {
            let (line, _) = file.line_and_column(offset);
            return line.saturating_add(1);
        }

        let path = DeclarationPath::parse(&symbol.qualified_name);
        let Some(offset) = discovery::find_position(file, &path) else {
            log::debug!(
                "{}: no declaration for `{}`, using top of file",
                symbol.file.display(),
                symbol.qualified_name
            );
            return 0;
        };
        let (line, _) = file.line_and_column(offset);
        return line;
    }

    /// The underlying file cache.
    pub const fn sources(&self) -> &SourceCache {
        return &self.sources;
    }
}
