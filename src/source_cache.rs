//! Parsed declaration files and the per-run cache that owns them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::grammar;

/// Reads a file's text. Swappable so tests can observe reads.
pub type SourceLoader = Box<dyn Fn(&Path) -> std::io::Result<String>>;

/// One file's text and syntax tree. Never mutated after creation.
pub struct ParsedSourceFile {
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
    /// Full text of the file (empty if it couldn't be read).
    source: String,
    /// Syntax tree, absent only if tree-sitter refused the grammar.
    tree: Option<Tree>,
}

impl ParsedSourceFile {
    /// Parse `source` with the grammar chosen for `path`.
    pub fn parse(path: &Path, source: String) -> Self {
        let mut parser = Parser::new();
        let tree = match parser.set_language(&grammar::language_for_path(path)) {
            Ok(()) => parser.parse(&source, None),
            Err(e) => {
                log::warn!("{}: grammar rejected: {e}", path.display());
                None
            },
        };

        return Self {
            line_starts: compute_line_starts(&source),
            source,
            tree,
        };
    }

    /// Convert a byte offset into a zero-based `(line, column)` pair.
    /// Offsets past the end of the text land on the last line.
    pub fn line_and_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = self
            .line_starts
            .partition_point(|&start| return start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        return (line, offset.saturating_sub(line_start));
    }

    /// Root node of the syntax tree, if one was produced.
    pub fn root(&self) -> Option<Node<'_>> {
        return self.tree.as_ref().map(Tree::root_node);
    }

    /// The file's text.
    pub fn source(&self) -> &str {
        return &self.source;
    }
}

/// Record where each line begins. `\r\n`, `\n` and a lone `\r` all end a line.
fn compute_line_starts(source: &str) -> Vec<usize> {
    let bytes = source.as_bytes();
    let mut starts = vec![0];

    for (i, &byte) in bytes.iter().enumerate() {
        let next = i.saturating_add(1);
        let ends_line = match byte {
            b'\n' => true,
            b'\r' => bytes.get(next) != Some(&b'\n'),
            _ => false,
        };
        if ends_line {
            starts.push(next);
        }
    }

    return starts;
}

/// Memoized path → parsed file map. Entries are created on first request and
/// kept for the lifetime of the cache; files are never re-read.
pub struct SourceCache {
    /// Parsed files keyed by the path they were requested under.
    files: HashMap<PathBuf, ParsedSourceFile>,
    /// Reads file text on a cache miss.
    load: SourceLoader,
}

impl SourceCache {
    /// A cache that reads files from disk.
    pub fn new() -> Self {
        return Self::with_loader(Box::new(|path: &Path| return std::fs::read_to_string(path)));
    }

    /// A cache that reads files through `load`.
    pub fn with_loader(load: SourceLoader) -> Self {
        return Self {
            files: HashMap::new(),
            load,
        };
    }

    /// Return the parsed file for `path`, reading and parsing it on first use.
    /// A file that can't be read parses as an empty document.
    pub fn get_or_parse(&mut self, path: &Path) -> &ParsedSourceFile {
        let load = &self.load;
        return self.files.entry(path.to_path_buf()).or_insert_with(|| {
            let source = load(path).unwrap_or_else(|e| {
                log::warn!("{}: unreadable, linking to top of file: {e}", path.display());
                return String::new();
            });
            log::debug!("parsing {} ({} bytes)", path.display(), source.len());
            return ParsedSourceFile::parse(path, source);
        });
    }

    /// Number of distinct files parsed so far.
    pub fn parsed_count(&self) -> usize {
        return self.files.len();
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        return Self::new();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn counting_cache(text: &'static str) -> (SourceCache, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        let counter = Rc::clone(&reads);
        let cache = SourceCache::with_loader(Box::new(move |_path: &Path| -> std::io::Result<String> {
            counter.set(counter.get() + 1);
            Ok(text.to_string())
        }));
        (cache, reads)
    }

    #[test]
    fn second_lookup_reuses_parse() {
        let (mut cache, reads) = counting_cache("declare const x: number;\n");
        let first: *const ParsedSourceFile = cache.get_or_parse(Path::new("a.d.ts"));
        let second: *const ParsedSourceFile = cache.get_or_parse(Path::new("a.d.ts"));

        assert_eq!(reads.get(), 1);
        assert!(std::ptr::eq(first, second));
        assert_eq!(cache.parsed_count(), 1);
    }

    #[test]
    fn distinct_paths_are_distinct_entries() {
        let (mut cache, reads) = counting_cache("export {};\n");
        cache.get_or_parse(Path::new("a.d.ts"));
        cache.get_or_parse(Path::new("b.d.ts"));
        cache.get_or_parse(Path::new("a.d.ts"));

        assert_eq!(reads.get(), 2);
        assert_eq!(cache.parsed_count(), 2);
    }

    #[test]
    fn missing_file_parses_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.d.ts");
        let mut cache = SourceCache::new();

        let file = cache.get_or_parse(&missing);
        assert_eq!(file.source(), "");
        assert!(file.root().is_some());
        assert_eq!(file.line_and_column(0), (0, 0));
        assert_eq!(file.line_and_column(100), (0, 0));
    }

    #[test]
    fn missing_file_is_not_retried() {
        let reads = Rc::new(Cell::new(0));
        let counter = Rc::clone(&reads);
        let mut cache = SourceCache::with_loader(Box::new(move |_path: &Path| -> std::io::Result<String> {
            counter.set(counter.get() + 1);
            Err(std::io::Error::from(std::io::ErrorKind::NotFound))
        }));

        cache.get_or_parse(Path::new("gone.d.ts"));
        cache.get_or_parse(Path::new("gone.d.ts"));
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.d.ts");
        std::fs::write(&path, "export declare function f(): void;\n").unwrap();

        let mut cache = SourceCache::new();
        let file = cache.get_or_parse(&path);
        assert!(file.source().starts_with("export declare"));
        assert_eq!(file.root().unwrap().kind(), "program");
    }

    #[test]
    fn line_and_column_mapping() {
        let file = ParsedSourceFile::parse(Path::new("x.d.ts"), "ab\ncd\r\nef\rgh".to_string());
        assert_eq!(file.line_and_column(0), (0, 0));
        assert_eq!(file.line_and_column(2), (0, 2));
        assert_eq!(file.line_and_column(3), (1, 0));
        assert_eq!(file.line_and_column(5), (1, 2));
        assert_eq!(file.line_and_column(6), (1, 3));
        assert_eq!(file.line_and_column(7), (2, 0));
        assert_eq!(file.line_and_column(10), (3, 0));
        assert_eq!(file.line_and_column(11), (3, 1));
        assert_eq!(file.line_and_column(999), (3, 2));
    }

    #[test]
    fn trailing_newline_starts_empty_last_line() {
        let file = ParsedSourceFile::parse(Path::new("x.d.ts"), "a\n".to_string());
        assert_eq!(file.line_and_column(2), (1, 0));
    }
}
