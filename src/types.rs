/// Core domain types: revisions, declaration paths, and symbol identities.
use std::path::PathBuf;

/// One published revision of the upstream repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Opaque revision identifier (a full or abbreviated commit hash).
    pub id: String,
    /// Publication time in seconds since the Unix epoch.
    pub published_at: u32,
}

/// A dotted qualified name split into its segments (`A.B.c` → `A`, `B`, `c`).
/// Quoted segments keep their quotes and are never split on inner dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationPath(
    /// The ordered name segments.
    Vec<String>,
);

impl DeclarationPath {
    /// Split a qualified name on unquoted dots.
    ///
    /// Delimiters directly before a segment are skipped, so `.A` is `A`;
    /// a trailing delimiter yields a final empty segment.
    pub fn parse(qualified_name: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = qualified_name;

        loop {
            rest = rest.trim_start_matches('.');

            if let Some(quoted) = rest.strip_prefix('"') {
                let Some(close) = quoted.find('"') else {
                    segments.extend(rest.split('.').map(String::from));
                    break;
                };
                // Both quotes belong to the segment.
                let end = close.saturating_add(2);
                if end >= rest.len() {
                    segments.push(rest.to_string());
                    break;
                }
                let (segment, tail) = rest.split_at(end);
                segments.push(segment.to_string());
                rest = tail;
                continue;
            }

            match rest.split_once('.') {
                None => {
                    segments.push(rest.to_string());
                    break;
                },
                Some((head, tail)) => {
                    segments.push(head.to_string());
                    rest = tail;
                },
            }
        }

        return Self(segments);
    }

    /// The path segments in order, outermost first.
    pub fn segments(&self) -> &[String] {
        return &self.0;
    }
}

/// Identifies the declaration whose line is being requested.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SymbolIdentity {
    /// Source file containing the declaration.
    pub file: PathBuf,
    /// UTF-8 byte offset of the declaration, when the caller still has it.
    /// Producers counting UTF-16 code units must convert first.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Dotted qualified name, used only when `offset` is absent.
    pub qualified_name: String,
}
