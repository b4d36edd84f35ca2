/// Crate-level error types for dtlink.
use std::path::PathBuf;

/// Errors that stop a dtlink command. Lookups themselves never fail; these
/// cover startup (history, config) and the command-line surface.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The embedded revision history is malformed.
    #[error("revision history corrupt at line {line}: {reason}")]
    HistoryCorrupt {
        /// One-based line number in the history resource.
        line: usize,
        /// Description of the corruption.
        reason: String,
    },

    /// An external history snapshot was named but doesn't exist.
    #[error("history snapshot not found: {}", path.display())]
    HistoryNotFound {
        /// Path the snapshot was expected at.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON deserialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A link was requested for a file outside `node_modules/@types/`.
    #[error("not a DefinitelyTyped file: {}", path.display())]
    NotDefinitelyTyped {
        /// The offending source path.
        path: PathBuf,
    },

    /// A built-in regular expression failed to compile.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
