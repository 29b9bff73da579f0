//! Error types
//!
//! Absent or expired keys are not errors; reads return `Option` instead.

use thiserror::Error;

/// Reasons a text snapshot is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// First line is not the `---` header
    #[error("missing `---` header")]
    MissingHeader,

    /// Key runs to the end of the line without an unescaped `:`
    #[error("key is not followed by `:`")]
    MissingColon,

    /// Something other than whitespace sits between `:` and `[`
    #[error("expected `[` after `:`")]
    MissingOpenBracket,

    /// Backslash is the last character of the line
    #[error("dangling escape at end of line")]
    DanglingEscape,

    /// Non-empty ttl field that is not an epoch-seconds integer
    #[error("invalid ttl {0:?}")]
    InvalidTtl(String),
}

/// All ttlkv errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Text snapshot could not be parsed; nothing was imported
    #[error("malformed snapshot at line {line}: {kind}")]
    MalformedSnapshot {
        /// 1-based line number
        line: usize,
        #[source]
        kind: SnapshotError,
    },

    /// Entry cannot be written to the line-oriented text format
    #[error("entry {key:?} cannot be written as text: {reason}")]
    Unrepresentable { key: String, reason: &'static str },

    /// Sink or source failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary codec failure
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// JSON codec failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ttlkv operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(line: usize, kind: SnapshotError) -> Self {
        Error::MalformedSnapshot { line, kind }
    }

    /// Check if the error came from parsing a text snapshot.
    pub fn is_malformed_snapshot(&self) -> bool {
        matches!(self, Error::MalformedSnapshot { .. })
    }
}
