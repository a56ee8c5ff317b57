//! Error kinds surfaced when reading or writing a deck.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure while loading or persisting a deck.
#[derive(Debug, Error)]
pub enum DeckError {
    /// The deck file could not be opened, read or written.
    #[error("{action} {path}: {source}")]
    File {
        /// What was being attempted (`"failed to read"`, ...).
        action: &'static str,
        /// File that caused the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A row in the deck does not match the expected CSV shape.
    #[error("malformed CSV in {path} at line {line}: {detail}")]
    Format {
        /// File that contained the malformed row.
        path: PathBuf,
        /// 1-based line number of the offending record.
        line: u64,
        /// Human readable description of the problem.
        detail: String,
    },
}

impl DeckError {
    pub(crate) fn file(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            action,
            path: path.into(),
            source,
        }
    }

    /// Short label for status lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file error",
            Self::Format { .. } => "format error",
        }
    }

    /// Returns `true` for malformed-row failures.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}

/// Convenience alias for deck operations.
pub type DeckResult<T> = std::result::Result<T, DeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_and_line() {
        let err = DeckError::Format {
            path: PathBuf::from("words.csv"),
            line: 3,
            detail: "expected 2 fields, found 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed CSV in words.csv at line 3: expected 2 fields, found 3"
        );
        assert!(err.is_format());
        assert_eq!(err.kind(), "format error");
    }

    #[test]
    fn file_error_keeps_source() {
        let err = DeckError::file(
            "failed to read",
            "missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "failed to read missing.csv: no such file");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_format());
    }
}
