//! Error taxonomy shared by every stage of the distance pipeline.
//!
//! All errors abort the whole call: no partial matrix is ever returned.

use thiserror::Error;

/// Coarse classification of a [`TreeDistError`], used by the binding layers
/// to pick an exception class or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A burn-in parameter is outside its domain.
    Range,
    /// No files, unreadable files or undecodable content.
    Input,
    /// Malformed tree or TRANSLATE syntax, undefined taxon labels.
    Parse,
    /// Retained trees do not share one taxon universe.
    Validation,
    /// Nothing left after burn-in.
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum TreeDistError {
    #[error("{name} must be a non-negative integer, got {value}")]
    Range { name: &'static str, value: i64 },

    #[error("invalid input: {0}")]
    Input(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{file}': {message}")]
    Parse { file: String, message: String },

    #[error("trees do not share the same taxa: {0}")]
    Validation(String),

    #[error("No trees found after burn-in removal")]
    EmptyResult,
}

impl TreeDistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeDistError::Range { .. } => ErrorKind::Range,
            TreeDistError::Input(_) | TreeDistError::Io { .. } => ErrorKind::Input,
            TreeDistError::Parse { .. } => ErrorKind::Parse,
            TreeDistError::Validation(_) => ErrorKind::Validation,
            TreeDistError::EmptyResult => ErrorKind::EmptyResult,
        }
    }

    pub(crate) fn parse(file: &str, message: impl Into<String>) -> Self {
        TreeDistError::Parse {
            file: file.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeDistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_input_kind() {
        let err = TreeDistError::Io {
            path: "missing.trees".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("missing.trees"));
    }

    #[test]
    fn empty_result_message() {
        assert!(TreeDistError::EmptyResult.to_string().contains("No trees found"));
    }
}
