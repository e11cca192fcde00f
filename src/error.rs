use std::path::PathBuf;

use crate::translate::TranslateError;
use thiserror::Error;

/// Top-level error type for the conflang library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("line {line}: {source} (in '{text}')")]
    Line {
        line: usize,
        text: String,
        source: TranslateError,
    },

    #[error(transparent)]
    Serialize(TranslateError),

    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read input file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deserialize document: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("invalid variable name: {0}")]
    InvalidVariable(String),
}

impl Error {
    /// Returns the translation failure kind, if this error carries one.
    pub fn kind(&self) -> Option<&TranslateError> {
        match self {
            Error::Line { source, .. } | Error::Serialize(source) => Some(source),
            _ => None,
        }
    }
}
