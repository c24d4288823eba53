//! Error types for reading schema snapshots.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing an exported schema file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The schema file could not be read.
    #[error("failed to read schema '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not valid Room schema JSON.
    #[error("invalid schema JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ParseError {
    /// Path of the schema file that failed to parse.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } => path,
        }
    }
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
