//! Error types for schema discovery and export.
//!
//! Every variant carries the path it concerns so a failure can be traced back
//! to one schema directory, schema file, or destination without extra context.

use std::path::{Path, PathBuf};

use floorplan_core::ParseError;
use thiserror::Error;

use crate::output::OutputDestination;
use crate::report::FailureCode;

/// Errors that can occur while locating, planning, or exporting schemas.
#[derive(Debug, Error)]
pub enum FloorPlanError {
    /// A database directory holds no `{version}.json` file.
    #[error("no schemas in directory '{}'", directory.display())]
    NoSchemaFound { directory: PathBuf },

    /// A `.json` file whose base name is not a version number (strict mode only).
    #[error("schema file name is not a version number: '{}'", path.display())]
    InvalidVersionName { path: PathBuf },

    /// A schema file without a named parent directory cannot be given an
    /// output name.
    #[error("schema file '{}' has no parent directory to derive an output name from", path.display())]
    OrphanSchemaFile { path: PathBuf },

    /// The schema file could not be read or parsed.
    #[error("failed to parse schema '{}': {source}", schema.display())]
    Parse {
        schema: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Rendered output could not be written.
    #[error("failed to write {destination}: {source}")]
    Write {
        destination: OutputDestination,
        #[source]
        source: std::io::Error,
    },

    /// The host could not supply schema roots at all.
    #[error("misconfigured host: {0}")]
    MisconfiguredHost(String),

    /// Directory listing or path resolution failure.
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file problem.
    #[error("invalid configuration '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// The task was not started because the run was cancelled or its
    /// deadline passed.
    #[error("export of '{}' cancelled before it started", schema.display())]
    Cancelled { schema: PathBuf },

    /// Summary of a collect-all run with at least one failed task.
    #[error("{failed} of {total} exports failed; first failure: {first}")]
    ExportFailed {
        failed: usize,
        total: usize,
        first: Box<FloorPlanError>,
    },

    /// The export worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl FloorPlanError {
    /// Structured code for reports.
    pub fn code(&self) -> FailureCode {
        match self {
            Self::NoSchemaFound { .. } => FailureCode::NoSchemaFound,
            Self::InvalidVersionName { .. } => FailureCode::InvalidVersionName,
            Self::OrphanSchemaFile { .. } => FailureCode::OrphanSchemaFile,
            Self::Parse { .. } => FailureCode::ParseFailed,
            Self::Write { .. } => FailureCode::WriteFailed,
            Self::MisconfiguredHost(_) => FailureCode::MisconfiguredHost,
            Self::Io { .. } => FailureCode::IoFailed,
            Self::Config { .. } => FailureCode::ConfigInvalid,
            Self::Cancelled { .. } => FailureCode::Cancelled,
            Self::ExportFailed { .. } => FailureCode::ExportFailed,
            Self::ThreadPool(_) => FailureCode::ThreadPool,
        }
    }

    /// Schema file the failure concerns, when there is one.
    pub fn schema_path(&self) -> Option<&Path> {
        match self {
            Self::InvalidVersionName { path } | Self::OrphanSchemaFile { path } => Some(path),
            Self::Parse { schema, .. } | Self::Cancelled { schema } => Some(schema),
            Self::ExportFailed { first, .. } => first.schema_path(),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`FloorPlanError`].
pub type Result<T> = std::result::Result<T, FloorPlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = FloorPlanError::NoSchemaFound {
            directory: PathBuf::from("/schemas/appdb"),
        };
        assert_eq!(err.to_string(), "no schemas in directory '/schemas/appdb'");

        let err = FloorPlanError::Write {
            destination: OutputDestination::Disk(PathBuf::from("/out/appdb_3.dbml")),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/out/appdb_3.dbml"));
    }

    #[test]
    fn test_export_failed_delegates_schema_path() {
        let err = FloorPlanError::ExportFailed {
            failed: 1,
            total: 3,
            first: Box::new(FloorPlanError::Cancelled {
                schema: PathBuf::from("/schemas/appdb/3.json"),
            }),
        };
        assert_eq!(err.code(), FailureCode::ExportFailed);
        assert_eq!(err.schema_path(), Some(Path::new("/schemas/appdb/3.json")));
        assert!(err.to_string().starts_with("1 of 3 exports failed"));
    }
}
