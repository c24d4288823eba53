//! Structured export reporting.

use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FloorPlanError, Result};
use crate::export::{ExportOutcome, ExportSummary, WriteStatus};

/// Structured failure code for export failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// A database directory has no schema file.
    NoSchemaFound,
    /// A schema file name is not a version number.
    InvalidVersionName,
    /// A schema file has no parent directory.
    OrphanSchemaFile,
    /// The schema file could not be read or parsed.
    ParseFailed,
    /// Rendered output could not be written.
    WriteFailed,
    /// No schema roots were configured.
    MisconfiguredHost,
    /// A directory could not be listed.
    IoFailed,
    /// The configuration file is unreadable or invalid.
    ConfigInvalid,
    /// The task was cancelled before it started.
    Cancelled,
    /// One or more tasks of a collect-all run failed.
    ExportFailed,
    /// The worker pool could not be created.
    ThreadPool,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSchemaFound => write!(f, "no_schema_found"),
            Self::InvalidVersionName => write!(f, "invalid_version_name"),
            Self::OrphanSchemaFile => write!(f, "orphan_schema_file"),
            Self::ParseFailed => write!(f, "parse_failed"),
            Self::WriteFailed => write!(f, "write_failed"),
            Self::MisconfiguredHost => write!(f, "misconfigured_host"),
            Self::IoFailed => write!(f, "io_failed"),
            Self::ConfigInvalid => write!(f, "config_invalid"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::ExportFailed => write!(f, "export_failed"),
            Self::ThreadPool => write!(f, "thread_pool"),
        }
    }
}

/// Per-schema export report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub database: String,
    pub version: u64,
    pub schema: String,
    /// Output file, or `None` for standard output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub status: WriteStatus,
    pub bytes: usize,
    pub sha256: String,
}

impl From<&ExportOutcome> for ExportReport {
    fn from(outcome: &ExportOutcome) -> Self {
        Self {
            database: outcome.database.clone(),
            version: outcome.version,
            schema: outcome.schema.display().to_string(),
            destination: outcome
                .destination
                .path()
                .map(|path| path.display().to_string()),
            status: outcome.status,
            bytes: outcome.bytes,
            sha256: outcome.sha256.clone(),
        }
    }
}

/// One failed export or run-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub code: FailureCode,
    pub message: String,
}

impl From<&FloorPlanError> for FailureReport {
    fn from(err: &FloorPlanError) -> Self {
        Self {
            schema: err.schema_path().map(|path| path.display().to_string()),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Report for a whole export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReportBundle {
    pub tool_version: String,
    pub generated_at: String,
    pub reports: Vec<ExportReport>,
    pub failures: Vec<FailureReport>,
}

impl ExportReportBundle {
    /// An empty bundle stamped with the current time.
    pub fn new() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn from_summary(summary: &ExportSummary) -> Self {
        let mut bundle = Self::new();
        bundle.reports = summary.outcomes.iter().map(ExportReport::from).collect();
        bundle.failures = summary
            .failures
            .iter()
            .map(|failure| FailureReport::from(&failure.error))
            .collect();
        bundle
    }

    /// A bundle holding a single run-level failure.
    pub fn from_error(err: &FloorPlanError) -> Self {
        let mut bundle = Self::new();
        bundle.failures.push(FailureReport::from(err));
        bundle
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Writes the bundle as YAML when `path` ends in `.yaml`/`.yml`, JSON
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FloorPlanError::Io`] if the file cannot be created or the
    /// bundle cannot be serialized.
    pub fn write(&self, path: &Path) -> Result<()> {
        let io_error = |source| FloorPlanError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(io_error)?;
        let writer = BufWriter::new(file);

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        if is_yaml {
            serde_yaml::to_writer(writer, self)
                .map_err(|e| io_error(std::io::Error::other(e)))
        } else {
            serde_json::to_writer_pretty(writer, self)
                .map_err(|e| io_error(std::io::Error::other(e)))
        }
    }
}

impl Default for ExportReportBundle {
    fn default() -> Self {
        Self::new()
    }
}
