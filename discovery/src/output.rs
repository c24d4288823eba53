//! Output formats, destinations, and output path naming.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use floorplan_core::{DbmlConfiguration, DbmlRenderer, DiagramRenderer, Project};
use serde::{Deserialize, Serialize};

use crate::error::{FloorPlanError, Result};

/// Output format names selectable from configuration and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Dbml,
}

impl FormatKind {
    /// Pairs the format with its render configuration.
    pub fn with_configuration(self, dbml: DbmlConfiguration) -> OutputFormat {
        match self {
            Self::Dbml => OutputFormat::Dbml(dbml),
        }
    }
}

/// A fully configured output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dbml(DbmlConfiguration),
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Dbml(DbmlConfiguration::default())
    }
}

impl OutputFormat {
    /// File extension of rendered output, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dbml(_) => "dbml",
        }
    }

    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Dbml(_) => FormatKind::Dbml,
        }
    }

    /// Renders `project` in this format.
    pub fn render(&self, project: &Project) -> String {
        match self {
            Self::Dbml(config) => DbmlRenderer::new(*config).render(project),
        }
    }
}

/// Where rendered output goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputDestination {
    StandardOut,
    Disk(PathBuf),
}

impl OutputDestination {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::StandardOut => None,
            Self::Disk(path) => Some(path),
        }
    }
}

impl fmt::Display for OutputDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StandardOut => write!(f, "standard output"),
            Self::Disk(path) => write!(f, "'{}'", path.display()),
        }
    }
}

/// Derives the output file for a schema file:
/// `<output_dir>/<database-dir>_<version>.<ext>`.
///
/// `output_dir` is made absolute against the current directory.
///
/// # Errors
///
/// - [`FloorPlanError::OrphanSchemaFile`] if the schema file has no named
///   parent directory.
/// - [`FloorPlanError::Io`] if the current directory is needed but unavailable.
///
/// # Examples
///
/// ```
/// # #[cfg(unix)] {
/// use std::path::{Path, PathBuf};
/// use floorplan_discovery::output::{OutputFormat, build_output_path};
///
/// let path = build_output_path(
///     Path::new("/roots/appdb/3.json"),
///     Path::new("/out"),
///     OutputFormat::default(),
/// )
/// .unwrap();
/// assert_eq!(path, PathBuf::from("/out/appdb_3.dbml"));
/// # }
/// ```
pub fn build_output_path(
    schema_file: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<PathBuf> {
    let orphan = || FloorPlanError::OrphanSchemaFile {
        path: schema_file.to_path_buf(),
    };
    let database = schema_file
        .parent()
        .and_then(Path::file_name)
        .ok_or_else(orphan)?;
    let stem = schema_file.file_stem().ok_or_else(orphan)?;

    let output_dir = std::path::absolute(output_dir).map_err(|source| FloorPlanError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let file_name = format!(
        "{}_{}.{}",
        database.to_string_lossy(),
        stem.to_string_lossy(),
        format.extension()
    );
    Ok(output_dir.join(file_name))
}

/// Chooses the destination for a schema file: standard output when no output
/// directory is configured, otherwise the file from [`build_output_path`].
///
/// # Errors
///
/// See [`build_output_path`]. Never fails when `output_dir` is `None`.
pub fn resolve_destination(
    schema_file: &Path,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<OutputDestination> {
    match output_dir {
        None => Ok(OutputDestination::StandardOut),
        Some(dir) => build_output_path(schema_file, dir, format).map(OutputDestination::Disk),
    }
}

/// Console that receives rendered text for [`OutputDestination::StandardOut`].
///
/// Each call writes one complete text; implementations must not interleave
/// concurrent calls.
pub trait ConsoleSink: Send + Sync {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// The process's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

/// In-memory console that records every write.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    writes: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts written so far, in write order.
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConsoleSink for MemoryConsole {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}
