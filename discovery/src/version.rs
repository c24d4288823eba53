//! Latest-version selection inside one database directory.
//!
//! Room writes one `{version}.json` file per schema version. The selector
//! compares versions numerically, so `10.json` beats `9.json`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FloorPlanError, Result};

/// Extension of schema snapshot files.
pub const SCHEMA_EXTENSION: &str = "json";

/// A schema snapshot file together with its parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
    pub path: PathBuf,
    pub version: u64,
    /// Name of the database directory holding the file.
    pub database: String,
}

impl VersionFile {
    /// Orders by version, then by path so ties resolve deterministically.
    fn precedence(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Parses the version encoded in a schema file name.
///
/// Only `.json` files whose base name is made entirely of ASCII digits and fits
/// in a `u64` carry a version.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use floorplan_discovery::version::parse_version;
///
/// assert_eq!(parse_version(Path::new("db/12.json")), Some(12));
/// assert_eq!(parse_version(Path::new("db/007.json")), Some(7));
/// assert_eq!(parse_version(Path::new("db/latest.json")), None);
/// assert_eq!(parse_version(Path::new("db/-1.json")), None);
/// assert_eq!(parse_version(Path::new("db/3.yaml")), None);
/// ```
pub fn parse_version(path: &Path) -> Option<u64> {
    if !is_schema_file_name(path) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn is_schema_file_name(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SCHEMA_EXTENSION)
}

/// Picks the highest-versioned schema file in a database directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSelector {
    strict: bool,
}

impl VersionSelector {
    /// A selector that skips `.json` files without a numeric name.
    pub fn new() -> Self {
        Self::default()
    }

    /// A selector that rejects `.json` files without a numeric name.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns the schema file with the greatest version in `directory`.
    ///
    /// # Errors
    ///
    /// - [`FloorPlanError::NoSchemaFound`] if no file qualifies.
    /// - [`FloorPlanError::InvalidVersionName`] in strict mode when a `.json`
    ///   file has a non-numeric name.
    /// - [`FloorPlanError::Io`] if the directory cannot be listed.
    ///
    /// # Examples
    ///
    /// ```
    /// use floorplan_discovery::version::VersionSelector;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let db = dir.path().join("appdb");
    /// std::fs::create_dir(&db).unwrap();
    /// for version in [1, 2, 10] {
    ///     std::fs::write(db.join(format!("{version}.json")), "{}").unwrap();
    /// }
    ///
    /// let latest = VersionSelector::new().select_latest(&db).unwrap();
    /// assert_eq!(latest.version, 10);
    /// assert_eq!(latest.database, "appdb");
    /// ```
    pub fn select_latest(&self, directory: &Path) -> Result<VersionFile> {
        let io_error = |source| FloorPlanError::Io {
            path: directory.to_path_buf(),
            source,
        };

        let database = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut latest: Option<VersionFile> = None;
        for entry in std::fs::read_dir(directory).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if !path.is_file() || !is_schema_file_name(&path) {
                continue;
            }

            let Some(version) = parse_version(&path) else {
                if self.strict {
                    return Err(FloorPlanError::InvalidVersionName { path });
                }
                debug!(path = %path.display(), "skipping schema file without numeric version");
                continue;
            };

            let candidate = VersionFile {
                path,
                version,
                database: database.clone(),
            };
            let replace = latest
                .as_ref()
                .is_none_or(|current| candidate.precedence(current) == Ordering::Greater);
            if replace {
                latest = Some(candidate);
            }
        }

        let selected = latest.ok_or_else(|| FloorPlanError::NoSchemaFound {
            directory: directory.to_path_buf(),
        })?;
        debug!(
            database = %selected.database,
            version = selected.version,
            path = %selected.path.display(),
            "selected latest schema"
        );
        Ok(selected)
    }
}

/// Returns the latest schema file in `directory` using the lenient selector.
///
/// # Errors
///
/// See [`VersionSelector::select_latest`].
pub fn select_latest(directory: &Path) -> Result<VersionFile> {
    VersionSelector::new().select_latest(directory)
}
