//! Schema root resolution and per-database schema location.
//!
//! A schema root holds one directory per database, each holding one
//! `{version}.json` file per version:
//!
//! ```text
//! app/schemas/
//! ├── com.example.AppDatabase/
//! │   ├── 1.json
//! │   └── 2.json
//! └── com.example.CacheDatabase/
//!     └── 1.json
//! ```
//!
//! Roots come from a [`SchemaRootProvider`]. [`SchemaLocator::locate_all`]
//! then selects the latest schema of every database under every root.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{FloorPlanError, Result};
use crate::version::{VersionFile, VersionSelector};

/// Environment variable read by [`EnvRoots`] by default.
pub const SCHEMA_DIRS_ENV: &str = "FLOORPLAN_SCHEMA_DIRS";

/// Supplies schema root directories.
///
/// `None` means the provider has no way to supply roots; `Some(vec![])` means
/// it supplies none.
pub trait SchemaRootProvider: Send + Sync {
    fn schema_roots(&self) -> Option<Vec<PathBuf>>;
}

/// A fixed list of roots.
#[derive(Debug, Clone, Default)]
pub struct StaticRoots {
    roots: Option<Vec<PathBuf>>,
}

impl StaticRoots {
    /// Always supplies `roots`, even when the list is empty.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: Some(roots.into_iter().map(Into::into).collect()),
        }
    }

    /// Supplies `roots` when configured, however short the list.
    pub fn configured(roots: Option<Vec<PathBuf>>) -> Self {
        Self { roots }
    }
}

impl SchemaRootProvider for StaticRoots {
    fn schema_roots(&self) -> Option<Vec<PathBuf>> {
        self.roots.clone()
    }
}

/// Roots listed in an environment variable, separated like `PATH`.
#[derive(Debug, Clone)]
pub struct EnvRoots {
    var: String,
}

impl EnvRoots {
    pub fn new() -> Self {
        Self::from_var(SCHEMA_DIRS_ENV)
    }

    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvRoots {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRootProvider for EnvRoots {
    fn schema_roots(&self) -> Option<Vec<PathBuf>> {
        std::env::var_os(&self.var).map(|value| split_root_list(&value))
    }
}

/// Splits a platform path list, dropping empty entries.
///
/// # Examples
///
/// ```
/// # #[cfg(unix)] {
/// use std::ffi::OsStr;
/// use std::path::PathBuf;
/// use floorplan_discovery::locate::split_root_list;
///
/// let roots = split_root_list(OsStr::new("app/schemas::lib/schemas"));
/// assert_eq!(roots, vec![PathBuf::from("app/schemas"), PathBuf::from("lib/schemas")]);
/// # }
/// ```
pub fn split_root_list(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}

/// Union of several providers.
///
/// Yields `None` only when every member yields `None`.
#[derive(Default)]
pub struct CompositeRoots {
    providers: Vec<Box<dyn SchemaRootProvider>>,
}

impl CompositeRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl SchemaRootProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl SchemaRootProvider for CompositeRoots {
    fn schema_roots(&self) -> Option<Vec<PathBuf>> {
        self.providers
            .iter()
            .filter_map(|provider| provider.schema_roots())
            .reduce(|mut all, roots| {
                all.extend(roots);
                all
            })
    }
}

/// Collects the provider's roots into a deduplicated, ordered set.
///
/// # Errors
///
/// Returns [`FloorPlanError::MisconfiguredHost`] when the provider cannot
/// supply roots. No file system access happens before this check.
///
/// # Examples
///
/// ```
/// use floorplan_discovery::locate::{StaticRoots, resolve_schema_roots};
///
/// let roots = resolve_schema_roots(&StaticRoots::new(["b", "a", "b"])).unwrap();
/// assert_eq!(roots.len(), 2);
///
/// assert!(resolve_schema_roots(&StaticRoots::configured(None)).is_err());
/// ```
pub fn resolve_schema_roots(provider: &dyn SchemaRootProvider) -> Result<BTreeSet<PathBuf>> {
    provider
        .schema_roots()
        .map(|roots| roots.into_iter().collect())
        .ok_or_else(|| {
            FloorPlanError::MisconfiguredHost(format!(
                "no schema location configured; pass --schema-dir, set schema_dirs, or set {SCHEMA_DIRS_ENV}"
            ))
        })
}

/// Finds the latest schema of every database under a set of roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaLocator {
    selector: VersionSelector,
}

impl SchemaLocator {
    pub fn new(selector: VersionSelector) -> Self {
        Self { selector }
    }

    /// Returns one [`VersionFile`] per database directory, roots in set order
    /// and databases in name order.
    ///
    /// Roots that do not exist contribute nothing. Plain files directly under
    /// a root are ignored.
    ///
    /// # Errors
    ///
    /// Fails on the first database directory that has no schema (or, in
    /// strict mode, a non-numeric schema name), or when a root cannot be
    /// listed. No partial result is returned.
    pub fn locate_all(&self, roots: &BTreeSet<PathBuf>) -> Result<Vec<VersionFile>> {
        let mut selected = Vec::new();
        for root in roots {
            if !root.exists() {
                warn!(root = %root.display(), "schema root does not exist");
                continue;
            }
            for directory in database_directories(root)? {
                selected.push(self.selector.select_latest(&directory)?);
            }
        }
        debug!(roots = roots.len(), schemas = selected.len(), "located schemas");
        Ok(selected)
    }
}

/// Locates schemas with the lenient [`VersionSelector`].
///
/// # Errors
///
/// See [`SchemaLocator::locate_all`].
pub fn locate_all(roots: &BTreeSet<PathBuf>) -> Result<Vec<VersionFile>> {
    SchemaLocator::default().locate_all(roots)
}

fn database_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| FloorPlanError::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut directories = Vec::new();
    for entry in std::fs::read_dir(root).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            directories.push(path);
        }
    }
    directories.sort();
    Ok(directories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_schema(root: &Path, database: &str, version: u32) {
        let dir = root.join(database);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{version}.json")), "{}").unwrap();
    }

    #[test]
    fn test_locates_one_schema_per_database_across_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let roots: BTreeSet<PathBuf> = ["one", "two", "three"]
            .iter()
            .map(|name| tmp.path().join(name))
            .collect();
        for root in &roots {
            for database in ["alpha", "beta"] {
                write_schema(root, database, 1);
                write_schema(root, database, 2);
            }
        }

        let located = locate_all(&roots).unwrap();
        assert_eq!(located.len(), 6);
        assert!(located.iter().all(|schema| schema.version == 2));
    }

    #[test]
    fn test_databases_are_returned_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        for database in ["zeta", "alpha", "mu"] {
            write_schema(tmp.path(), database, 1);
        }
        let roots = BTreeSet::from([tmp.path().to_path_buf()]);

        let names: Vec<String> = locate_all(&roots)
            .unwrap()
            .into_iter()
            .map(|schema| schema.database)
            .collect();
        assert_eq!(names, ["alpha", "mu", "zeta"]);
    }

    #[test]
    fn test_same_database_in_two_roots_is_selected_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write_schema(&a, "appdb", 3);
        write_schema(&b, "appdb", 5);

        let located = locate_all(&BTreeSet::from([a, b])).unwrap();
        let versions: Vec<u64> = located.iter().map(|s| s.version).collect();
        assert_eq!(versions, [3, 5]);
    }

    #[test]
    fn test_missing_root_contributes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        write_schema(tmp.path(), "appdb", 1);
        let roots = BTreeSet::from([tmp.path().join("absent"), tmp.path().to_path_buf()]);
        assert_eq!(locate_all(&roots).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_database_directory_fails_the_whole_run() {
        let tmp = tempfile::tempdir().unwrap();
        write_schema(tmp.path(), "alpha", 1);
        fs::create_dir(tmp.path().join("empty")).unwrap();
        let roots = BTreeSet::from([tmp.path().to_path_buf()]);

        let err = locate_all(&roots).unwrap_err();
        assert!(matches!(err, FloorPlanError::NoSchemaFound { directory } if directory.ends_with("empty")));
    }

    #[test]
    fn test_files_directly_under_root_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("1.json"), "{}").unwrap();
        let roots = BTreeSet::from([tmp.path().to_path_buf()]);
        assert!(locate_all(&roots).unwrap().is_empty());
    }

    #[test]
    fn test_strict_locator_propagates_invalid_names() {
        let tmp = tempfile::tempdir().unwrap();
        write_schema(tmp.path(), "appdb", 1);
        fs::write(tmp.path().join("appdb").join("latest.json"), "{}").unwrap();
        let roots = BTreeSet::from([tmp.path().to_path_buf()]);

        assert_eq!(locate_all(&roots).unwrap().len(), 1);
        let err = SchemaLocator::new(VersionSelector::strict())
            .locate_all(&roots)
            .unwrap_err();
        assert!(matches!(err, FloorPlanError::InvalidVersionName { .. }));
    }

    #[test]
    fn test_resolve_without_roots_is_misconfigured_host() {
        let composite = CompositeRoots::new()
            .with(StaticRoots::default())
            .with(EnvRoots::from_var("FLOORPLAN_TEST_UNSET_VARIABLE"));
        let err = resolve_schema_roots(&composite).unwrap_err();
        assert!(matches!(err, FloorPlanError::MisconfiguredHost(_)));
    }

    #[test]
    fn test_composite_unions_and_deduplicates() {
        let composite = CompositeRoots::new()
            .with(StaticRoots::new(["schemas", "lib/schemas"]))
            .with(StaticRoots::default())
            .with(StaticRoots::new(["schemas"]));
        let roots = resolve_schema_roots(&composite).unwrap();
        assert_eq!(
            roots.into_iter().collect::<Vec<_>>(),
            [PathBuf::from("lib/schemas"), PathBuf::from("schemas")]
        );
    }

    #[test]
    fn test_empty_static_roots_are_still_configured() {
        let roots = resolve_schema_roots(&StaticRoots::new(Vec::<PathBuf>::new())).unwrap();
        assert!(roots.is_empty());
    }
}
