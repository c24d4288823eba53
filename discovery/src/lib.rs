//! Room schema discovery, latest-version selection, and export.
//!
//! Room's schema export writes `{root}/{database}/{version}.json`. This crate
//! finds the newest snapshot of every database under a set of roots and turns
//! each one into a DBML file (or standard output) through a small pipeline:
//!
//! 1. [`locate::SchemaLocator`] walks the roots and asks
//!    [`version::VersionSelector`] for the highest version per database.
//! 2. [`export::plan_tasks`] pairs every schema with an
//!    [`output::OutputDestination`] from [`output::resolve_destination`].
//! 3. [`export::ExportPipeline`] parses, renders, and writes each task,
//!    sequentially or on a rayon pool.
//!
//! [`generate`] runs all three steps from a [`config::FloorPlanConfig`].
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use floorplan_discovery::config::FloorPlanConfig;
//! use floorplan_discovery::export::ExportPipeline;
//! use floorplan_discovery::generate;
//!
//! let root = tempfile::tempdir().unwrap();
//! let db = root.path().join("orders");
//! std::fs::create_dir(&db).unwrap();
//! for version in [1, 2] {
//!     let json = format!(r#"{{"database": {{"version": {version}, "entities": []}}}}"#);
//!     std::fs::write(db.join(format!("{version}.json")), json).unwrap();
//! }
//!
//! let out = tempfile::tempdir().unwrap();
//! let config = FloorPlanConfig {
//!     output_dir: Some(out.path().to_path_buf()),
//!     ..FloorPlanConfig::default()
//! };
//! let roots = BTreeSet::from([root.path().to_path_buf()]);
//!
//! let summary = generate(&roots, &config, &ExportPipeline::new()).unwrap();
//! assert_eq!(summary.outcomes.len(), 1);
//! assert!(out.path().join("orders_2.dbml").exists());
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod locate;
pub mod output;
pub mod report;
pub mod version;

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

pub use error::{FloorPlanError, Result};

use config::FloorPlanConfig;
use export::{ExportPipeline, ExportSummary, plan_tasks};
use locate::SchemaLocator;

/// Locates the latest schema of every database under `roots` and exports
/// each one as configured.
///
/// # Errors
///
/// Locating and planning are fail-fast. Task failures follow
/// `config.failure_policy`: the first failure is returned under fail-fast,
/// otherwise failures are listed in the summary.
pub fn generate(
    roots: &BTreeSet<PathBuf>,
    config: &FloorPlanConfig,
    pipeline: &ExportPipeline,
) -> Result<ExportSummary> {
    let schemas = SchemaLocator::new(config.version_selector()).locate_all(roots)?;
    let tasks = plan_tasks(&schemas, config.output_dir.as_deref(), config.output_format())?;
    info!(schemas = schemas.len(), "exporting schemas");
    pipeline.export_all(&tasks, &config.export_options())
}
