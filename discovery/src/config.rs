//! Run configuration for schema export.
//!
//! Loaded from a YAML file and overlaid with command-line flags.
//!
//! # Example YAML
//!
//! ```yaml
//! output_dir: build/floorplan
//! format: dbml
//! creation_sql_as_table_note: true
//! render_nullable_fields: false
//! schema_dirs:
//!   - app/schemas
//! jobs: 4
//! failure_policy: collect_all
//! strict_versions: false
//! ```
//!
//! Every field is optional. Relative paths are resolved against the current
//! directory. `schema_dirs: []` is not the same as leaving the key out: it
//! configures an empty root list, so the run exports nothing instead of
//! failing for lack of roots.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use floorplan_core::DbmlConfiguration;
use serde::{Deserialize, Serialize};

use crate::error::{FloorPlanError, Result};
use crate::export::{ExportOptions, FailurePolicy};
use crate::output::{FormatKind, OutputFormat};
use crate::version::VersionSelector;

/// Export configuration.
///
/// # Examples
///
/// ```
/// use floorplan_discovery::config::FloorPlanConfig;
///
/// let config: FloorPlanConfig = serde_yaml::from_str("render_nullable_fields: true").unwrap();
/// assert!(config.render_nullable_fields);
/// assert!(config.output_dir.is_none());
/// assert!(config.schema_dirs.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorPlanConfig {
    /// Directory for rendered files; absent means standard output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub format: FormatKind,
    pub creation_sql_as_table_note: bool,
    pub render_nullable_fields: bool,
    /// Schema roots; `None` when not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_dirs: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub strict_versions: bool,
}

/// Command-line values layered over a [`FloorPlanConfig`].
///
/// Boolean switches can only turn a setting on.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub format: Option<FormatKind>,
    pub creation_sql_as_table_note: bool,
    pub render_nullable_fields: bool,
    pub schema_dirs: Vec<PathBuf>,
    pub jobs: Option<usize>,
    pub keep_going: bool,
    pub strict_versions: bool,
}

impl FloorPlanConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`FloorPlanError::Config`] if the file cannot be read or is not
    /// valid configuration YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |message: String| FloorPlanError::Config {
            path: path.to_path_buf(),
            message,
        };

        let file = std::fs::File::open(path).map_err(|e| config_error(e.to_string()))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| config_error(e.to_string()))
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`FloorPlanError::Config`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_error = |message: String| FloorPlanError::Config {
            path: path.to_path_buf(),
            message,
        };

        let file = std::fs::File::create(path).map_err(|e| config_error(e.to_string()))?;
        serde_yaml::to_writer(BufWriter::new(file), self).map_err(|e| config_error(e.to_string()))
    }

    /// Applies command-line overrides.
    ///
    /// Values given on the command line replace file values; extra schema
    /// directories are added to the configured ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use floorplan_discovery::config::{ConfigOverrides, FloorPlanConfig};
    /// use floorplan_discovery::export::FailurePolicy;
    ///
    /// let mut config = FloorPlanConfig {
    ///     jobs: Some(2),
    ///     ..FloorPlanConfig::default()
    /// };
    /// config.merge_overrides(ConfigOverrides {
    ///     jobs: Some(8),
    ///     keep_going: true,
    ///     output_dir: Some(PathBuf::from("out")),
    ///     ..ConfigOverrides::default()
    /// });
    ///
    /// assert_eq!(config.jobs, Some(8));
    /// assert_eq!(config.failure_policy, FailurePolicy::CollectAll);
    /// assert_eq!(config.output_dir, Some(PathBuf::from("out")));
    /// ```
    pub fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if overrides.jobs.is_some() {
            self.jobs = overrides.jobs;
        }
        self.creation_sql_as_table_note |= overrides.creation_sql_as_table_note;
        self.render_nullable_fields |= overrides.render_nullable_fields;
        self.strict_versions |= overrides.strict_versions;
        if overrides.keep_going {
            self.failure_policy = FailurePolicy::CollectAll;
        }
        if !overrides.schema_dirs.is_empty() {
            let dirs = self.schema_dirs.get_or_insert_with(Vec::new);
            for dir in overrides.schema_dirs {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
    }

    pub fn dbml_configuration(&self) -> DbmlConfiguration {
        DbmlConfiguration::new(self.creation_sql_as_table_note, self.render_nullable_fields)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format.with_configuration(self.dbml_configuration())
    }

    pub fn version_selector(&self) -> VersionSelector {
        VersionSelector::new().with_strict(self.strict_versions)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            jobs: self.jobs,
            failure_policy: self.failure_policy,
            ..ExportOptions::default()
        }
    }
}

/// Source of a [`FloorPlanConfig`].
pub trait ConfigurationProvider {
    /// # Errors
    ///
    /// Returns [`FloorPlanError::Config`] when the configuration cannot be
    /// produced.
    fn configuration(&self) -> Result<FloorPlanConfig>;
}

impl ConfigurationProvider for FloorPlanConfig {
    fn configuration(&self) -> Result<FloorPlanConfig> {
        Ok(self.clone())
    }
}

/// Configuration read from a YAML file on every request.
#[derive(Debug, Clone)]
pub struct YamlConfigFile(pub PathBuf);

impl ConfigurationProvider for YamlConfigFile {
    fn configuration(&self) -> Result<FloorPlanConfig> {
        FloorPlanConfig::load(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: FloorPlanConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, FloorPlanConfig::default());
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.output_format(), OutputFormat::default());
        assert!(!config.version_selector().is_strict());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = "\
output_dir: build/floorplan
format: dbml
creation_sql_as_table_note: true
render_nullable_fields: true
schema_dirs: [app/schemas, lib/schemas]
jobs: 3
failure_policy: collect_all
strict_versions: true
";
        let config: FloorPlanConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("build/floorplan")));
        assert_eq!(config.schema_dirs.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.dbml_configuration(), DbmlConfiguration::new(true, true));
        assert!(config.version_selector().is_strict());

        let options = config.export_options();
        assert_eq!(options.jobs, Some(3));
        assert_eq!(options.failure_policy, FailurePolicy::CollectAll);
    }

    #[test]
    fn test_unknown_failure_policy_is_rejected() {
        let result: std::result::Result<FloorPlanConfig, _> =
            serde_yaml::from_str("failure_policy: sometimes");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_load_preserves_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floorplan.yml");
        let config = FloorPlanConfig {
            output_dir: Some(PathBuf::from("out")),
            render_nullable_fields: true,
            schema_dirs: Some(vec![PathBuf::from("schemas")]),
            ..FloorPlanConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(YamlConfigFile(path).configuration().unwrap(), config);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let err = FloorPlanConfig::load(&missing).unwrap_err();
        assert!(matches!(err, FloorPlanError::Config { ref path, .. } if *path == missing));

        let invalid = dir.path().join("invalid.yml");
        std::fs::write(&invalid, "jobs: [not, a, number]").unwrap();
        let err = FloorPlanConfig::load(&invalid).unwrap_err();
        assert!(err.to_string().contains("invalid.yml"));
    }

    #[test]
    fn test_overrides_keep_file_values_when_absent() {
        let mut config = FloorPlanConfig {
            output_dir: Some(PathBuf::from("from-file")),
            creation_sql_as_table_note: true,
            schema_dirs: Some(vec![PathBuf::from("a")]),
            ..FloorPlanConfig::default()
        };
        config.merge_overrides(ConfigOverrides {
            schema_dirs: vec![PathBuf::from("a"), PathBuf::from("b")],
            ..ConfigOverrides::default()
        });

        assert_eq!(config.output_dir, Some(PathBuf::from("from-file")));
        assert!(config.creation_sql_as_table_note);
        assert_eq!(
            config.schema_dirs,
            Some(vec![PathBuf::from("a"), PathBuf::from("b")])
        );
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_empty_schema_dirs_differs_from_absent() {
        let absent: FloorPlanConfig = serde_yaml::from_str("jobs: 1").unwrap();
        assert_eq!(absent.schema_dirs, None);

        let mut empty: FloorPlanConfig = serde_yaml::from_str("schema_dirs: []").unwrap();
        assert_eq!(empty.schema_dirs, Some(Vec::new()));

        empty.merge_overrides(ConfigOverrides::default());
        assert_eq!(empty.schema_dirs, Some(Vec::new()));
    }
}
