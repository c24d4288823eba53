//! Parsing of Room's exported schema JSON.
//!
//! Room writes one file per database version:
//!
//! ```text
//! {
//!   "formatVersion": 1,
//!   "database": {
//!     "version": 2,
//!     "identityHash": "...",
//!     "entities": [ ... ],
//!     "views": [ ... ],
//!     "setupQueries": [ ... ]
//!   }
//! }
//! ```
//!
//! The file itself does not carry the database name; Room encodes it in the
//! directory the file lives in, so [`RoomSchemaParser`] names the resulting
//! [`Project`] after the parent directory.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ParseError, Result};
use crate::types::{Database, Project};

/// Parses a schema snapshot file into a [`Project`].
///
/// Implementations must be shareable across export workers.
pub trait SchemaParser: Send + Sync {
    /// Reads and parses the schema file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming `path` if the file cannot be read or
    /// is not a valid schema.
    fn parse(&self, path: &Path) -> Result<Project>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomSchemaFile {
    #[serde(default)]
    format_version: Option<u32>,
    database: Database,
}

/// Parser for Room `{version}.json` schema exports.
///
/// # Examples
///
/// ```
/// use floorplan_core::RoomSchemaParser;
///
/// let json = r#"{
///   "formatVersion": 1,
///   "database": {
///     "version": 2,
///     "identityHash": "f00",
///     "entities": [{
///       "tableName": "User",
///       "createSql": "CREATE TABLE IF NOT EXISTS `${TABLE_NAME}` (`id` INTEGER NOT NULL, PRIMARY KEY(`id`))",
///       "fields": [{"fieldPath": "id", "columnName": "id", "affinity": "INTEGER", "notNull": true}],
///       "primaryKey": {"columnNames": ["id"], "autoGenerate": true}
///     }]
///   }
/// }"#;
///
/// let project = RoomSchemaParser.parse_str("AppDatabase", json).unwrap();
/// assert_eq!(project.name, "AppDatabase");
/// assert_eq!(project.database.version, 2);
/// assert_eq!(project.database.entities[0].table_name, "User");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSchemaParser;

impl RoomSchemaParser {
    /// Parses schema JSON held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] (with an empty path) if `json` is not a
    /// valid Room schema.
    pub fn parse_str(&self, name: &str, json: &str) -> Result<Project> {
        parse_with_path(name, json, Path::new(""))
    }
}

impl SchemaParser for RoomSchemaParser {
    fn parse(&self, path: &Path) -> Result<Project> {
        let raw = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_with_path(&project_name_for(path), &raw, path)
    }
}

fn parse_with_path(name: &str, json: &str, path: &Path) -> Result<Project> {
    let file: RoomSchemaFile = serde_json::from_str(json).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Project {
        name: name.to_string(),
        format_version: file.format_version,
        database: file.database,
    })
}

/// Derives the project name for a schema file: the parent directory name,
/// falling back to the file stem.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use floorplan_core::project_name_for;
///
/// assert_eq!(project_name_for(Path::new("/schemas/com.example.AppDb/3.json")), "com.example.AppDb");
/// assert_eq!(project_name_for(Path::new("3.json")), "3");
/// ```
pub fn project_name_for(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .or_else(|| path.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string())
}
