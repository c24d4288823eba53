//! Room schema model, schema JSON parsing, and DBML rendering.
//!
//! This crate defines the types and transforms behind floorplan:
//!
//! - [`Project`]: a named database schema snapshot wrapping a [`Database`]
//!   (entities, views, setup queries) as exported by the Room persistence
//!   library.
//! - [`SchemaParser`] / [`RoomSchemaParser`]: reading a `{version}.json`
//!   export into a [`Project`] named after its directory.
//! - [`DiagramRenderer`] / [`DbmlRenderer`]: deterministic DBML output
//!   controlled by a [`DbmlConfiguration`].
//!
//! # Example
//!
//! ```
//! use floorplan_core::*;
//!
//! let json = r#"{
//!   "formatVersion": 1,
//!   "database": {
//!     "version": 3,
//!     "identityHash": "abc",
//!     "entities": [{
//!       "tableName": "Order",
//!       "createSql": "CREATE TABLE IF NOT EXISTS `${TABLE_NAME}` (`id` INTEGER NOT NULL, PRIMARY KEY(`id`))",
//!       "fields": [{"fieldPath": "id", "columnName": "id", "affinity": "INTEGER", "notNull": true}],
//!       "primaryKey": {"columnNames": ["id"], "autoGenerate": false}
//!     }]
//!   }
//! }"#;
//!
//! let project = RoomSchemaParser.parse_str("orders", json).unwrap();
//! let renderer = DbmlRenderer::new(DbmlConfiguration::new(true, false));
//! let dbml = renderer.render(&project);
//!
//! assert!(dbml.starts_with("Project orders {"));
//! assert!(dbml.contains("Table Order {"));
//! assert!(dbml.contains("Note: 'CREATE TABLE IF NOT EXISTS `Order`"));
//! ```

mod dbml;
mod error;
mod room;
mod types;

pub use dbml::{DbmlConfiguration, DbmlRenderer, DiagramRenderer};
pub use error::{ParseError, Result};
pub use room::{RoomSchemaParser, SchemaParser, project_name_for};
pub use types::*;
