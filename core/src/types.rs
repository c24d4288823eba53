//! Project model for exported Room database schemas.
//!
//! The types mirror the structure of the JSON files Room writes to its
//! `room.schemaLocation` directory (one file per database version). They
//! deserialize directly from that format, using Room's camelCase keys, and
//! serialize back the same way.

use serde::{Deserialize, Serialize};

/// Placeholder Room writes into entity `createSql` statements.
pub const TABLE_NAME_PLACEHOLDER: &str = "${TABLE_NAME}";

/// Placeholder Room writes into view `createSql` statements.
pub const VIEW_NAME_PLACEHOLDER: &str = "${VIEW_NAME}";

/// A parsed schema snapshot, named after the logical database it belongs to.
///
/// # Examples
///
/// ```
/// use floorplan_core::{Database, Project};
///
/// let project = Project::new("AppDatabase", Database::new(3, "abc123"));
/// assert_eq!(project.name, "AppDatabase");
/// assert_eq!(project.database.version, 3);
/// assert!(project.database.entities.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Logical database name (the database directory name).
    pub name: String,
    /// Room export format version (`formatVersion`), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    /// The database snapshot.
    pub database: Database,
}

impl Project {
    /// Creates a project with an unknown export format version.
    pub fn new(name: impl Into<String>, database: Database) -> Self {
        Self {
            name: name.into(),
            format_version: None,
            database,
        }
    }
}

/// One version of a database schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Schema version declared on the `@Database` annotation.
    pub version: u64,
    /// Hash Room uses to detect schema changes.
    #[serde(default)]
    pub identity_hash: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub views: Vec<View>,
    /// Statements Room runs when opening the database.
    #[serde(default)]
    pub setup_queries: Vec<String>,
}

impl Database {
    /// Creates an empty database snapshot.
    pub fn new(version: u64, identity_hash: impl Into<String>) -> Self {
        Self {
            version,
            identity_hash: identity_hash.into(),
            entities: Vec::new(),
            views: Vec::new(),
            setup_queries: Vec::new(),
        }
    }

    /// Adds an entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Adds a view.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Finds an entity by table name.
    pub fn find_entity(&self, table_name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.table_name == table_name)
    }
}

/// A table.
///
/// # Examples
///
/// ```
/// use floorplan_core::{Affinity, Entity, Field};
///
/// let entity = Entity::new("User")
///     .with_create_sql("CREATE TABLE IF NOT EXISTS `${TABLE_NAME}` (`id` INTEGER NOT NULL)")
///     .with_field(Field::new("id", Affinity::Integer).not_null())
///     .with_primary_key(&["id"], true);
///
/// assert_eq!(
///     entity.creation_sql(),
///     "CREATE TABLE IF NOT EXISTS `User` (`id` INTEGER NOT NULL)"
/// );
/// assert!(entity.is_single_column_primary_key("id"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub table_name: String,
    /// Creation statement with the `${TABLE_NAME}` placeholder.
    #[serde(default)]
    pub create_sql: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub primary_key: PrimaryKey,
    #[serde(default)]
    pub indices: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Entity {
    /// Creates an entity with no columns or keys.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            create_sql: String::new(),
            fields: Vec::new(),
            primary_key: PrimaryKey::default(),
            indices: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Sets the raw creation statement.
    pub fn with_create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = sql.into();
        self
    }

    /// Adds a column.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the primary key columns.
    pub fn with_primary_key(mut self, columns: &[&str], auto_generate: bool) -> Self {
        self.primary_key = PrimaryKey {
            column_names: columns.iter().map(|c| (*c).to_string()).collect(),
            auto_generate,
        };
        self
    }

    /// Adds an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// Adds a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Creation statement with the table name substituted.
    pub fn creation_sql(&self) -> String {
        self.create_sql
            .replace(TABLE_NAME_PLACEHOLDER, &self.table_name)
    }

    /// Returns `true` if `column` is the sole primary key column.
    pub fn is_single_column_primary_key(&self, column: &str) -> bool {
        matches!(self.primary_key.column_names.as_slice(), [only] if only == column)
    }

    /// Returns `true` if the primary key spans more than one column.
    pub fn has_composite_primary_key(&self) -> bool {
        self.primary_key.column_names.len() > 1
    }
}

/// SQLite type affinity of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Affinity {
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
    /// Unknown or missing affinity.
    #[default]
    #[serde(other)]
    Undefined,
}

impl Affinity {
    /// Upper-case SQL name, as Room writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Undefined => "UNDEFINED",
        }
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Path of the Kotlin/Java property backing the column.
    #[serde(default)]
    pub field_path: String,
    pub column_name: String,
    #[serde(default)]
    pub affinity: Affinity,
    #[serde(default)]
    pub not_null: bool,
    /// SQL default value expression, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Field {
    /// Creates a nullable column whose field path equals its column name.
    pub fn new(column_name: impl Into<String>, affinity: Affinity) -> Self {
        let column_name = column_name.into();
        Self {
            field_path: column_name.clone(),
            column_name,
            affinity,
            not_null: false,
            default_value: None,
        }
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the default value expression.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKey {
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub auto_generate: bool,
}

/// An index declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub column_names: Vec<String>,
    /// Per-column sort orders (`ASC`/`DESC`), empty when unspecified.
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(default)]
    pub create_sql: String,
}

impl Index {
    /// Creates an index over `columns`.
    pub fn new(name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            column_names: columns.iter().map(|c| (*c).to_string()).collect(),
            orders: Vec::new(),
            create_sql: String::new(),
        }
    }
}

/// A foreign key constraint from the owning entity to `table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    #[serde(default = "default_action")]
    pub on_delete: String,
    #[serde(default = "default_action")]
    pub on_update: String,
    /// Columns of the owning entity.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Columns of the referenced table.
    #[serde(default)]
    pub referenced_columns: Vec<String>,
}

fn default_action() -> String {
    "NO ACTION".to_string()
}

impl ForeignKey {
    /// Creates a foreign key with `NO ACTION` on delete and update.
    pub fn new(table: impl Into<String>, columns: &[&str], referenced_columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            on_delete: default_action(),
            on_update: default_action(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            referenced_columns: referenced_columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Sets the `ON DELETE` action (e.g. `"CASCADE"`).
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = action.into();
        self
    }

    /// Sets the `ON UPDATE` action.
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = action.into();
        self
    }
}

/// A database view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub view_name: String,
    #[serde(default)]
    pub create_sql: String,
}

impl View {
    pub fn new(view_name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        Self {
            view_name: view_name.into(),
            create_sql: create_sql.into(),
        }
    }

    /// Creation statement with the view name substituted.
    pub fn creation_sql(&self) -> String {
        self.create_sql.replace(VIEW_NAME_PLACEHOLDER, &self.view_name)
    }
}
