//! DBML rendering of a [`Project`].
//!
//! The output is deterministic: entities, fields, indices and foreign keys
//! are emitted in the order they appear in the schema export, so the same
//! project and configuration always produce byte-identical text.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Entity, Field, ForeignKey, Index, Project};

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile"));
static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+(\.\d+)?$").expect("static regex must compile"));
static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'(?:[^']|'')*'$").expect("static regex must compile"));

/// Annotation switches for DBML output.
///
/// # Examples
///
/// ```
/// use floorplan_core::DbmlConfiguration;
///
/// let config = DbmlConfiguration::default();
/// assert!(!config.creation_sql_as_table_note);
/// assert!(!config.render_nullable_fields);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DbmlConfiguration {
    /// Emit each table's creation statement as its table note.
    pub creation_sql_as_table_note: bool,
    /// Mark nullable columns with an explicit `null` setting.
    pub render_nullable_fields: bool,
}

impl DbmlConfiguration {
    pub fn new(creation_sql_as_table_note: bool, render_nullable_fields: bool) -> Self {
        Self {
            creation_sql_as_table_note,
            render_nullable_fields,
        }
    }
}

/// Renders a parsed project into diagram markup.
pub trait DiagramRenderer: Send + Sync {
    /// Returns the markup for `project`. Must be deterministic.
    fn render(&self, project: &Project) -> String;
}

/// Renderer producing DBML text.
///
/// # Examples
///
/// ```
/// use floorplan_core::*;
///
/// let project = Project::new(
///     "AppDatabase",
///     Database::new(1, "f00").with_entity(
///         Entity::new("User")
///             .with_field(Field::new("id", Affinity::Integer).not_null())
///             .with_primary_key(&["id"], true),
///     ),
/// );
///
/// let dbml = DbmlRenderer::new(DbmlConfiguration::default()).render(&project);
/// assert!(dbml.contains("Table User {"));
/// assert!(dbml.contains("  id INTEGER [pk, increment, not null]"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DbmlRenderer {
    config: DbmlConfiguration,
}

impl DbmlRenderer {
    pub fn new(config: DbmlConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> DbmlConfiguration {
        self.config
    }

    fn render_project_header(&self, out: &mut String, project: &Project) {
        let db = &project.database;
        let note = if db.identity_hash.is_empty() {
            format!("Room schema version {}", db.version)
        } else {
            format!(
                "Room schema version {}, identity hash {}",
                db.version, db.identity_hash
            )
        };

        let _ = writeln!(out, "Project {} {{", identifier(&project.name));
        out.push_str("  database_type: 'SQLite'\n");
        let _ = writeln!(out, "  Note: {}", quote(&note));
        out.push_str("}\n");
    }

    fn render_table(&self, out: &mut String, entity: &Entity) {
        let _ = writeln!(out, "Table {} {{", identifier(&entity.table_name));

        for field in &entity.fields {
            self.render_field(out, entity, field);
        }

        let index_lines = index_lines(entity);
        if !index_lines.is_empty() {
            out.push_str("\n  Indexes {\n");
            for line in index_lines {
                let _ = writeln!(out, "    {line}");
            }
            out.push_str("  }\n");
        }

        if self.config.creation_sql_as_table_note && !entity.create_sql.is_empty() {
            let _ = writeln!(out, "\n  Note: {}", quote(&entity.creation_sql()));
        }

        out.push_str("}\n");
    }

    fn render_field(&self, out: &mut String, entity: &Entity, field: &Field) {
        let mut settings: Vec<String> = Vec::new();

        if entity.is_single_column_primary_key(&field.column_name) {
            settings.push("pk".to_string());
            if entity.primary_key.auto_generate {
                settings.push("increment".to_string());
            }
        }

        if field.not_null {
            settings.push("not null".to_string());
        } else if self.config.render_nullable_fields {
            settings.push("null".to_string());
        }

        if let Some(default) = field.default_value.as_deref() {
            settings.push(format!("default: {}", default_value(default)));
        }

        let _ = write!(
            out,
            "  {} {}",
            identifier(&field.column_name),
            field.affinity
        );
        if !settings.is_empty() {
            let _ = write!(out, " [{}]", settings.join(", "));
        }
        out.push('\n');
    }
}

impl DiagramRenderer for DbmlRenderer {
    fn render(&self, project: &Project) -> String {
        let mut out = String::new();
        self.render_project_header(&mut out, project);

        for entity in &project.database.entities {
            out.push('\n');
            self.render_table(&mut out, entity);
        }

        let refs: Vec<String> = project
            .database
            .entities
            .iter()
            .flat_map(|entity| {
                entity
                    .foreign_keys
                    .iter()
                    .map(move |fk| reference_line(entity, fk))
            })
            .collect();
        if !refs.is_empty() {
            out.push('\n');
            for line in refs {
                out.push_str(&line);
                out.push('\n');
            }
        }

        if !project.database.views.is_empty() {
            out.push('\n');
            for view in &project.database.views {
                let sql = view.creation_sql();
                let mut lines = sql.lines();
                let _ = writeln!(
                    out,
                    "// View {}: {}",
                    view.view_name,
                    lines.next().unwrap_or_default()
                );
                for line in lines {
                    let _ = writeln!(out, "// {line}");
                }
            }
        }

        out
    }
}

fn index_lines(entity: &Entity) -> Vec<String> {
    let mut lines = Vec::new();

    if entity.has_composite_primary_key() {
        lines.push(format!(
            "{} [pk]",
            column_group(&entity.primary_key.column_names)
        ));
    }

    for index in &entity.indices {
        lines.push(index_line(index));
    }

    lines
}

fn index_line(index: &Index) -> String {
    let mut settings = vec![format!("name: {}", quote(&index.name))];
    if index.unique {
        settings.push("unique".to_string());
    }
    format!("{} [{}]", column_group(&index.column_names), settings.join(", "))
}

fn reference_line(entity: &Entity, fk: &ForeignKey) -> String {
    format!(
        "Ref: {}.{} > {}.{} [delete: {}, update: {}]",
        identifier(&entity.table_name),
        column_group(&fk.columns),
        identifier(&fk.table),
        column_group(&fk.referenced_columns),
        fk.on_delete.to_lowercase(),
        fk.on_update.to_lowercase()
    )
}

/// A single column renders bare, several as a parenthesized list.
fn column_group(columns: &[String]) -> String {
    match columns {
        [single] => identifier(single),
        _ => format!(
            "({})",
            columns
                .iter()
                .map(|c| identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}

/// Single-quoted DBML string, or a triple-quoted one when `text` spans lines.
fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    if text.contains('\n') {
        format!("'''{escaped}'''")
    } else {
        format!("'{escaped}'")
    }
}

fn default_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if NUMERIC_LITERAL.is_match(trimmed) || STRING_LITERAL.is_match(trimmed) {
        return trimmed.to_string();
    }
    match trimmed.to_ascii_uppercase().as_str() {
        "NULL" => "null".to_string(),
        "TRUE" => "true".to_string(),
        "FALSE" => "false".to_string(),
        _ => format!("`{trimmed}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Affinity, Database, View};

    fn library_project() -> Project {
        let user = Entity::new("User")
            .with_create_sql(
                "CREATE TABLE IF NOT EXISTS `${TABLE_NAME}` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `name` TEXT)",
            )
            .with_field(Field::new("id", Affinity::Integer).not_null())
            .with_field(Field::new("name", Affinity::Text))
            .with_primary_key(&["id"], true)
            .with_index(Index::new("index_User_name", &["name"], true));

        let book = Entity::new("Book")
            .with_field(Field::new("id", Affinity::Integer).not_null())
            .with_field(
                Field::new("ownerId", Affinity::Integer)
                    .not_null()
                    .with_default("0"),
            )
            .with_primary_key(&["id"], false)
            .with_foreign_key(ForeignKey::new("User", &["ownerId"], &["id"]).on_delete("CASCADE"));

        Project::new(
            "LibraryDb",
            Database::new(4, "0c4a1f").with_entity(user).with_entity(book),
        )
    }

    #[test]
    fn test_render_default_configuration() {
        let dbml = DbmlRenderer::default().render(&library_project());
        let expected = "\
Project LibraryDb {
  database_type: 'SQLite'
  Note: 'Room schema version 4, identity hash 0c4a1f'
}

Table User {
  id INTEGER [pk, increment, not null]
  name TEXT

  Indexes {
    name [name: 'index_User_name', unique]
  }
}

Table Book {
  id INTEGER [pk, not null]
  ownerId INTEGER [not null, default: 0]
}

Ref: Book.ownerId > User.id [delete: cascade, update: no action]
";
        assert_eq!(dbml, expected);
    }

    #[test]
    fn test_render_nullable_fields() {
        let renderer = DbmlRenderer::new(DbmlConfiguration::new(false, true));
        let dbml = renderer.render(&library_project());
        assert!(dbml.contains("  name TEXT [null]\n"));
        assert!(dbml.contains("  id INTEGER [pk, increment, not null]\n"));
    }

    #[test]
    fn test_render_creation_sql_as_table_note() {
        let renderer = DbmlRenderer::new(DbmlConfiguration::new(true, false));
        let dbml = renderer.render(&library_project());
        assert!(dbml.contains(
            "  Note: 'CREATE TABLE IF NOT EXISTS `User` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `name` TEXT)'\n"
        ));
        // Book has no creation statement, so no note is emitted for it.
        assert_eq!(dbml.matches("  Note: 'CREATE").count(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = DbmlRenderer::new(DbmlConfiguration::new(true, true));
        let project = library_project();
        assert_eq!(renderer.render(&project), renderer.render(&project));
    }

    #[test]
    fn test_composite_keys_and_references() {
        let membership = Entity::new("Membership")
            .with_field(Field::new("userId", Affinity::Integer).not_null())
            .with_field(Field::new("groupId", Affinity::Integer).not_null())
            .with_primary_key(&["userId", "groupId"], false)
            .with_index(Index::new("index_Membership_groupId_userId", &["groupId", "userId"], false))
            .with_foreign_key(
                ForeignKey::new("Pair", &["userId", "groupId"], &["a", "b"])
                    .on_delete("SET NULL")
                    .on_update("RESTRICT"),
            );
        let project = Project::new("Db", Database::new(1, "").with_entity(membership));

        let dbml = DbmlRenderer::default().render(&project);
        assert!(dbml.contains("  userId INTEGER [not null]\n"));
        assert!(dbml.contains("    (userId, groupId) [pk]\n"));
        assert!(dbml.contains("    (groupId, userId) [name: 'index_Membership_groupId_userId']\n"));
        assert!(dbml.contains(
            "Ref: Membership.(userId, groupId) > Pair.(a, b) [delete: set null, update: restrict]\n"
        ));
        assert!(dbml.contains("  Note: 'Room schema version 1'\n"));
    }

    #[test]
    fn test_identifiers_are_quoted_when_needed() {
        assert_eq!(identifier("user_id"), "user_id");
        assert_eq!(identifier("com.example.AppDb"), "\"com.example.AppDb\"");
        assert_eq!(identifier("first name"), "\"first name\"");
        assert_eq!(identifier("1st"), "\"1st\"");
    }

    #[test]
    fn test_default_value_mapping() {
        assert_eq!(default_value("0"), "0");
        assert_eq!(default_value("-1.5"), "-1.5");
        assert_eq!(default_value("'draft'"), "'draft'");
        assert_eq!(default_value("NULL"), "null");
        assert_eq!(default_value("true"), "true");
        assert_eq!(default_value("CURRENT_TIMESTAMP"), "`CURRENT_TIMESTAMP`");
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), "'it\\'s'");
    }

    #[test]
    fn test_multi_line_text_uses_triple_quotes() {
        assert_eq!(quote("a\nb's"), "'''a\nb\\'s'''");

        let entity = Entity::new("Tag")
            .with_create_sql("CREATE TABLE `${TABLE_NAME}` (\n  `id` INTEGER NOT NULL\n)")
            .with_field(Field::new("id", Affinity::Integer).not_null());
        let project = Project::new("Db", Database::new(1, "h").with_entity(entity));
        let dbml = DbmlRenderer::new(DbmlConfiguration::new(true, false)).render(&project);
        assert!(dbml.contains("  Note: '''CREATE TABLE `Tag` (\n  `id` INTEGER NOT NULL\n)'''\n"));
    }

    #[test]
    fn test_multi_line_view_is_commented_on_every_line() {
        let project = Project::new(
            "Db",
            Database::new(2, "h").with_view(View::new(
                "Owners",
                "CREATE VIEW `${VIEW_NAME}` AS\nSELECT *\nFROM User",
            )),
        );
        let dbml = DbmlRenderer::default().render(&project);
        assert!(dbml.ends_with("\n// View Owners: CREATE VIEW `Owners` AS\n// SELECT *\n// FROM User\n"));
    }

    #[test]
    fn test_views_render_as_comments() {
        let project = Project::new(
            "Db",
            Database::new(2, "h").with_view(View::new(
                "Owners",
                "CREATE VIEW `${VIEW_NAME}` AS SELECT * FROM User",
            )),
        );
        let dbml = DbmlRenderer::default().render(&project);
        assert!(dbml.ends_with("\n// View Owners: CREATE VIEW `Owners` AS SELECT * FROM User\n"));
    }
}
