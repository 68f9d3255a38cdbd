use crate::Database;
use crate::models::{TagRow, TodoRow, TodoTagRow};
use anyhow::Result;
use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, Row};

/// Equality predicate on a whitelisted column. Callers are responsible for
/// only passing column names they control.
#[derive(Debug, Clone)]
pub struct ColumnEq {
    pub column: &'static str,
    pub value: Value,
}

impl ColumnEq {
    pub fn new(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

const TODO_COLUMNS: &str = "id, content, is_done, owner, created_at, updated_at";
const TAG_COLUMNS: &str = "id, name, created_at, updated_at";
const TODO_TAG_COLUMNS: &str = "id, todo_id, tag_id, created_at, updated_at";

fn now() -> String {
    // Fixed-width so lexical order matches chronological order
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

impl Database {
    // -- Todos --

    /// Returns `None` when a row with the same id already exists.
    pub fn insert_todo(
        &self,
        id: &str,
        content: &str,
        is_done: bool,
        owner: &str,
    ) -> Result<Option<TodoRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO todos (id, content, is_done, owner, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, content, is_done, owner, ts],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(TodoRow {
                id: id.to_string(),
                content: content.to_string(),
                is_done,
                owner: owner.to_string(),
                created_at: ts.clone(),
                updated_at: ts.clone(),
            }))
        })
    }

    pub fn get_todo(&self, id: &str) -> Result<Option<TodoRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS);
            conn.query_row(&sql, [id], todo_from_row).optional()
        })
    }

    pub fn list_todos(&self, filter: &[ColumnEq]) -> Result<Vec<TodoRow>> {
        self.with_conn(|conn| select_where(conn, "todos", TODO_COLUMNS, filter, todo_from_row))
    }

    /// Applies the supplied fields only. Returns the updated row, or `None`
    /// if no row has that id.
    pub fn update_todo(
        &self,
        id: &str,
        content: Option<&str>,
        is_done: Option<bool>,
    ) -> Result<Option<TodoRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE todos
                 SET content = COALESCE(?2, content),
                     is_done = COALESCE(?3, is_done),
                     updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![id, content, is_done, ts],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS);
            conn.query_row(&sql, [id], todo_from_row).optional()
        })
    }

    pub fn delete_todo(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM todos WHERE id = ?1", [id])? > 0))
    }

    // -- Tags --

    pub fn insert_tag(&self, id: &str, name: &str) -> Result<Option<TagRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO tags (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![id, name, ts],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(TagRow {
                id: id.to_string(),
                name: name.to_string(),
                created_at: ts.clone(),
                updated_at: ts.clone(),
            }))
        })
    }

    pub fn get_tag(&self, id: &str) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tags WHERE id = ?1", TAG_COLUMNS);
            conn.query_row(&sql, [id], tag_from_row).optional()
        })
    }

    pub fn list_tags(&self, filter: &[ColumnEq]) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| select_where(conn, "tags", TAG_COLUMNS, filter, tag_from_row))
    }

    pub fn update_tag(&self, id: &str, name: Option<&str>) -> Result<Option<TagRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE tags SET name = COALESCE(?2, name), updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, name, ts],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM tags WHERE id = ?1", TAG_COLUMNS);
            conn.query_row(&sql, [id], tag_from_row).optional()
        })
    }

    pub fn delete_tag(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM tags WHERE id = ?1", [id])? > 0))
    }

    // -- TodoTags --

    pub fn insert_todo_tag(
        &self,
        id: &str,
        todo_id: &str,
        tag_id: &str,
    ) -> Result<Option<TodoTagRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO todo_tags (id, todo_id, tag_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id, todo_id, tag_id, ts],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(TodoTagRow {
                id: id.to_string(),
                todo_id: todo_id.to_string(),
                tag_id: tag_id.to_string(),
                created_at: ts.clone(),
                updated_at: ts.clone(),
            }))
        })
    }

    pub fn get_todo_tag(&self, id: &str) -> Result<Option<TodoTagRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM todo_tags WHERE id = ?1", TODO_TAG_COLUMNS);
            conn.query_row(&sql, [id], todo_tag_from_row).optional()
        })
    }

    pub fn list_todo_tags(&self, filter: &[ColumnEq]) -> Result<Vec<TodoTagRow>> {
        self.with_conn(|conn| {
            select_where(conn, "todo_tags", TODO_TAG_COLUMNS, filter, todo_tag_from_row)
        })
    }

    pub fn update_todo_tag(
        &self,
        id: &str,
        todo_id: Option<&str>,
        tag_id: Option<&str>,
    ) -> Result<Option<TodoTagRow>> {
        let ts = now();
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE todo_tags
                 SET todo_id = COALESCE(?2, todo_id),
                     tag_id = COALESCE(?3, tag_id),
                     updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![id, todo_id, tag_id, ts],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM todo_tags WHERE id = ?1", TODO_TAG_COLUMNS);
            conn.query_row(&sql, [id], todo_tag_from_row).optional()
        })
    }

    pub fn delete_todo_tag(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM todo_tags WHERE id = ?1", [id])? > 0)
        })
    }
}

fn select_where<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    filter: &[ColumnEq],
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut sql = format!("SELECT {} FROM {}", columns, table);
    if !filter.is_empty() {
        let clauses: Vec<String> = filter
            .iter()
            .enumerate()
            .map(|(i, cond)| format!("{} = ?{}", cond.column, i + 1))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at, id");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = filter.iter().map(|cond| &cond.value as &dyn ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok(TodoRow {
        id: row.get(0)?,
        content: row.get(1)?,
        is_done: row.get(2)?,
        owner: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn todo_tag_from_row(row: &Row<'_>) -> rusqlite::Result<TodoTagRow> {
    Ok(TodoTagRow {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        tag_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_partial_update() {
        let db = Database::open_in_memory().unwrap();
        db.insert_todo("t1", "Buy milk", false, "alice").unwrap().unwrap();

        let row = db.update_todo("t1", None, Some(true)).unwrap().unwrap();
        assert_eq!(row.content, "Buy milk");
        assert!(row.is_done);

        let row = db.update_todo("t1", Some("Buy oat milk"), None).unwrap().unwrap();
        assert_eq!(row.content, "Buy oat milk");
        assert!(row.is_done);

        assert!(db.update_todo("missing", Some("x"), None).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_tag("tag-1", "home").unwrap().is_some());
        assert!(db.insert_tag("tag-1", "work").unwrap().is_none());
        assert_eq!(db.get_tag("tag-1").unwrap().unwrap().name, "home");
    }

    #[test]
    fn test_list_with_filter() {
        let db = Database::open_in_memory().unwrap();
        db.insert_todo_tag("j1", "t1", "tag-1").unwrap();
        db.insert_todo_tag("j2", "t1", "tag-2").unwrap();
        db.insert_todo_tag("j3", "t2", "tag-1").unwrap();

        let by_todo = db
            .list_todo_tags(&[ColumnEq::new("todo_id", "t1".to_string())])
            .unwrap();
        assert_eq!(by_todo.len(), 2);

        let exact = db
            .list_todo_tags(&[
                ColumnEq::new("todo_id", "t2".to_string()),
                ColumnEq::new("tag_id", "tag-1".to_string()),
            ])
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, "j3");

        assert_eq!(db.list_todo_tags(&[]).unwrap().len(), 3);
    }

    #[test]
    fn test_join_rows_survive_parent_delete() {
        // The store performs no cascading delete.
        let db = Database::open_in_memory().unwrap();
        db.insert_todo("t1", "Buy milk", false, "alice").unwrap();
        db.insert_todo_tag("j1", "t1", "tag-1").unwrap();

        assert!(db.delete_todo("t1").unwrap());
        assert!(!db.delete_todo("t1").unwrap());
        assert!(db.get_todo_tag("j1").unwrap().is_some());
    }
}
