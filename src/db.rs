use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "marksheet.sqlite3";

pub const MARKSHEETS_KEY: &str = "marksheets";
pub const STUDENT_RESULTS_KEY: &str = "studentResults";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // Stores created before timestamps were tracked lack updated_at.
    ensure_kv_updated_at(&conn)?;

    Ok(conn)
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value, &now),
    )?;
    Ok(())
}

pub fn kv_remove(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
    Ok(n > 0)
}

pub fn kv_get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> anyhow::Result<Option<T>> {
    let Some(text) = kv_get(conn, key)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&text)
        .with_context(|| format!("stored value for '{}' is not valid JSON", key))?;
    Ok(Some(value))
}

pub fn kv_set_json<T: Serialize + ?Sized>(
    conn: &Connection,
    key: &str,
    value: &T,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize value for '{}'", key))?;
    kv_set(conn, key, &text)
}

fn ensure_kv_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "kv_store", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE kv_store ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute(
            "CREATE TABLE kv_store(key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .expect("create legacy table");
        ensure_kv_updated_at(&conn).expect("migrate");
        conn
    }

    #[test]
    fn set_overwrites_and_remove_reports_presence() {
        let conn = memory_db();
        assert_eq!(kv_get(&conn, MARKSHEETS_KEY).expect("get"), None);

        kv_set(&conn, MARKSHEETS_KEY, "[1]").expect("set");
        kv_set(&conn, MARKSHEETS_KEY, "[2]").expect("overwrite");
        assert_eq!(
            kv_get(&conn, MARKSHEETS_KEY).expect("get").as_deref(),
            Some("[2]")
        );

        assert!(kv_remove(&conn, MARKSHEETS_KEY).expect("remove"));
        assert!(!kv_remove(&conn, MARKSHEETS_KEY).expect("remove again"));
    }

    #[test]
    fn corrupt_json_is_an_error_not_empty() {
        let conn = memory_db();
        kv_set(&conn, STUDENT_RESULTS_KEY, "{not json").expect("set");
        let got: anyhow::Result<Option<Vec<i64>>> = kv_get_json(&conn, STUDENT_RESULTS_KEY);
        assert!(got.is_err());
    }

    #[test]
    fn legacy_table_gains_updated_at() {
        let conn = memory_db();
        assert!(table_has_column(&conn, "kv_store", "updated_at").expect("pragma"));
    }
}
