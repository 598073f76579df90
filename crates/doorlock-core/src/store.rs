//! SQLite persistence for access logs and registered users.
//!
//! Shared by the daemon (log inserts) and the admin app (everything else).

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// `access_time` storage format; sorts lexically in time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    log_capture TEXT,
    access_time TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    image_path TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the `logs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub name: String,
    pub log_capture: Option<String>,
    pub access_time: String,
}

/// One row of the `users` table.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub image_path: String,
}

/// Open (creating parent directories) and migrate the database at `path`.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    Ok(conn)
}

/// Create tables if they do not exist yet.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

pub fn insert_log(
    conn: &Connection,
    name: &str,
    log_capture: Option<&str>,
    at: DateTime<Local>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO logs (name, log_capture, access_time) VALUES (?1, ?2, ?3)",
        params![name, log_capture, at.format(TIMESTAMP_FORMAT).to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All log rows, newest first.
pub fn list_logs(conn: &Connection) -> rusqlite::Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, log_capture, access_time FROM logs
         ORDER BY access_time DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LogEntry {
            id: row.get(0)?,
            name: row.get(1)?,
            log_capture: row.get(2)?,
            access_time: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn insert_user(conn: &Connection, image_path: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT INTO users (image_path) VALUES (?1)", params![image_path])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare("SELECT id, image_path FROM users ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(UserRecord {
            id: row.get(0)?,
            image_path: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn find_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT id, image_path FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                image_path: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Returns true if a row was removed.
pub fn delete_user(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let n = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

#[cfg(test)]
pub(crate) fn memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = memory();
        migrate(&conn).unwrap();
    }

    #[test]
    fn test_logs_newest_first() {
        let conn = memory();
        let early = Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let late = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

        insert_log(&conn, "alice", Some("a.jpg"), early).unwrap();
        insert_log(&conn, "Unknown", Some("b.jpg"), late).unwrap();
        insert_log(&conn, "bob", None, early).unwrap();

        let logs = list_logs(&conn).unwrap();
        let names: Vec<&str> = logs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Unknown", "bob", "alice"]);
        assert_eq!(logs[0].access_time, "2024-05-01 09:30:00");
        assert_eq!(logs[1].log_capture, None);
    }

    #[test]
    fn test_user_crud() {
        let conn = memory();
        let a = insert_user(&conn, "alice.jpg").unwrap();
        let b = insert_user(&conn, "bob.png").unwrap();
        assert_ne!(a, b);

        assert_eq!(
            find_user(&conn, b).unwrap(),
            Some(UserRecord { id: b, image_path: "bob.png".into() })
        );
        assert!(delete_user(&conn, a).unwrap());
        assert!(!delete_user(&conn, a).unwrap());
        assert_eq!(list_users(&conn).unwrap().len(), 1);
        assert_eq!(find_user(&conn, a).unwrap(), None);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/doorlock.db");
        let conn = open(&path).unwrap();
        insert_user(&conn, "x.jpg").unwrap();
        assert!(path.exists());
    }
}
