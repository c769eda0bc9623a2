//! Key/value local storage

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::database::Database;
use crate::Result;

pub struct LocalStorage {
    db: Database,
}

impl LocalStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.db.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM local_storage WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db.with_connection(|conn| write_item(conn, key, value))
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.db.with_connection(|conn| delete_item(conn, key))
    }
}

pub fn write_item(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn delete_item(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
    Ok(())
}

impl Clone for LocalStorage {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
