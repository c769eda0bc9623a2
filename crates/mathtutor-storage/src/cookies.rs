//! Cookie jar
//!
//! Cookies behave like the browser's: each carries an absolute expiry and
//! an expired cookie reads as absent.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::StorageError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub struct CookieJar {
    db: Database,
}

impl CookieJar {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a live cookie by name
    pub fn get(&self, name: &str) -> Result<Option<Cookie>> {
        self.db.with_connection(|conn| read_cookie(conn, name))
    }

    /// Get just the value of a live cookie
    pub fn value(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name)?.map(|cookie| cookie.value))
    }

    pub fn set(&self, cookie: &Cookie) -> Result<()> {
        self.db.with_connection(|conn| write_cookie(conn, cookie))
    }

    /// Write several cookies in one transaction
    pub fn set_all(&self, cookies: &[Cookie]) -> Result<()> {
        self.db.transaction(|conn| {
            for cookie in cookies {
                write_cookie(conn, cookie)?;
            }
            Ok(())
        })?;

        tracing::debug!(count = cookies.len(), "Stored cookies");

        Ok(())
    }

    /// Remove several cookies in one transaction. Missing names are ignored.
    pub fn remove_all(&self, names: &[&str]) -> Result<()> {
        self.db.transaction(|conn| delete_cookies(conn, names))
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.remove_all(&[name])
    }
}

impl Clone for CookieJar {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

fn read_cookie(conn: &Connection, name: &str) -> Result<Option<Cookie>> {
    let now = Utc::now().timestamp_millis();

    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT value, expires_at FROM cookies WHERE name = ?1 AND expires_at > ?2",
            rusqlite::params![name, now],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(value, expires_ms)| -> Result<Cookie> {
        let expires_at = DateTime::from_timestamp_millis(expires_ms)
            .ok_or_else(|| StorageError::InvalidTimestamp(name.to_string()))?;
        Ok(Cookie {
            name: name.to_string(),
            value,
            expires_at,
        })
    })
    .transpose()
}

/// Delete cookies on an open connection, e.g. inside a wider transaction.
pub fn delete_cookies(conn: &Connection, names: &[&str]) -> Result<()> {
    for name in names {
        conn.execute("DELETE FROM cookies WHERE name = ?1", [name])?;
    }
    Ok(())
}

fn write_cookie(conn: &Connection, cookie: &Cookie) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cookies (name, value, expires_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            cookie.name,
            cookie.value,
            cookie.expires_at.timestamp_millis()
        ],
    )?;
    Ok(())
}
