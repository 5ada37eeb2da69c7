use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{helpers::parse_datetime, models::SessionFlag, Database};

fn row_to_flag(row: &Row) -> Result<SessionFlag> {
    let updated_at: String = row.get("updated_at")?;

    Ok(SessionFlag {
        key: row.get("key")?,
        value: row.get("value")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Insert or overwrite a session flag.
    pub async fn set_flag(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO session_flags (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write session flag {key}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_flag(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM session_flags WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read session flag {key}"))
        })
        .await
    }

    /// Remove a flag. Returns whether it existed.
    pub async fn remove_flag(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM session_flags WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove session flag {key}"))?;
            Ok(removed > 0)
        })
        .await
    }

    pub async fn list_flags(&self) -> Result<Vec<SessionFlag>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value, updated_at FROM session_flags ORDER BY key ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut flags = Vec::new();
            while let Some(row) = rows.next()? {
                flags.push(row_to_flag(row)?);
            }
            Ok(flags)
        })
        .await
    }
}
