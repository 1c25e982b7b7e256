//! Flat key-value table holding JSON-encoded values.

use crate::db::db::Db;
use anyhow::Result;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;

const UPSERT: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";
const SELECT_ONE: &str = "SELECT value FROM kv WHERE key = ?1";
const DELETE_ONE: &str = "DELETE FROM kv WHERE key = ?1";

pub struct KeyValues {
    db: Db,
}

impl KeyValues {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self.db.conn.query_row(SELECT_ONE, params![key], |row| row.get(0)).optional()?;
        Ok(match raw {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        })
    }

    /// Reads several keys at once. Absent keys are simply missing from the map.
    pub fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT key, value FROM kv WHERE key IN ({})", placeholders);
        let mut stmt = self.db.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(keys.iter()), |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, raw) = row?;
            values.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(values)
    }

    /// Writes all entries in one transaction, so a crash never leaves half a snapshot.
    pub fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<()> {
        let tx = self.db.conn.transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT, params![key, value.to_string()])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn remove_many(&mut self, keys: &[&str]) -> Result<()> {
        let tx = self.db.conn.transaction()?;
        for key in keys {
            tx.execute(DELETE_ONE, params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}
