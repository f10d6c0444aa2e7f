use crate::db::connection::{create_pool, DbPool};
use crate::db::migrate::migrate;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use versioner_core::config::SettingsSource;

pub fn get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?")?;
    let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let removed = conn.execute("DELETE FROM settings WHERE key = ?", params![key])?;
    Ok(removed > 0)
}

pub fn get_all(conn: &Connection) -> anyhow::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut map = BTreeMap::new();
    for r in rows {
        let (k, v) = r?;
        map.insert(k, v);
    }
    Ok(map)
}

/// Host-wide key/value settings, shared by every project on this machine
#[derive(Clone)]
pub struct SettingsStore {
    pool: DbPool,
}

impl SettingsStore {
    /// Open (creating if needed) the settings database at `db_path`.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = create_pool(db_path)?;
        migrate(&pool)?;
        Ok(Self { pool })
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.pool.get()?;
        get(&conn, key)
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.pool.get()?;
        set(&conn, key, value)
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let conn = self.pool.get()?;
        delete(&conn, key)
    }

    pub fn all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let conn = self.pool.get()?;
        get_all(&conn)
    }
}

impl SettingsSource for SettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        match SettingsStore::get(self, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not read setting");
                None
            }
        }
    }
}
