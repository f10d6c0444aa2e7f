use crate::db::connection::DbPool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

pub fn migrate(pool: &DbPool) -> anyhow::Result<()> {
    tracing::debug!("[DB] Applying settings schema");

    let conn = pool.get()?;
    conn.execute_batch(SCHEMA)?;

    // Databases created before updated_at existed
    let mut stmt = conn.prepare("PRAGMA table_info(settings)")?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();
    if !columns.iter().any(|c| c == "updated_at") {
        conn.execute_batch(
            "ALTER TABLE settings ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''",
        )?;
    }

    Ok(())
}
