use rusqlite::{params, Row};

use crate::db::models::ModelEntry;
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_model(row: &Row) -> rusqlite::Result<ModelEntry> {
    Ok(ModelEntry {
        id: row.get("id")?,
        name: row.get("name")?,
        provider: row.get("provider")?,
        is_default: row.get::<_, i32>("is_default")? != 0,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<ModelEntry>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT * FROM models ORDER BY provider, name")?;
    let rows = stmt.query_map([], row_to_model)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// The platform-wide default model. Falls back to the first cached entry
/// when no row carries the default flag.
pub fn get_default(pool: &DbPool) -> Result<Option<ModelEntry>, AppError> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT * FROM models ORDER BY is_default DESC, provider, name LIMIT 1",
        [],
        row_to_model,
    );
    match result {
        Ok(model) => Ok(Some(model)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Replace the whole cache with a fresh backend listing. Runs in one
/// transaction so readers never observe a half-replaced list.
pub fn replace_all(
    pool: &DbPool,
    entries: &[(String, String, String, bool)], // (id, name, provider, is_default)
) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM models", [])?;
    for (id, name, provider, is_default) in entries {
        tx.execute(
            "INSERT INTO models (id, name, provider, is_default, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, provider, *is_default as i32, now],
        )?;
    }

    tx.commit()?;
    tracing::debug!(count = entries.len(), "Model cache refreshed");
    Ok(())
}
