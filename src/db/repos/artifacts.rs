use rusqlite::{params, Row};

use crate::db::models::Artifact;
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_artifact(row: &Row) -> rusqlite::Result<Artifact> {
    Ok(Artifact {
        id: row.get("id")?,
        chat_id: row.get("chat_id")?,
        name: row.get("name")?,
        version: row.get("version")?,
        content_type: row.get("content_type")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Artifact, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM artifacts WHERE id = ?1",
        params![id],
        row_to_artifact,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Artifact {id}")),
        other => AppError::Database(other),
    })
}

/// Latest version of every named artifact in a chat (the side-panel listing).
pub fn list_by_chat(pool: &DbPool, chat_id: &str) -> Result<Vec<Artifact>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT a.* FROM artifacts a
         JOIN (SELECT name, MAX(version) AS v FROM artifacts WHERE chat_id = ?1 GROUP BY name) m
           ON a.name = m.name AND a.version = m.v
         WHERE a.chat_id = ?1
         ORDER BY a.created_at DESC",
    )?;
    let rows = stmt.query_map(params![chat_id], row_to_artifact)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Every version of one named artifact, newest first.
pub fn get_versions(pool: &DbPool, chat_id: &str, name: &str) -> Result<Vec<Artifact>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM artifacts WHERE chat_id = ?1 AND name = ?2 ORDER BY version DESC",
    )?;
    let rows = stmt.query_map(params![chat_id, name], row_to_artifact)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Save artifact content. A new (chat, name) pair starts at version 1;
/// an existing one gets the next version number.
pub fn save_version(
    pool: &DbPool,
    chat_id: &str,
    name: &str,
    content_type: Option<&str>,
    content: &str,
) -> Result<Artifact, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Artifact name cannot be empty".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let content_type = content_type.unwrap_or("text/markdown");

    let conn = pool.get()?;
    let next_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM artifacts WHERE chat_id = ?1 AND name = ?2",
        params![chat_id, name.trim()],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO artifacts (id, chat_id, name, version, content_type, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, chat_id, name.trim(), next_version, content_type, content, now],
    )?;

    get_by_id(pool, &id)
}

pub fn delete_all_versions(pool: &DbPool, chat_id: &str, name: &str) -> Result<usize, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "DELETE FROM artifacts WHERE chat_id = ?1 AND name = ?2",
        params![chat_id, name],
    )?;
    Ok(rows)
}
