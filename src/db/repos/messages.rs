use rusqlite::{params, Row};

use crate::db::models::{ChatMessage, CreateMessageInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_message(row: &Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get("id")?,
        chat_id: row.get("chat_id")?,
        role: row.get("role")?,
        content: row.get("content")?,
        reply_to_id: row.get("reply_to_id")?,
        metadata: row.get("metadata")?,
        created_at: row.get("created_at")?,
    })
}

/// Full message log of a chat, oldest first, exactly as the UI renders it.
pub fn get_by_chat(pool: &DbPool, chat_id: &str) -> Result<Vec<ChatMessage>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM chat_messages WHERE chat_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![chat_id], row_to_message)?;
    let messages = rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)?;
    Ok(messages)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<ChatMessage, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM chat_messages WHERE id = ?1",
        params![id],
        row_to_message,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("ChatMessage {id}")),
        other => AppError::Database(other),
    })
}

pub fn create(pool: &DbPool, input: CreateMessageInput) -> Result<ChatMessage, AppError> {
    if let Some(ref reply_to) = input.reply_to_id {
        // Reply target must exist in the same chat
        let target = get_by_id(pool, reply_to)?;
        if target.chat_id != input.chat_id {
            return Err(AppError::Validation(
                "Reply target belongs to a different chat".into(),
            ));
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO chat_messages (id, chat_id, role, content, reply_to_id, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            input.chat_id,
            input.role,
            input.content,
            input.reply_to_id,
            input.metadata,
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn count_by_chat(pool: &DbPool, chat_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM chat_messages WHERE chat_id = ?1",
        params![chat_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM chat_messages WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
