use rusqlite::{params, Row};

use crate::db::models::{Chat, ChatOrigin, CreateChatInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_chat(row: &Row) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get("id")?,
        bot_id: row.get("bot_id")?,
        title: row.get("title")?,
        origin: ChatOrigin::from_str_lossy(&row.get::<_, String>("origin")?),
        platform_channel_id: row.get("platform_channel_id")?,
        pinned: row.get::<_, i32>("pinned")? != 0,
        archived: row.get::<_, i32>("archived")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// List chats, pinned first, newest activity next.
pub fn get_all(pool: &DbPool, include_archived: bool) -> Result<Vec<Chat>, AppError> {
    let conn = pool.get()?;
    let sql = if include_archived {
        "SELECT * FROM chats ORDER BY pinned DESC, updated_at DESC"
    } else {
        "SELECT * FROM chats WHERE archived = 0 ORDER BY pinned DESC, updated_at DESC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], row_to_chat)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Chat, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM chats WHERE id = ?1", params![id], row_to_chat)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Chat {id}")),
            other => AppError::Database(other),
        })
}

pub fn get_by_bot(pool: &DbPool, bot_id: &str) -> Result<Vec<Chat>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM chats WHERE bot_id = ?1 ORDER BY pinned DESC, updated_at DESC",
    )?;
    let rows = stmt.query_map(params![bot_id], row_to_chat)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(pool: &DbPool, input: CreateChatInput) -> Result<Chat, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let origin = input.origin.unwrap_or(ChatOrigin::Native);

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO chats
         (id, bot_id, title, origin, platform_channel_id, pinned, archived, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6)",
        params![
            id,
            input.bot_id,
            input.title.trim(),
            origin.as_str(),
            input.platform_channel_id,
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn rename(pool: &DbPool, id: &str, title: &str) -> Result<Chat, AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE chats SET title = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, title.trim(), now],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Chat {id}")));
    }
    get_by_id(pool, id)
}

pub fn set_pinned(pool: &DbPool, id: &str, pinned: bool) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE chats SET pinned = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, pinned as i32, now],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Chat {id}")));
    }
    Ok(())
}

/// Flip the archive flag. Callers decide whether the change also needs a
/// backend sync (platform-linked chats do, native chats are local-only).
pub fn set_archived(pool: &DbPool, id: &str, archived: bool) -> Result<Chat, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE chats SET archived = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, archived as i32, now],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Chat {id}")));
    }
    get_by_id(pool, id)
}

/// Bump updated_at so the chat surfaces at the top of the sidebar.
pub fn touch(pool: &DbPool, id: &str) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE chats SET updated_at = ?2 WHERE id = ?1",
        params![id, now],
    )?;
    Ok(())
}

/// Remove every message of a chat, keeping the chat itself.
pub fn clear_messages(pool: &DbPool, id: &str) -> Result<usize, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM chat_messages WHERE chat_id = ?1", params![id])?;
    Ok(rows)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM chats WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::repos::messages;
    use crate::db::models::CreateMessageInput;

    fn new_chat(pool: &DbPool, title: &str) -> Chat {
        create(
            pool,
            CreateChatInput {
                bot_id: None,
                title: title.into(),
                origin: None,
                platform_channel_id: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_crud_chat() {
        let pool = init_test_db().unwrap();

        let chat = new_chat(&pool, "Morning standup");
        assert_eq!(chat.origin, ChatOrigin::Native);
        assert!(!chat.pinned);

        let renamed = rename(&pool, &chat.id, "Standup notes").unwrap();
        assert_eq!(renamed.title, "Standup notes");

        assert!(delete(&pool, &chat.id).unwrap());
        assert!(get_by_id(&pool, &chat.id).is_err());
    }

    #[test]
    fn test_pinned_ordering_and_archive_filter() {
        let pool = init_test_db().unwrap();
        let a = new_chat(&pool, "A");
        let b = new_chat(&pool, "B");
        let c = new_chat(&pool, "C");

        set_pinned(&pool, &b.id, true).unwrap();
        set_archived(&pool, &c.id, true).unwrap();

        let visible = get_all(&pool, false).unwrap();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].id, b.id);

        let everything = get_all(&pool, true).unwrap();
        assert_eq!(everything.len(), 3);
        assert!(everything.iter().any(|ch| ch.id == a.id));
    }

    #[test]
    fn test_platform_origin_round_trip() {
        let pool = init_test_db().unwrap();
        let chat = create(
            &pool,
            CreateChatInput {
                bot_id: None,
                title: "Telegram mirror".into(),
                origin: Some(ChatOrigin::Platform),
                platform_channel_id: Some("tg-1234".into()),
            },
        )
        .unwrap();

        let fetched = get_by_id(&pool, &chat.id).unwrap();
        assert_eq!(fetched.origin, ChatOrigin::Platform);
        assert_eq!(fetched.platform_channel_id, Some("tg-1234".into()));
    }

    #[test]
    fn test_clear_messages_keeps_chat() {
        let pool = init_test_db().unwrap();
        let chat = new_chat(&pool, "To be cleared");

        for i in 0..3 {
            messages::create(
                &pool,
                CreateMessageInput {
                    chat_id: chat.id.clone(),
                    role: "user".into(),
                    content: format!("msg {i}"),
                    reply_to_id: None,
                    metadata: None,
                },
            )
            .unwrap();
        }

        let removed = clear_messages(&pool, &chat.id).unwrap();
        assert_eq!(removed, 3);
        assert!(get_by_id(&pool, &chat.id).is_ok());
        assert!(messages::get_by_chat(&pool, &chat.id).unwrap().is_empty());
    }
}
