use rusqlite::Connection;

use crate::error::AppError;

/// Run the consolidated schema migration. Idempotent.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("Running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("Database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Bots
-- ============================================================================

CREATE TABLE IF NOT EXISTS bots (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    description         TEXT,
    system_prompt       TEXT NOT NULL,
    icon                TEXT,
    color               TEXT,
    model_id            TEXT,
    tools               TEXT NOT NULL DEFAULT '[]',
    personality         TEXT,
    is_default          INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_bots_name ON bots(name COLLATE NOCASE);

-- ============================================================================
-- Chats
-- ============================================================================

CREATE TABLE IF NOT EXISTS chats (
    id                  TEXT PRIMARY KEY,
    bot_id              TEXT REFERENCES bots(id) ON DELETE CASCADE,
    title               TEXT NOT NULL,
    origin              TEXT NOT NULL DEFAULT 'native',
    platform_channel_id TEXT,
    pinned              INTEGER NOT NULL DEFAULT 0,
    archived            INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chats_bot_id   ON chats(bot_id);
CREATE INDEX IF NOT EXISTS idx_chats_archived ON chats(archived);

CREATE TABLE IF NOT EXISTS chat_messages (
    id          TEXT PRIMARY KEY,
    chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    role        TEXT NOT NULL,
    content     TEXT NOT NULL,
    reply_to_id TEXT REFERENCES chat_messages(id) ON DELETE SET NULL,
    metadata    TEXT,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_messages_chat ON chat_messages(chat_id, created_at);

-- ============================================================================
-- Model cache (mirror of the backend model list)
-- ============================================================================

CREATE TABLE IF NOT EXISTS models (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    provider    TEXT NOT NULL,
    is_default  INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT NOT NULL
);

-- ============================================================================
-- Tasks (task / work / schedule collections)
-- ============================================================================

CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    bot_id      TEXT REFERENCES bots(id) ON DELETE CASCADE,
    kind        TEXT NOT NULL DEFAULT 'task',
    title       TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    schedule    TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_bot_kind ON tasks(bot_id, kind);

-- ============================================================================
-- Artifacts (versioned content objects from tool invocations)
-- ============================================================================

CREATE TABLE IF NOT EXISTS artifacts (
    id           TEXT PRIMARY KEY,
    chat_id      TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    version      INTEGER NOT NULL DEFAULT 1,
    content_type TEXT NOT NULL DEFAULT 'text/markdown',
    content      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE(chat_id, name, version)
);
CREATE INDEX IF NOT EXISTS idx_artifacts_chat ON artifacts(chat_id, name);

-- ============================================================================
-- App Settings (key/value; flow snapshot, UI preferences, session metadata)
-- ============================================================================

CREATE TABLE IF NOT EXISTS app_settings (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
