#[macro_use]
pub mod macros;
pub mod migrations;
pub mod models;
pub mod repos;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::PathBuf;

use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Connection customizer that sets per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -8000;",
        )?;
        Ok(())
    }
}

/// Initialize the database: create file, enable WAL + foreign keys, run migrations, seed data.
pub fn init_db(app_data_dir: &PathBuf) -> Result<DbPool, AppError> {
    std::fs::create_dir_all(app_data_dir)?;
    let db_path = app_data_dir.join("botforge.db");

    tracing::info!(path = %db_path.display(), "Initializing database");

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    // Set WAL journal mode (database-wide, only needs to run once)
    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::debug!("SQLite pragmas configured (WAL, FK, busy_timeout)");
    }

    // Run migrations
    {
        let conn = pool.get()?;
        migrations::run(&conn)?;
    }

    // Seed builtin data
    {
        let conn = pool.get()?;
        seed_default_bot(&conn)?;
        seed_fallback_model(&conn)?;
    }

    tracing::info!("Database initialized successfully");
    Ok(pool)
}

/// Seed the designated default bot. It always exists and cannot be deleted.
fn seed_default_bot(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO bots
         (id, name, description, system_prompt, icon, color, tools, is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
        params![
            "builtin-default-bot",
            "Assistant",
            "General-purpose assistant",
            "You are Assistant, a helpful general-purpose AI assistant.",
            "sparkles",
            "#6366F1",
            r#"["web_search","documents","calculator"]"#,
            now,
        ],
    )?;

    tracing::debug!("Default bot seeded");
    Ok(())
}

/// Seed one fallback model row so bot creation works before the first
/// successful model-list refresh from the backend.
fn seed_fallback_model(conn: &rusqlite::Connection) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO models (id, name, provider, is_default, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params!["builtin-default-model", "Platform Default", "platform", now],
    )?;

    tracing::debug!("Fallback model seeded");
    Ok(())
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    use std::time::Duration;

    // Use a unique temp file for each test to avoid in-memory connection issues with r2d2.
    let tmp = std::env::temp_dir().join(format!("botforge_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let conn = pool.get()?;
    migrations::run(&conn)?;
    seed_default_bot(&conn)?;
    seed_fallback_model(&conn)?;
    drop(conn);
    Ok(pool)
}
