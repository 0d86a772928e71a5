use rusqlite::{params, Row};

use crate::db::models::{CreateTaskInput, Task};
use crate::db::DbPool;
use crate::error::AppError;

const KINDS: [&str; 3] = ["task", "work", "schedule"];
const STATUSES: [&str; 4] = ["open", "in_progress", "done", "cancelled"];

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        bot_id: row.get("bot_id")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        status: row.get("status")?,
        schedule: row.get("schedule")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool, kind: Option<&str>) -> Result<Vec<Task>, AppError> {
    let conn = pool.get()?;
    let tasks = match kind {
        Some(k) => {
            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE kind = ?1 ORDER BY created_at DESC")?;
            let rows = stmt.query_map(params![k], row_to_task)?;
            rows.filter_map(|r| r.ok()).collect()
        }
        None => {
            let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY created_at DESC")?;
            let rows = stmt.query_map([], row_to_task)?;
            rows.filter_map(|r| r.ok()).collect()
        }
    };
    Ok(tasks)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Task, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Task {id}")),
            other => AppError::Database(other),
        })
}

pub fn get_by_bot(pool: &DbPool, bot_id: &str, kind: Option<&str>) -> Result<Vec<Task>, AppError> {
    let conn = pool.get()?;
    let tasks = match kind {
        Some(k) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE bot_id = ?1 AND kind = ?2 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![bot_id, k], row_to_task)?;
            rows.filter_map(|r| r.ok()).collect()
        }
        None => {
            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE bot_id = ?1 ORDER BY created_at DESC")?;
            let rows = stmt.query_map(params![bot_id], row_to_task)?;
            rows.filter_map(|r| r.ok()).collect()
        }
    };
    Ok(tasks)
}

pub fn create(pool: &DbPool, input: CreateTaskInput) -> Result<Task, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    let kind = input.kind.unwrap_or_else(|| "task".into());
    if !KINDS.contains(&kind.as_str()) {
        return Err(AppError::Validation(format!("Unknown task kind: {kind}")));
    }
    if kind == "schedule" && input.schedule.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(AppError::Validation(
            "Schedule entries require a schedule expression".into(),
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO tasks (id, bot_id, kind, title, status, schedule, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?6, ?6)",
        params![id, input.bot_id, kind, input.title.trim(), input.schedule, now],
    )?;

    get_by_id(pool, &id)
}

pub fn set_status(pool: &DbPool, id: &str, status: &str) -> Result<Task, AppError> {
    if !STATUSES.contains(&status) {
        return Err(AppError::Validation(format!("Unknown task status: {status}")));
    }
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, now],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("Task {id}")));
    }
    get_by_id(pool, id)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
