use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One entry in the task / work / schedule collections. The three sidebar
/// views share a table and differ only by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Task {
    pub id: String,
    pub bot_id: Option<String>,
    /// "task", "work", or "schedule"
    pub kind: String,
    pub title: String,
    /// "open", "in_progress", "done", "cancelled"
    pub status: String,
    /// Cron-style expression for schedule entries
    pub schedule: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateTaskInput {
    pub bot_id: Option<String>,
    pub kind: Option<String>,
    pub title: String,
    pub schedule: Option<String>,
}
