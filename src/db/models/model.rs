use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Cached entry from the backend model list.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub is_default: bool,
    pub updated_at: String,
}
