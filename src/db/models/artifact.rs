use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A named, versioned content object produced by a tool invocation and
/// displayed in the side panel. Saving under an existing (chat, name)
/// pair creates the next version instead of overwriting.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Artifact {
    pub id: String,
    pub chat_id: String,
    pub name: String,
    pub version: i64,
    pub content_type: String,
    pub content: String,
    pub created_at: String,
}
