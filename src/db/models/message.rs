use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single turn in a chat's message log. The creation flow appends its
/// dialogue here too; there is no separate transcript.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    /// "user", "assistant", or "system"
    pub role: String,
    pub content: String,
    /// Message this one replies to (reply-preview / inline-citation UI)
    pub reply_to_id: Option<String>,
    /// Optional JSON metadata (token/cost/latency from the backend)
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateMessageInput {
    pub chat_id: String,
    pub role: String,
    pub content: String,
    pub reply_to_id: Option<String>,
    pub metadata: Option<String>,
}
