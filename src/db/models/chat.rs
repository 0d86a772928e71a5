use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Where a chat came from. Platform chats mirror an external messaging
/// channel and route archive/clear through the backend; native chats are
/// local-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ChatOrigin {
    Native,
    Platform,
}

impl ChatOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatOrigin::Native => "native",
            ChatOrigin::Platform => "platform",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "platform" => ChatOrigin::Platform,
            _ => ChatOrigin::Native,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Chat {
    pub id: String,
    pub bot_id: Option<String>,
    pub title: String,
    pub origin: ChatOrigin,
    /// External channel id for platform-linked chats (Telegram/Discord room)
    pub platform_channel_id: Option<String>,
    pub pinned: bool,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateChatInput {
    pub bot_id: Option<String>,
    pub title: String,
    pub origin: Option<ChatOrigin>,
    pub platform_channel_id: Option<String>,
}
