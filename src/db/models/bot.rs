use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Personality: typed envelope for the personality JSON column
// ============================================================================

/// Emoji usage preference collected during the creation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum EmojiPreference {
    Yes,
    No,
    Sometimes,
}

impl std::fmt::Display for EmojiPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EmojiPreference::Yes => "yes",
            EmojiPreference::No => "no",
            EmojiPreference::Sometimes => "sometimes",
        })
    }
}

/// The four collected preferences plus the language inferred from them.
/// Stored as JSON in the `personality` column and mirrored into the
/// generated system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BotPersonality {
    pub purpose_category: String,
    pub purpose_description: String,
    pub communication_style: String,
    pub use_emojis: EmojiPreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

impl BotPersonality {
    /// Serialize to JSON string for DB storage.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ============================================================================
// Bot
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub model_id: Option<String>,
    /// JSON array of tool names
    pub tools: String,
    /// JSON-encoded BotPersonality (None for bots not made by the flow)
    pub personality: Option<String>,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Bot {
    /// Parse the `personality` JSON string. Returns `None` if the column
    /// is NULL or unparseable.
    pub fn parsed_personality(&self) -> Option<BotPersonality> {
        self.personality
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Parse the `tools` JSON array. Unparseable content yields an empty set.
    pub fn tool_names(&self) -> Vec<String> {
        serde_json::from_str(&self.tools).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateBotInput {
    pub name: String,
    pub system_prompt: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub model_id: Option<String>,
    pub tools: Option<Vec<String>>,
    pub personality: Option<BotPersonality>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateBotInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub system_prompt: Option<String>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub model_id: Option<Option<String>>,
    pub tools: Option<Vec<String>>,
    pub personality: Option<Option<BotPersonality>>,
}
