//! Fire-and-forget mirroring of local changes to the backend.
//!
//! Local writes are the source of truth; a failed mirror only logs a
//! warning and never rolls the local change back.

use std::sync::Arc;

use crate::api::PlatformClient;
use crate::db::models::{Bot, Chat, ChatOrigin};
use crate::db::repos::models;
use crate::db::DbPool;
use crate::error::AppError;

pub fn spawn_bot_upsert(client: Arc<PlatformClient>, bot: Bot) {
    tokio::spawn(async move {
        if let Err(e) = client.upsert_bot(&bot).await {
            tracing::warn!(bot = %bot.name, error = %e, "Bot mirror to backend failed");
        }
    });
}

pub fn spawn_bot_delete(client: Arc<PlatformClient>, bot_id: String) {
    tokio::spawn(async move {
        if let Err(e) = client.delete_bot(&bot_id).await {
            tracing::warn!(bot_id = %bot_id, error = %e, "Bot deletion mirror failed");
        }
    });
}

/// Mirror an archive toggle for chats that originated on the platform.
/// Native chats have nothing to mirror and are skipped.
pub fn spawn_chat_archive(client: Arc<PlatformClient>, chat: Chat, archived: bool) {
    if chat.origin != ChatOrigin::Platform {
        return;
    }
    let Some(channel_id) = chat.platform_channel_id.clone() else {
        tracing::warn!(chat_id = %chat.id, "Platform chat without channel id, skipping mirror");
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = client.set_chat_archived(&channel_id, archived).await {
            tracing::warn!(chat_id = %chat.id, error = %e, "Chat archive mirror failed");
        }
    });
}

/// Replace the local model list with the backend's. On failure the list
/// already in the store (at minimum the seeded fallback) stays in place.
pub async fn refresh_models(pool: &DbPool, client: &PlatformClient) -> Result<usize, AppError> {
    match client.list_models().await {
        Ok(remote) if !remote.is_empty() => {
            let entries: Vec<(String, String, String, bool)> = remote
                .into_iter()
                .map(|m| (m.id, m.name, m.provider, m.is_default))
                .collect();
            let count = entries.len();
            models::replace_all(pool, &entries)?;
            tracing::info!(count, "Model list refreshed from backend");
            Ok(count)
        }
        Ok(_) => {
            tracing::warn!("Backend returned no models, keeping local list");
            Ok(0)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model refresh failed, keeping local list");
            Ok(0)
        }
    }
}
