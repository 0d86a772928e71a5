use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::AppError;
use crate::flow::NameSuggester;

// ============================================================================
// Helper
// ============================================================================

/// Convert any displayable error into `AppError::Api`.
fn api_err(e: impl std::fmt::Display) -> AppError {
    AppError::Api(e.to_string())
}

// ============================================================================
// Response / request types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    pub setup_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthModeResponse {
    /// "password" or "sso"
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NameSuggestionsResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModel {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub models: Vec<RemoteModel>,
}

/// One outgoing chat turn with everything the backend needs to run it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendRequest {
    pub bot_id: String,
    pub chat_id: String,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Enabled tool names for this bot
    pub tools: Vec<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

/// Usage and timing metadata attached to every completed reply.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    pub model: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost_usd: Option<f64>,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChatReplyResponse {
    pub content: String,
    pub metadata: Option<ReplyMetadata>,
}

// ============================================================================
// Internal request bodies (not exported to TS)
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupAdminBody<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateNamesBody<'a> {
    existing: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BotUpsertBody<'a> {
    name: &'a str,
    description: Option<&'a str>,
    system_prompt: &'a str,
    icon: Option<&'a str>,
    color: Option<&'a str>,
    tools: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveBody {
    archived: bool,
}

// ============================================================================
// PlatformClient
// ============================================================================

/// HTTP client that wraps all botforge backend endpoints.
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    /// Session token obtained from login or admin setup
    token: RwLock<Option<String>>,
}

impl PlatformClient {
    /// Create a new `PlatformClient` with the given backend base URL.
    ///
    /// The underlying `reqwest::Client` is configured with a 30-second timeout.
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");

        Self {
            http,
            base_url,
            token: RwLock::new(None),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    // --------------------------------------------------------------------
    // Private HTTP helpers
    // --------------------------------------------------------------------

    /// Build a request to the given endpoint path, with the session token
    /// attached when one is held.
    fn authed(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.token.read().ok().and_then(|t| t.clone()) {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request, check the status code, and deserialize the JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let resp = req.send().await.map_err(api_err)?;
        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "Backend rejected the session ({})",
                resp.status()
            )));
        }
        resp.error_for_status()
            .map_err(api_err)?
            .json()
            .await
            .map_err(api_err)
    }

    /// Send a request, check the status code, and discard the response body.
    async fn send_ok(&self, req: reqwest::RequestBuilder) -> Result<(), AppError> {
        let resp = req.send().await.map_err(api_err)?;
        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "Backend rejected the session ({})",
                resp.status()
            )));
        }
        resp.error_for_status().map_err(api_err)?;
        Ok(())
    }

    // --------------------------------------------------------------------
    // Setup & auth
    // --------------------------------------------------------------------

    /// `GET /api/setup/status` -- whether first-run admin setup is pending.
    pub async fn setup_status(&self) -> Result<SetupStatusResponse, AppError> {
        self.send_json(self.authed(reqwest::Method::GET, "/api/setup/status"))
            .await
    }

    /// `GET /api/auth/mode` -- which login method the backend expects.
    pub async fn auth_mode(&self) -> Result<AuthModeResponse, AppError> {
        self.send_json(self.authed(reqwest::Method::GET, "/api/auth/mode"))
            .await
    }

    /// `POST /api/auth/login` -- exchange credentials for a session token.
    /// The token is retained for subsequent requests.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let req = self
            .authed(reqwest::Method::POST, "/api/auth/login")
            .json(&LoginBody { email, password });
        let resp: LoginResponse = self.send_json(req).await?;
        self.set_token(Some(resp.token.clone()));
        Ok(resp)
    }

    /// `POST /api/setup/admin` -- create the first admin account. Also logs
    /// the fresh account in.
    pub async fn setup_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<LoginResponse, AppError> {
        let req = self
            .authed(reqwest::Method::POST, "/api/setup/admin")
            .json(&SetupAdminBody { email, password, name });
        let resp: LoginResponse = self.send_json(req).await?;
        self.set_token(Some(resp.token.clone()));
        Ok(resp)
    }

    // --------------------------------------------------------------------
    // Bots & chat
    // --------------------------------------------------------------------

    /// `POST /api/bots/generate-names` -- candidate names for a new bot,
    /// avoiding the caller's existing ones.
    pub async fn generate_bot_names(&self, existing: &[String]) -> Result<Vec<String>, AppError> {
        let req = self
            .authed(reqwest::Method::POST, "/api/bots/generate-names")
            .json(&GenerateNamesBody { existing });
        let resp: NameSuggestionsResponse = self.send_json(req).await?;
        Ok(resp.names)
    }

    /// `POST /api/chat/send` -- send one user message and get the bot's
    /// reply with usage metadata.
    pub async fn send_chat_message(
        &self,
        request: &ChatSendRequest,
    ) -> Result<ChatReplyResponse, AppError> {
        let req = self
            .authed(reqwest::Method::POST, "/api/chat/send")
            .json(request);
        self.send_json(req).await
    }

    /// `GET /api/models` -- models the backend currently offers.
    pub async fn list_models(&self) -> Result<Vec<RemoteModel>, AppError> {
        let resp: ModelsResponse = self
            .send_json(self.authed(reqwest::Method::GET, "/api/models"))
            .await?;
        Ok(resp.models)
    }

    /// `PUT /api/bots/{id}` -- mirror a locally created or edited bot.
    pub async fn upsert_bot(&self, bot: &crate::db::models::Bot) -> Result<(), AppError> {
        let req = self
            .authed(reqwest::Method::PUT, &format!("/api/bots/{}", bot.id))
            .json(&BotUpsertBody {
                name: &bot.name,
                description: bot.description.as_deref(),
                system_prompt: &bot.system_prompt,
                icon: bot.icon.as_deref(),
                color: bot.color.as_deref(),
                tools: bot.tool_names(),
            });
        self.send_ok(req).await
    }

    /// `DELETE /api/bots/{id}` -- mirror a local bot deletion.
    pub async fn delete_bot(&self, bot_id: &str) -> Result<(), AppError> {
        self.send_ok(self.authed(reqwest::Method::DELETE, &format!("/api/bots/{}", bot_id)))
            .await
    }

    /// `POST /api/chats/{id}/archive` -- mirror a chat archive toggle for
    /// chats that originated on the platform.
    pub async fn set_chat_archived(
        &self,
        platform_channel_id: &str,
        archived: bool,
    ) -> Result<(), AppError> {
        let req = self
            .authed(
                reqwest::Method::POST,
                &format!("/api/chats/{}/archive", platform_channel_id),
            )
            .json(&ArchiveBody { archived });
        self.send_ok(req).await
    }
}

#[async_trait]
impl NameSuggester for PlatformClient {
    async fn suggest_names(&self, existing: &[String]) -> Result<Vec<String>, AppError> {
        self.generate_bot_names(existing).await
    }
}
