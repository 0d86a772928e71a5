use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::api::PlatformClient;
use crate::error::AppError;

/// What the client knows about its backend session after startup.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// First-run admin setup still pending on the backend
    pub setup_required: bool,
    /// Login method the backend expects ("password" when unknown)
    pub auth_mode: String,
    pub authenticated: bool,
    pub user_name: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            setup_required: false,
            auth_mode: "password".to_string(),
            authenticated: false,
            user_name: None,
        }
    }
}

/// Probe the backend at startup. Both probes degrade to defaults when the
/// backend is unreachable so the client still starts in offline mode.
pub async fn bootstrap(client: &PlatformClient) -> SessionState {
    let setup_required = match client.setup_status().await {
        Ok(resp) => resp.setup_required,
        Err(e) => {
            tracing::warn!(error = %e, "Setup status check failed, assuming setup is done");
            false
        }
    };

    let auth_mode = match client.auth_mode().await {
        Ok(resp) => resp.mode,
        Err(e) => {
            tracing::warn!(error = %e, "Auth mode check failed, assuming password login");
            "password".to_string()
        }
    };

    SessionState {
        setup_required,
        auth_mode,
        authenticated: client.has_token(),
        user_name: None,
    }
}

/// Log in and fold the result into the session state.
pub async fn login(
    client: &PlatformClient,
    state: &mut SessionState,
    email: &str,
    password: &str,
) -> Result<(), AppError> {
    let resp = client.login(email, password).await?;
    state.authenticated = true;
    state.user_name = resp.user_name;
    tracing::info!("Logged in to backend");
    Ok(())
}

/// Create the first admin account, which also signs the session in.
pub async fn setup_admin(
    client: &PlatformClient,
    state: &mut SessionState,
    email: &str,
    password: &str,
    name: &str,
) -> Result<(), AppError> {
    let resp = client.setup_admin(email, password, name).await?;
    state.setup_required = false;
    state.authenticated = true;
    state.user_name = resp.user_name;
    tracing::info!("Admin account created");
    Ok(())
}
