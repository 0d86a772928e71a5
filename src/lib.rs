pub mod api;
pub mod db;
pub mod error;
pub mod flow;
pub mod host;
pub mod logging;
pub mod prefs;

use std::path::PathBuf;
use std::sync::Arc;

use db::DbPool;
use error::AppError;

/// Shared application state accessible from the embedding shell.
pub struct AppState {
    pub db: DbPool,
    pub platform: Arc<api::PlatformClient>,
    pub flow: Arc<flow::FlowService>,
    /// Backend session, probed at startup and updated by login/setup.
    pub session: tokio::sync::Mutex<api::SessionState>,
    pub host: Arc<dyn host::DesktopHost>,
}

impl AppState {
    /// Open the database, probe the backend, and resume any interrupted
    /// creation dialogue. Backend failures degrade to offline defaults;
    /// only local storage problems abort startup.
    pub async fn bootstrap(
        app_data_dir: &PathBuf,
        base_url: String,
        host: Arc<dyn host::DesktopHost>,
    ) -> Result<Self, AppError> {
        let pool = db::init_db(app_data_dir)?;
        tracing::info!("Database pool ready (max_size=8)");

        let platform = Arc::new(api::PlatformClient::new(base_url));
        // A pre-issued key skips interactive login (kiosk / CI setups)
        if let Ok(key) = std::env::var("BOTFORGE_API_KEY") {
            platform.set_token(Some(key));
        }
        let session = api::session::bootstrap(&platform).await;
        api::sync::refresh_models(&pool, &platform).await?;

        let flow = Arc::new(flow::FlowService::new(pool.clone(), platform.clone()));
        if flow.restore().await? {
            tracing::info!("Resumed an interrupted bot setup");
        }

        Ok(Self {
            db: pool,
            platform,
            flow,
            session: tokio::sync::Mutex::new(session),
            host,
        })
    }
}
