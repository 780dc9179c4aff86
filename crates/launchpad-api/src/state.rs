use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::error;

use launchpad_db::Database;

use crate::error::ApiError;
use crate::identity::IdentityVerifier;
use crate::tokens::TokenKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenKeys,
    /// `None` when identity-provider login is not configured.
    pub identity: Option<Box<dyn IdentityVerifier>>,
    pub settings: Settings,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
    /// Per-file ceiling for project logo/cover uploads.
    pub max_asset_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cookie_secure: false,
            max_asset_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Current time at the microsecond precision timestamps are stored with, so
/// values echoed in responses match what later reads return.
pub fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Run blocking DB/hashing work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
