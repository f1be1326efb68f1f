use std::sync::Arc;

use tracing::error;

use murmur_db::Database;

use crate::dispatcher::Dispatcher;
use crate::error::FeedError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    /// Mounts the `/debug/users` routes when set.
    pub debug_routes: bool,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>, debug_routes: bool) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
            dispatcher: Dispatcher::new(),
            debug_routes,
        })
    }
}

/// Run blocking SQLite work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, FeedError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            FeedError::Internal(e.into())
        })?
        .map_err(FeedError::Internal)
}
