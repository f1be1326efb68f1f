//! Core of the murmur feed: identity provisioning, posts, follow/like toggles
//! and timeline composition, plus the axum routes that expose them.
//!
//! Every operation is a request-scoped unit of work against the shared
//! [`murmur_db::Database`]; nothing is cached in-process between requests.

pub mod admin;
mod convert;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod follows;
pub mod likes;
pub mod middleware;
pub mod posts;
pub mod profiles;
pub mod provision;
pub mod state;
pub mod system;
pub mod timeline;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub use error::FeedError;
pub use middleware::Viewer;
pub use state::{AppState, AppStateInner};

pub fn router(state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/webhooks/identity", post(provision::identity_webhook))
        .route("/me", get(profiles::me))
        .route("/posts", post(posts::create))
        .route("/posts/{post_id}/like", post(likes::toggle))
        .route("/users/{user_id}/follow", post(follows::toggle))
        .route("/timeline", get(timeline::home))
        .route("/profiles/{username}", get(profiles::profile))
        .route("/profiles/{username}/posts", get(timeline::profile))
        .route("/health", get(system::health))
        .route("/events", get(system::events));

    if state.debug_routes {
        routes = routes
            .route("/debug/users", get(admin::recent))
            .route("/debug/users/count", get(admin::count));
    }

    routes
        .layer(from_fn_with_state(state.clone(), middleware::resolve_viewer))
        .with_state(state)
}
