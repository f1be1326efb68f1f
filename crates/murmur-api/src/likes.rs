use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use murmur_types::api::ToggleLikeResponse;
use murmur_types::events::FeedEvent;

use crate::error::FeedError;
use crate::extract::ApiPath;
use crate::middleware::Viewer;
use crate::profiles::current_user;
use crate::state::{AppState, blocking};

/// Like the post if the viewer hasn't yet, unlike it otherwise. Liking your
/// own post is allowed. The count is recounted from the like edges, not kept
/// as a counter.
pub async fn toggle_like(
    state: &AppState,
    viewer: &Viewer,
    post_id: Uuid,
) -> Result<ToggleLikeResponse, FeedError> {
    let actor = current_user(state, viewer).await?;

    let user = actor.id.to_string();
    let post = post_id.to_string();
    let (toggled, like_count) = blocking(state, move |db| db.toggle_like(&user, &post))
        .await?
        .ok_or(FeedError::NotFound("post"))?;

    let liked = toggled.is_on();
    info!(
        "User '{}' {} post {} ({} likes)",
        actor.username,
        if liked { "liked" } else { "unliked" },
        post_id,
        like_count
    );

    state.dispatcher.broadcast(FeedEvent::LikeToggled {
        post_id,
        user_id: actor.id,
        liked,
        like_count,
    });

    Ok(ToggleLikeResponse { liked, like_count })
}

/// POST /posts/{post_id}/like
pub async fn toggle(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(toggle_like(&state, &viewer, post_id).await?))
}
