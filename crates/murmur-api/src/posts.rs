use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use murmur_db::now_timestamp;
use murmur_types::MAX_POST_CHARS;
use murmur_types::api::CreatePostRequest;
use murmur_types::events::FeedEvent;
use murmur_types::models::Post;

use crate::convert;
use crate::error::FeedError;
use crate::extract::ApiJson;
use crate::middleware::Viewer;
use crate::profiles::current_user;
use crate::state::{AppState, blocking};

/// Trim and bounds-check post text, returning the text that will be stored.
pub fn validate_post_text(raw: &str) -> Result<&str, FeedError> {
    let text = raw.trim();
    let len = text.chars().count();

    if len == 0 {
        return Err(FeedError::Validation("post text must not be empty".into()));
    }
    if len > MAX_POST_CHARS {
        return Err(FeedError::Validation(format!(
            "post text must be at most {} characters",
            MAX_POST_CHARS
        )));
    }
    Ok(text)
}

/// Store a new post by the current viewer.
pub async fn create_post(state: &AppState, viewer: &Viewer, raw: &str) -> Result<Post, FeedError> {
    let author = current_user(state, viewer).await?;
    let content = validate_post_text(raw)?.to_string();

    let id = Uuid::new_v4().to_string();
    let author_id = author.id.to_string();
    let row = blocking(state, move |db| {
        db.insert_post(&id, &author_id, &content, &now_timestamp())
    })
    .await?;

    let post = convert::post(row);
    info!("User '{}' created post {}", author.username, post.id);

    state.dispatcher.broadcast(FeedEvent::PostCreated {
        post_id: post.id,
        author_id: post.author_id,
    });
    state.dispatcher.invalidate_timelines(&[post.author_id]);

    Ok(post)
}

/// POST /posts
pub async fn create(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, FeedError> {
    let post = create_post(&state, &viewer, &req.text).await?;
    Ok((StatusCode::CREATED, Json(post)))
}
