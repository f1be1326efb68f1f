use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Author, User};

// -- JWT Claims --

/// Claims carried by the identity provider's session token. `sub` is the
/// external identity key, not the local user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub text: String,
}

/// One timeline entry: the post, its author's public fields, and the
/// aggregates derived from the edge tables at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePost {
    pub id: Uuid,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author: Author,
    pub liked_by: Vec<Uuid>,
    pub like_count: u64,
    pub liked_by_viewer: bool,
    pub reply_count: u64,
}

// -- Interactions --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFollowResponse {
    pub following: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub like_count: u64,
}

// -- Profiles --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: Author,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub viewer_follows: bool,
    pub is_viewer: bool,
}

// -- Admin --

#[derive(Debug, Deserialize)]
pub struct RecentUsersQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentUsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCountResponse {
    pub count: u64,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
