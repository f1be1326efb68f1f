//! Read-only inspection routes, mounted only when debug routes are enabled.

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};

use murmur_types::api::{RecentUsersQuery, RecentUsersResponse, UserCountResponse};
use murmur_types::models::User;

use crate::convert;
use crate::error::FeedError;
use crate::extract::ApiQuery;
use crate::state::{AppState, blocking};

const DEFAULT_RECENT_USERS: u32 = 10;
const MAX_RECENT_USERS: u32 = 100;

pub async fn recent_users(state: &AppState, limit: Option<u32>) -> Result<Vec<User>, FeedError> {
    let limit = limit.unwrap_or(DEFAULT_RECENT_USERS).min(MAX_RECENT_USERS);
    let rows = blocking(state, move |db| db.list_recent_users(limit)).await?;
    Ok(rows.into_iter().map(convert::user).collect())
}

pub async fn count_users(state: &AppState) -> Result<u64, FeedError> {
    blocking(state, |db| db.count_users()).await
}

/// GET /debug/users
pub async fn recent(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentUsersQuery>,
) -> Result<impl IntoResponse, FeedError> {
    let users = recent_users(&state, query.limit).await?;
    Ok(Json(RecentUsersResponse { users }))
}

/// GET /debug/users/count
pub async fn count(State(state): State<AppState>) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(UserCountResponse {
        count: count_users(&state).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{provisioned, state};

    #[tokio::test]
    async fn lists_newest_users_with_a_capped_limit() {
        let state = state();
        for name in ["a", "b", "c"] {
            provisioned(&state, name).await;
        }

        let names: Vec<String> = recent_users(&state, Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["c", "b"]);

        assert_eq!(recent_users(&state, Some(10_000)).await.unwrap().len(), 3);
        assert_eq!(count_users(&state).await.unwrap(), 3);
    }
}
