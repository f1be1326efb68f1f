use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::debug;

use murmur_types::api::ProfileResponse;
use murmur_types::models::User;

use crate::convert;
use crate::error::FeedError;
use crate::extract::ApiPath;
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};

/// Map the viewer onto its local user row.
///
/// `Unauthenticated` when there is no viewer, `NotFound` when the identity
/// has not been provisioned yet.
pub async fn current_user(state: &AppState, viewer: &Viewer) -> Result<User, FeedError> {
    let external_id = viewer
        .external_id()
        .ok_or(FeedError::Unauthenticated)?
        .to_string();

    let row = blocking(state, move |db| db.get_user_by_external_id(&external_id))
        .await?
        .ok_or(FeedError::NotFound("user"))?;

    Ok(convert::user(row))
}

/// Like [`current_user`] but treats both failure cases as "no viewer".
pub(crate) async fn optional_current_user(
    state: &AppState,
    viewer: &Viewer,
) -> Result<Option<User>, FeedError> {
    match current_user(state, viewer).await {
        Ok(user) => Ok(Some(user)),
        Err(FeedError::Unauthenticated | FeedError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Public profile with follow counts and the viewer's relationship to it.
pub async fn get_profile(
    state: &AppState,
    viewer: &Viewer,
    username: &str,
) -> Result<ProfileResponse, FeedError> {
    let me = optional_current_user(state, viewer).await?;
    let me_id = me.map(|u| u.id.to_string());
    let username = username.to_string();

    let (row, post_count, follower_count, following_count, viewer_follows) =
        blocking(state, move |db| {
            let Some(row) = db.get_user_by_username(&username)? else {
                return Ok(None);
            };
            let post_count = db.count_posts_by_author(&row.id)?;
            let follower_count = db.follower_count(&row.id)?;
            let following_count = db.following_count(&row.id)?;
            let viewer_follows = match me_id.as_deref() {
                Some(me) if me != row.id => db.is_following(me, &row.id)?,
                _ => false,
            };
            Ok(Some((row, post_count, follower_count, following_count, viewer_follows)))
        })
        .await?
        .ok_or(FeedError::NotFound("user"))?;

    let is_viewer = viewer.external_id() == Some(row.external_id.as_str());
    let user = convert::user(row);
    debug!("Loaded profile '{}'", user.username);

    Ok(ProfileResponse {
        user: convert::author(&user),
        created_at: user.created_at,
        post_count,
        follower_count,
        following_count,
        viewer_follows,
        is_viewer,
    })
}

/// GET /me
pub async fn me(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(current_user(&state, &viewer).await?))
}

/// GET /profiles/{username}
pub async fn profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(get_profile(&state, &viewer, &username).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follows::toggle_follow;
    use crate::test_support::{provisioned, state};

    #[tokio::test]
    async fn current_user_distinguishes_anonymous_from_unprovisioned() {
        let state = state();
        assert!(matches!(
            current_user(&state, &Viewer::anonymous()).await,
            Err(FeedError::Unauthenticated)
        ));
        assert!(matches!(
            current_user(&state, &Viewer::external("never-seen")).await,
            Err(FeedError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn profile_reports_counts_and_relationship() {
        let state = state();
        let (alex, alex_viewer) = provisioned(&state, "alex").await;
        let (_sam, sam_viewer) = provisioned(&state, "sam").await;

        toggle_follow(&state, &sam_viewer, alex.id).await.unwrap();

        let seen_by_sam = get_profile(&state, &sam_viewer, "alex").await.unwrap();
        assert_eq!(seen_by_sam.follower_count, 1);
        assert_eq!(seen_by_sam.following_count, 0);
        assert!(seen_by_sam.viewer_follows);
        assert!(!seen_by_sam.is_viewer);

        let seen_by_self = get_profile(&state, &alex_viewer, "alex").await.unwrap();
        assert!(seen_by_self.is_viewer);
        assert!(!seen_by_self.viewer_follows);

        let anonymous = get_profile(&state, &Viewer::anonymous(), "alex").await.unwrap();
        assert!(!anonymous.viewer_follows);
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let state = state();
        assert!(matches!(
            get_profile(&state, &Viewer::anonymous(), "ghost").await,
            Err(FeedError::NotFound("user"))
        ));
    }
}
