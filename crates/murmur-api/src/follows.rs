use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use murmur_types::api::ToggleFollowResponse;
use murmur_types::events::FeedEvent;

use crate::error::FeedError;
use crate::extract::ApiPath;
use crate::middleware::Viewer;
use crate::profiles::current_user;
use crate::state::{AppState, blocking};

/// Follow `target_id` if the viewer doesn't yet, unfollow otherwise.
/// Returns whether the viewer now follows the target.
pub async fn toggle_follow(
    state: &AppState,
    viewer: &Viewer,
    target_id: Uuid,
) -> Result<bool, FeedError> {
    let actor = current_user(state, viewer).await?;
    if actor.id == target_id {
        return Err(FeedError::Conflict("cannot follow yourself".into()));
    }

    let follower = actor.id.to_string();
    let following = target_id.to_string();
    let toggled = blocking(state, move |db| db.toggle_follow(&follower, &following))
        .await?
        .ok_or(FeedError::NotFound("user"))?;

    let now_following = toggled.is_on();
    info!(
        "User '{}' {} {}",
        actor.username,
        if now_following { "followed" } else { "unfollowed" },
        target_id
    );

    state.dispatcher.broadcast(FeedEvent::FollowToggled {
        follower_id: actor.id,
        following_id: target_id,
        following: now_following,
    });
    state.dispatcher.invalidate_timelines(&[actor.id, target_id]);

    Ok(now_following)
}

/// POST /users/{user_id}/follow
pub async fn toggle(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    let following = toggle_follow(&state, &viewer, user_id).await?;
    Ok(Json(ToggleFollowResponse { following }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{provisioned, state};

    #[tokio::test]
    async fn follow_then_unfollow() {
        let state = state();
        let (a, viewer) = provisioned(&state, "a").await;
        let (b, _) = provisioned(&state, "b").await;

        assert!(toggle_follow(&state, &viewer, b.id).await.unwrap());
        assert!(state.db.is_following(&a.id.to_string(), &b.id.to_string()).unwrap());

        assert!(!toggle_follow(&state, &viewer, b.id).await.unwrap());
        assert!(!state.db.is_following(&a.id.to_string(), &b.id.to_string()).unwrap());
    }

    #[tokio::test]
    async fn self_follow_always_conflicts() {
        let state = state();
        let (a, viewer) = provisioned(&state, "a").await;

        for _ in 0..3 {
            let err = toggle_follow(&state, &viewer, a.id).await.unwrap_err();
            assert!(matches!(err, FeedError::Conflict(_)));
        }
        assert_eq!(state.db.following_count(&a.id.to_string()).unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let state = state();
        let (_, viewer) = provisioned(&state, "a").await;
        let err = toggle_follow(&state, &viewer, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound("user")));
    }

    #[tokio::test]
    async fn invalidates_both_participants() {
        let state = state();
        let (a, viewer) = provisioned(&state, "a").await;
        let (b, _) = provisioned(&state, "b").await;
        let mut rx = state.dispatcher.subscribe();

        toggle_follow(&state, &viewer, b.id).await.unwrap();

        let mut invalidated = Vec::new();
        while let Ok(event) = rx.try_recv() {
            invalidated.extend(event.invalidated_user());
        }
        assert_eq!(invalidated, vec![a.id, b.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_toggles_never_double_the_edge() {
        let state = state();
        let (a, viewer) = provisioned(&state, "a").await;
        let (b, _) = provisioned(&state, "b").await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                let viewer = viewer.clone();
                tokio::spawn(async move { toggle_follow(&state, &viewer, b.id).await })
            })
            .collect();

        let mut now_following = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                now_following += 1;
            }
        }

        // Every toggle applied exactly once: 16 alternating results
        assert_eq!(now_following, 8);
        let edges = state.db.following_count(&a.id.to_string()).unwrap();
        assert_eq!(edges, 0);
    }
}
