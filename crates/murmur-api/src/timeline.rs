use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use murmur_db::models::{LikeRow, TimelineRow};
use murmur_types::api::TimelinePost;

use crate::convert;
use crate::error::FeedError;
use crate::extract::ApiPath;
use crate::middleware::Viewer;
use crate::profiles::optional_current_user;
use crate::state::{AppState, blocking};

/// Posts by the viewer and everyone the viewer follows, newest first.
/// Anonymous or not-yet-provisioned viewers get an empty timeline.
pub async fn home_timeline(
    state: &AppState,
    viewer: &Viewer,
) -> Result<Vec<TimelinePost>, FeedError> {
    let Some(me) = optional_current_user(state, viewer).await? else {
        return Ok(vec![]);
    };

    let viewer_id = me.id.to_string();
    let (rows, likes) = blocking(state, move |db| {
        let rows = db.home_timeline(&viewer_id)?;
        let likes = db.get_likes_for_posts(&post_ids(&rows))?;
        Ok((rows, likes))
    })
    .await?;

    debug!("Home timeline for '{}': {} posts", me.username, rows.len());
    Ok(compose(rows, likes, Some(me.id)))
}

/// Posts by `username`, newest first. An unknown username yields an empty
/// timeline rather than an error.
pub async fn profile_timeline(
    state: &AppState,
    viewer: &Viewer,
    username: &str,
) -> Result<Vec<TimelinePost>, FeedError> {
    let me = optional_current_user(state, viewer).await?;

    let username = username.to_string();
    let found = blocking(state, move |db| {
        let Some(author) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        let rows = db.profile_timeline(&author.id)?;
        let likes = db.get_likes_for_posts(&post_ids(&rows))?;
        Ok(Some((rows, likes)))
    })
    .await?;

    let Some((rows, likes)) = found else {
        return Ok(vec![]);
    };
    Ok(compose(rows, likes, me.map(|u| u.id)))
}

fn post_ids(rows: &[TimelineRow]) -> Vec<String> {
    rows.iter().map(|r| r.id.clone()).collect()
}

/// Attach likers and counts to each row. Row order is kept as the store
/// returned it.
fn compose(rows: Vec<TimelineRow>, likes: Vec<LikeRow>, viewer_id: Option<Uuid>) -> Vec<TimelinePost> {
    let mut likers: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in &likes {
        likers
            .entry(like.post_id.clone())
            .or_default()
            .push(convert::parse_uuid(&like.user_id, "liker id"));
    }

    rows.into_iter()
        .map(|row| {
            let liked_by = likers.remove(&row.id).unwrap_or_default();
            let liked_by_viewer = viewer_id.is_some_and(|v| liked_by.contains(&v));

            TimelinePost {
                id: convert::parse_uuid(&row.id, "post id"),
                author: convert::timeline_author(&row),
                created_at: convert::parse_timestamp(&row.created_at),
                like_count: liked_by.len() as u64,
                liked_by,
                liked_by_viewer,
                reply_count: row.reply_count,
                content: row.content,
            }
        })
        .collect()
}

/// GET /timeline
pub async fn home(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(home_timeline(&state, &viewer).await?))
}

/// GET /profiles/{username}/posts
pub async fn profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, FeedError> {
    Ok(Json(profile_timeline(&state, &viewer, &username).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follows::toggle_follow;
    use crate::likes::toggle_like;
    use crate::posts::create_post;
    use crate::test_support::{provisioned, state};

    fn contents(posts: &[TimelinePost]) -> Vec<&str> {
        posts.iter().map(|p| p.content.as_str()).collect()
    }

    #[tokio::test]
    async fn home_is_self_plus_followed_newest_first() {
        let state = state();
        let (_, me) = provisioned(&state, "me").await;
        let (friend, friend_v) = provisioned(&state, "friend").await;
        let (_, stranger_v) = provisioned(&state, "stranger").await;

        toggle_follow(&state, &me, friend.id).await.unwrap();
        create_post(&state, &me, "one").await.unwrap();
        create_post(&state, &friend_v, "two").await.unwrap();
        create_post(&state, &stranger_v, "hidden").await.unwrap();
        create_post(&state, &me, "three").await.unwrap();

        let timeline = home_timeline(&state, &me).await.unwrap();
        assert_eq!(contents(&timeline), vec!["three", "two", "one"]);
        assert!(timeline.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(timeline[1].author.username, "friend");
    }

    #[tokio::test]
    async fn unfollowing_removes_posts_from_home() {
        let state = state();
        let (_, me) = provisioned(&state, "me").await;
        let (friend, friend_v) = provisioned(&state, "friend").await;
        create_post(&state, &friend_v, "hello").await.unwrap();

        toggle_follow(&state, &me, friend.id).await.unwrap();
        assert_eq!(home_timeline(&state, &me).await.unwrap().len(), 1);

        toggle_follow(&state, &me, friend.id).await.unwrap();
        assert!(home_timeline(&state, &me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_home_is_empty() {
        let state = state();
        let (_, author) = provisioned(&state, "author").await;
        create_post(&state, &author, "hi").await.unwrap();

        assert!(home_timeline(&state, &Viewer::anonymous()).await.unwrap().is_empty());
        assert!(home_timeline(&state, &Viewer::external("unknown")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_shows_one_author_and_tolerates_unknown_names() {
        let state = state();
        let (_, alex) = provisioned(&state, "alex").await;
        let (_, sam) = provisioned(&state, "sam").await;
        create_post(&state, &alex, "a1").await.unwrap();
        create_post(&state, &sam, "s1").await.unwrap();
        create_post(&state, &alex, "a2").await.unwrap();

        let profile = profile_timeline(&state, &Viewer::anonymous(), "alex").await.unwrap();
        assert_eq!(contents(&profile), vec!["a2", "a1"]);

        let missing = profile_timeline(&state, &sam, "nonexistent").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn entries_carry_likers_and_reply_counts() {
        let state = state();
        let (author, author_v) = provisioned(&state, "author").await;
        let (fan, fan_v) = provisioned(&state, "fan").await;
        let post = create_post(&state, &author_v, "hello").await.unwrap();

        toggle_like(&state, &fan_v, post.id).await.unwrap();
        state
            .db
            .insert_reply("r1", &post.id.to_string(), &fan.id.to_string(), "nice")
            .unwrap();

        let as_author = home_timeline(&state, &author_v).await.unwrap();
        assert_eq!(as_author[0].liked_by, vec![fan.id]);
        assert_eq!(as_author[0].like_count, 1);
        assert!(!as_author[0].liked_by_viewer);
        assert_eq!(as_author[0].reply_count, 1);
        assert_eq!(as_author[0].author.id, author.id);

        let as_fan = profile_timeline(&state, &fan_v, "author").await.unwrap();
        assert!(as_fan[0].liked_by_viewer);
    }
}
