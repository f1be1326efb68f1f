use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events published after a successful mutation. Subscribers use them to
/// revalidate whatever views they hold; the store stays the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// Any cached timeline or profile view for this user is stale
    TimelineInvalidated { user_id: Uuid },

    /// A user row was created or refreshed from an identity event
    UserProvisioned { user_id: Uuid, username: String },

    /// A new post was stored
    PostCreated { post_id: Uuid, author_id: Uuid },

    /// A follow edge was created (`following = true`) or removed
    FollowToggled {
        follower_id: Uuid,
        following_id: Uuid,
        following: bool,
    },

    /// A like edge was created (`liked = true`) or removed
    LikeToggled {
        post_id: Uuid,
        user_id: Uuid,
        liked: bool,
        like_count: u64,
    },
}

impl FeedEvent {
    /// Returns the user whose views this event invalidates, if it targets one.
    pub fn invalidated_user(&self) -> Option<Uuid> {
        match self {
            Self::TimelineInvalidated { user_id } => Some(*user_id),
            _ => None,
        }
    }
}
