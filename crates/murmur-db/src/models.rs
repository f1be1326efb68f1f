//! Database row types, mapped directly from SQLite rows.
//! Kept separate from the murmur-types models so this crate has no wire concerns.

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub external_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

/// A post joined with its author's public fields and reply count.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub author_id: String,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub reply_count: u64,
}

/// Result of a toggle on an edge table. `None` from a toggle means one of
/// the referenced rows does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Created,
    Removed,
}

impl Toggled {
    pub fn is_on(self) -> bool {
        matches!(self, Self::Created)
    }
}
