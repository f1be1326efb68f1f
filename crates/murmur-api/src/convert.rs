//! Row -> wire conversions. Corrupt ids or timestamps are logged and replaced
//! with defaults rather than failing a whole timeline.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use murmur_db::models::{PostRow, TimelineRow, UserRow};
use murmur_types::models::{Author, Post, User};

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user id"),
        external_id: row.external_id,
        username: row.username,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn author(user: &User) -> Author {
    Author {
        id: user.id,
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        avatar_url: user.avatar_url.clone(),
    }
}

pub(crate) fn timeline_author(row: &TimelineRow) -> Author {
    Author {
        id: parse_uuid(&row.author_id, "author id"),
        username: row.author_username.clone(),
        display_name: row.author_display_name.clone(),
        avatar_url: row.author_avatar_url.clone(),
    }
}

pub(crate) fn post(row: PostRow) -> Post {
    Post {
        id: parse_uuid(&row.id, "post id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        content: row.content,
        created_at: parse_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        assert_eq!(parse_uuid("not-a-uuid", "post id"), Uuid::nil());
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }

    #[test]
    fn stored_timestamps_parse() {
        let ts = parse_timestamp("2026-03-04T05:06:07.123456Z");
        assert_eq!(ts.timestamp_subsec_micros(), 123456);
    }
}
