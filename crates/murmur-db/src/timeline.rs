use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::TimelineRow;

// JOIN users and count replies in one query (no N+1). Equal timestamps fall
// back to insertion order so the result is stable without caller re-sorting.
const TIMELINE_SELECT: &str = "
    SELECT p.id, p.content, p.created_at, p.author_id,
           u.username, u.display_name, u.avatar_url,
           (SELECT COUNT(*) FROM replies r WHERE r.post_id = p.id)
    FROM posts p
    JOIN users u ON p.author_id = u.id";

const TIMELINE_ORDER: &str = "ORDER BY p.created_at DESC, p.rowid DESC";

impl Database {
    /// Posts by the viewer and everyone the viewer follows, newest first.
    pub fn home_timeline(&self, viewer_id: &str) -> Result<Vec<TimelineRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.author_id = ?1
                    OR p.author_id IN (SELECT following_id FROM follows WHERE follower_id = ?1)
                 {}",
                TIMELINE_SELECT, TIMELINE_ORDER
            );
            query_timeline(conn, &sql, viewer_id)
        })
    }

    /// Posts by a single author, newest first.
    pub fn profile_timeline(&self, author_id: &str) -> Result<Vec<TimelineRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.author_id = ?1 {}", TIMELINE_SELECT, TIMELINE_ORDER);
            query_timeline(conn, &sql, author_id)
        })
    }
}

fn query_timeline(conn: &Connection, sql: &str, key: &str) -> Result<Vec<TimelineRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([key], |row| {
            Ok(TimelineRow {
                id: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
                author_id: row.get(3)?,
                author_username: row.get(4)?,
                author_display_name: row.get(5)?,
                author_avatar_url: row.get(6)?,
                reply_count: row.get::<_, i64>(7)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{db, user};

    fn ids(rows: &[crate::models::TimelineRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn home_includes_self_and_followed_only() {
        let db = db();
        let v = user(&db, "viewer");
        let f = user(&db, "followed");
        let s = user(&db, "stranger");
        db.toggle_follow(&v.id, &f.id).unwrap();

        db.insert_post("p1", &v.id, "mine", "2026-01-01T00:00:01.000000Z").unwrap();
        db.insert_post("p2", &f.id, "theirs", "2026-01-01T00:00:03.000000Z").unwrap();
        db.insert_post("p3", &s.id, "hidden", "2026-01-01T00:00:04.000000Z").unwrap();
        db.insert_post("p4", &v.id, "mine again", "2026-01-01T00:00:02.000000Z").unwrap();

        let rows = db.home_timeline(&v.id).unwrap();
        assert_eq!(ids(&rows), vec!["p2", "p4", "p1"]);
        assert_eq!(rows[0].author_username, "followed");
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let db = db();
        let v = user(&db, "viewer");
        let ts = "2026-01-01T00:00:00.000000Z";
        db.insert_post("b", &v.id, "one", ts).unwrap();
        db.insert_post("a", &v.id, "two", ts).unwrap();
        db.insert_post("c", &v.id, "three", ts).unwrap();

        let first = db.profile_timeline(&v.id).unwrap();
        assert_eq!(ids(&first), vec!["c", "a", "b"]);
        assert_eq!(first, db.profile_timeline(&v.id).unwrap());
    }

    #[test]
    fn reply_counts_are_joined() {
        let db = db();
        let v = user(&db, "viewer");
        let o = user(&db, "other");
        db.insert_post("p1", &v.id, "hello", "2026-01-01T00:00:00.000000Z").unwrap();
        db.insert_reply("r1", "p1", &o.id, "hi").unwrap();
        db.insert_reply("r2", "p1", &v.id, "hey").unwrap();

        let rows = db.profile_timeline(&v.id).unwrap();
        assert_eq!(rows[0].reply_count, 2);
        assert!(db.profile_timeline(&o.id).unwrap().is_empty());
    }
}
