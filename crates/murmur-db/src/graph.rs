use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::models::{LikeRow, Toggled};
use crate::{Database, now_timestamp, placeholders};

impl Database {
    // -- Follows --

    /// Toggle the `follower -> following` edge: removes it if present, creates
    /// it if not. Returns `None` when either user does not exist.
    ///
    /// Delete-then-insert runs in one transaction on the single writer, and the
    /// composite primary key backs it up, so duplicate concurrent toggles can
    /// never leave two edges.
    pub fn toggle_follow(&self, follower_id: &str, following_id: &str) -> Result<Option<Toggled>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !user_exists(&tx, follower_id)? || !user_exists(&tx, following_id)? {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                (follower_id, following_id),
            )?;

            let outcome = if removed > 0 {
                Toggled::Removed
            } else {
                tx.execute(
                    "INSERT INTO follows (follower_id, following_id, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(follower_id, following_id) DO NOTHING",
                    (follower_id, following_id, now_timestamp()),
                )?;
                Toggled::Created
            };

            tx.commit()?;
            Ok(Some(outcome))
        })
    }

    pub fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    (follower_id, following_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn follower_count(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM follows WHERE following_id = ?1", user_id))
    }

    pub fn following_count(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM follows WHERE follower_id = ?1", user_id))
    }

    // -- Likes --

    /// Toggle the `user -> post` like edge. Returns the outcome and the like
    /// count recounted inside the same transaction, or `None` when the post
    /// does not exist.
    pub fn toggle_like(&self, user_id: &str, post_id: &str) -> Result<Option<(Toggled, u64)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let post_exists: Option<i64> = tx
                .query_row("SELECT 1 FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
                .optional()?;
            if post_exists.is_none() {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;

            let outcome = if removed > 0 {
                Toggled::Removed
            } else {
                tx.execute(
                    "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(user_id, post_id) DO NOTHING",
                    (user_id, post_id, now_timestamp()),
                )?;
                Toggled::Created
            };

            let likes = count(&tx, "SELECT COUNT(*) FROM likes WHERE post_id = ?1", post_id)?;
            tx.commit()?;
            Ok(Some((outcome, likes)))
        })
    }

    #[cfg(test)]
    pub fn like_count(&self, post_id: &str) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM likes WHERE post_id = ?1", post_id))
    }

    /// Batch-fetch like edges for a set of post IDs, oldest like first.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id, user_id FROM likes WHERE post_id IN ({}) ORDER BY created_at, rowid",
                placeholders(post_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(post_ids.iter()), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn count(conn: &Connection, sql: &str, key: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [key], |r| r.get(0))?;
    Ok(n as u64)
}
