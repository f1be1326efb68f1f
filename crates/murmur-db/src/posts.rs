use anyhow::Result;

use crate::Database;
use crate::models::PostRow;

impl Database {
    // -- Posts --

    /// Stores a post. Content must already be validated; the author must exist.
    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<PostRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, content, created_at),
            )?;
            Ok(PostRow {
                id: id.to_string(),
                author_id: author_id.to_string(),
                content: content.to_string(),
                created_at: created_at.to_string(),
            })
        })
    }

    #[cfg(test)]
    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        use rusqlite::OptionalExtension;

        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, author_id, content, created_at FROM posts WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(PostRow {
                            id: row.get(0)?,
                            author_id: row.get(1)?,
                            content: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_posts_by_author(&self, author_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                [author_id],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Replies --

    /// Replies are authored elsewhere; this exists for imports and fixtures.
    pub fn insert_reply(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO replies (id, post_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, post_id, author_id, content, crate::now_timestamp()),
            )?;
            Ok(())
        })
    }
}
