use anyhow::{Result, anyhow};
use rand::Rng;
use rand::distr::Alphanumeric;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::models::UserRow;
use crate::{Database, now_timestamp};

/// How many names (`base`, `base_1`, ... `base_49`) are probed before falling
/// back to a random suffix.
pub const MAX_USERNAME_PROBES: u32 = 50;

const RANDOM_SUFFIX_LEN: usize = 5;

const RANDOM_SUFFIX_ATTEMPTS: u32 = 5;

const USER_COLUMNS: &str = "id, external_id, username, display_name, avatar_url, created_at";

impl Database {
    /// Create-or-update the user keyed by `external_id`.
    ///
    /// The username is resolved from `base_username` inside the same
    /// transaction as the upsert, so two identities racing for one name can't
    /// both win. `display_name` receives the resolved username for fallback.
    /// `id` is only used when the row is new.
    pub fn provision_user<F>(
        &self,
        id: &str,
        external_id: &str,
        base_username: &str,
        avatar_url: Option<&str>,
        display_name: F,
    ) -> Result<UserRow>
    where
        F: FnOnce(&str) -> String,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let username = resolve_unique_username(&tx, base_username, external_id)?;
            let display_name = display_name(&username);
            let now = now_timestamp();

            tx.execute(
                "INSERT INTO users (id, external_id, username, display_name, avatar_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(external_id) DO UPDATE SET
                    username = excluded.username,
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    updated_at = excluded.updated_at",
                rusqlite::params![id, external_id, username, display_name, avatar_url, now],
            )?;

            let row = query_user(&tx, "external_id", external_id)?
                .ok_or_else(|| anyhow!("User vanished after upsert: {}", external_id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    #[cfg(test)]
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "external_id", external_id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }

    /// Most recently created users first.
    pub fn list_recent_users(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Picks the first free name among `base`, `base_1`, `base_2`, ... A name
/// already held by `external_id` itself counts as free, which keeps repeat
/// provisioning stable. Past the probes, a random suffix the identity already
/// holds is kept; otherwise fresh suffixes are tried until one is free.
pub fn resolve_unique_username(conn: &Connection, base: &str, external_id: &str) -> Result<String> {
    for attempt in 0..MAX_USERNAME_PROBES {
        let candidate = if attempt == 0 {
            base.to_string()
        } else {
            format!("{}_{}", base, attempt)
        };

        if username_available(conn, &candidate, external_id)? {
            if attempt > 0 {
                debug!("Username '{}' taken, resolved to '{}'", base, candidate);
            }
            return Ok(candidate);
        }
    }

    // A previous delivery may already have landed on a random suffix
    let current: Option<String> = conn
        .query_row(
            "SELECT username FROM users WHERE external_id = ?1",
            [external_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(current) = current.filter(|name| has_random_suffix(name, base)) {
        return Ok(current);
    }

    for _ in 0..RANDOM_SUFFIX_ATTEMPTS {
        let candidate = format!("{}_{}", base, random_suffix());
        if username_available(conn, &candidate, external_id)? {
            warn!(
                "Username '{}' exhausted {} probes, falling back to '{}'",
                base, MAX_USERNAME_PROBES, candidate
            );
            return Ok(candidate);
        }
    }

    Err(anyhow!(
        "No free username for '{}' after {} probes and {} random suffixes",
        base,
        MAX_USERNAME_PROBES,
        RANDOM_SUFFIX_ATTEMPTS
    ))
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// True for `base_` followed by exactly one random suffix.
fn has_random_suffix(username: &str, base: &str) -> bool {
    username
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| {
            suffix.len() == RANDOM_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

fn username_available(conn: &Connection, username: &str, external_id: &str) -> Result<bool> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT external_id FROM users WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?;

    Ok(holder.is_none_or(|h| h == external_id))
}

fn query_user(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        username: row.get(2)?,
        display_name: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}
