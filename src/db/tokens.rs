//! Session token rows
//!
//! Tokens are addressed either by their row id (what clients see in device
//! listings) or by the SHA-256 digest of the bearer string.

use super::{format_ts, parse_ts};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Stored session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: i64,
    pub token_hash: String,
    pub user_id: i64,
    pub device: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// A token is expired from its `expires_at` instant onward
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Fields of a token about to be inserted
#[derive(Debug, Clone)]
pub struct NewToken<'a> {
    pub token_hash: &'a str,
    pub user_id: i64,
    pub device: &'a str,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

const TOKEN_COLUMNS: &str = "id, token_hash, user_id, device, created_at, expires_at";

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<Token> {
    let created_at: String = row.get(4)?;
    let expires_at: Option<String> = row.get(5)?;
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        user_id: row.get(2)?,
        device: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
        expires_at: expires_at.as_deref().map(|s| parse_ts(5, s)).transpose()?,
    })
}

/// Insert a token and return its row id
pub fn insert_token(conn: &Connection, token: &NewToken<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tokens (token_hash, user_id, device, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
            token.token_hash,
            token.user_id,
            token.device,
            format_ts(token.created_at),
            token.expires_at.map(format_ts),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_token_by_hash(conn: &Connection, token_hash: &str) -> rusqlite::Result<Option<Token>> {
    conn.query_row(
        &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_hash = ?"),
        [token_hash],
        row_to_token,
    )
    .optional()
}

pub fn find_token_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Token>> {
    conn.query_row(
        &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?"),
        [id],
        row_to_token,
    )
    .optional()
}

/// All unexpired tokens of a user, newest first
pub fn list_tokens_for_user(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> rusqlite::Result<Vec<Token>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOKEN_COLUMNS} FROM tokens
         WHERE user_id = ? AND (expires_at IS NULL OR expires_at > ?)
         ORDER BY created_at DESC, id DESC"
    ))?;

    let tokens = stmt
        .query_map(params![user_id, format_ts(now)], row_to_token)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tokens)
}

/// Delete a token by id, returning the number of rows removed
pub fn delete_token(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM tokens WHERE id = ?", [id])
}

/// Delete every token whose expiry is at or before `now`
pub fn purge_expired_tokens(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM tokens WHERE expires_at IS NOT NULL AND expires_at <= ?",
        [format_ts(now)],
    )
}
