//! User rows

use super::{format_ts, parse_ts};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, login, password_hash, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        login: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_ts(3, &created_at)?,
    })
}

/// Look up a user by exact login
pub fn find_user_by_login(conn: &Connection, login: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE login = ?"),
        [login],
        row_to_user,
    )
    .optional()
}

/// Insert a user and return its id.
///
/// A login that already exists fails with the UNIQUE constraint; see
/// [`is_unique_violation`].
pub fn insert_user(
    conn: &Connection,
    login: &str,
    password_hash: &str,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (login, password_hash, created_at) VALUES (?, ?, ?)",
        params![login, password_hash, format_ts(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// True when `err` is a UNIQUE constraint failure
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
