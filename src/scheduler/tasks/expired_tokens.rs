//! Periodic expired token sweep
//!
//! Expired tokens already fail authentication and are hidden from listings;
//! this task removes the rows themselves.

use crate::db::tokens;
use crate::db::Database;
use crate::scheduler::TaskResult;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const TASK_NAME: &str = "expired_tokens";

pub async fn execute(db: &Database) -> TaskResult {
    execute_at(db, Utc::now()).await
}

/// Sweep as of `now`
pub async fn execute_at(db: &Database, now: DateTime<Utc>) -> TaskResult {
    let sweep = db.with_conn(move |conn| tokens::purge_expired_tokens(conn, now));

    // Timeout after 30 seconds
    match tokio::time::timeout(Duration::from_secs(30), sweep).await {
        Ok(Ok(Ok(removed))) => TaskResult {
            task_name: TASK_NAME.to_string(),
            items_affected: removed,
            errors: 0,
            detail: format!("{} expired tokens removed", removed),
        },
        Ok(Ok(Err(e))) => failed(format!("Failed to purge expired tokens: {}", e)),
        Ok(Err(e)) => failed(format!("Sweep task failed: {}", e)),
        Err(_) => failed("Sweep timed out after 30 seconds".to_string()),
    }
}

fn failed(detail: String) -> TaskResult {
    TaskResult {
        task_name: TASK_NAME.to_string(),
        items_affected: 0,
        errors: 1,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tokens::{insert_token, NewToken};
    use crate::db::users::insert_user;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        {
            let conn = db.conn();
            let user_id = insert_user(&conn, "alice", "hash", now).unwrap();
            for (hash, expires_at) in [
                ("gone", Some(now - ChronoDuration::minutes(5))),
                ("kept", Some(now + ChronoDuration::minutes(5))),
                ("never", None),
            ] {
                insert_token(
                    &conn,
                    &NewToken {
                        token_hash: hash,
                        user_id,
                        device: "phone",
                        created_at: now - ChronoDuration::hours(1),
                        expires_at,
                    },
                )
                .unwrap();
            }
        }

        let result = execute_at(&db, now).await;
        assert_eq!(result.errors, 0);
        assert_eq!(result.items_affected, 1);

        let again = execute_at(&db, now).await;
        assert_eq!(again.items_affected, 0);

        let remaining: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 2);
    }
}
