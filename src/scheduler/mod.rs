//! Periodic background tasks
//!
//! - **Expired token sweep**: delete tokens whose `expires_at` has passed
//! - **WAL checkpoint**: keep the SQLite write-ahead log from growing unbounded
//!
//! Each task runs in its own tokio::spawn with an independent interval timer.

pub mod tasks;

use crate::config::Config;
use crate::db::Database;
use std::time::Duration;

/// Result of a single scheduler task execution
#[derive(Debug)]
pub struct TaskResult {
    pub task_name: String,
    pub items_affected: usize,
    pub errors: usize,
    pub detail: String,
}

/// Start a periodic WAL checkpoint task.
///
/// Only file-backed databases have a WAL; in-memory ones are skipped.
fn start_wal_checkpoint_task(db: Database) {
    if db.path().is_none() {
        return;
    }

    tokio::spawn(async move {
        let interval = Duration::from_secs(300); // 5 minutes
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip immediate tick

        loop {
            ticker.tick().await;
            let result = db
                .with_conn(|conn| {
                    conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))
                })
                .await;
            match result {
                Ok(Ok(())) => tracing::debug!("WAL checkpoint completed"),
                Ok(Err(e)) => tracing::warn!("WAL checkpoint failed: {}", e),
                Err(e) => tracing::warn!("WAL checkpoint task failed: {}", e),
            }
        }
    });
}

/// Start the periodic expired token sweep, if enabled
fn start_expired_token_sweep(config: &Config, db: Database) {
    if !config.sweep.enabled {
        tracing::info!(
            "Scheduler: task '{}' is disabled",
            tasks::expired_tokens::TASK_NAME
        );
        return;
    }

    let interval_minutes = u64::from(config.sweep.interval_minutes.max(1));
    tracing::info!(
        "Scheduler: starting task '{}' (every {} minutes)",
        tasks::expired_tokens::TASK_NAME,
        interval_minutes
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));

        // The first tick fires immediately, so stale rows left by a previous
        // run are removed at startup.
        loop {
            ticker.tick().await;
            let result = tasks::expired_tokens::execute(&db).await;

            if result.errors > 0 {
                tracing::warn!(
                    "Scheduler: task '{}' completed with {} errors: {}",
                    result.task_name,
                    result.errors,
                    result.detail
                );
            } else if result.items_affected > 0 {
                tracing::info!(
                    "Scheduler: task '{}' completed: {}",
                    result.task_name,
                    result.detail
                );
            } else {
                tracing::debug!("Scheduler: task '{}' completed (no changes)", result.task_name);
            }
        }
    });
}

/// Start all enabled periodic tasks
pub fn start_scheduler(config: &Config, db: Database) {
    start_wal_checkpoint_task(db.clone());
    start_expired_token_sweep(config, db);
}
