use std::fmt;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::stats::RunStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persists one `scraper_runs` row per run. Database errors here are logged
/// and never fail the run.
pub struct RunTracker<'a> {
    conn: &'a Connection,
    run_id: String,
    version: &'static str,
    started: Instant,
}

impl<'a> RunTracker<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            run_id: Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION"),
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn start(&self, config: &impl Serialize) {
        let result = serde_json::to_string(config)
            .map_err(anyhow::Error::from)
            .and_then(|config| {
                db::insert_run(self.conn, &self.run_id, self.version, &config, &now())
            });
        match result {
            Ok(()) => info!("Started run {}", self.run_id),
            Err(e) => warn!("Could not record start of run {}: {:#}", self.run_id, e),
        }
    }

    pub fn complete(&self, status: RunStatus, stats: &RunStats) {
        let duration = self.started.elapsed().as_secs_f64();
        if let Err(e) = db::finish_run(self.conn, &self.run_id, status.as_str(), &now(), duration, stats) {
            warn!("Could not record end of run {}: {:#}", self.run_id, e);
            return;
        }
        info!(
            "Run {} {}: {} saved, {} deduped, {} failures in {:.1}s",
            self.run_id,
            status,
            stats.saved,
            stats.deduped,
            stats.total_failures(),
            duration
        );
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::memory_db;

    #[test]
    fn records_start_and_completion() {
        let conn = memory_db();
        let tracker = RunTracker::new(&conn);
        tracker.start(&serde_json::json!({ "max_pages": 2 }));

        let mut stats = RunStats::default();
        stats.increment_pages(3);
        tracker.complete(RunStatus::Failed, &stats);

        let runs = db::fetch_runs(&conn, 5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, tracker.run_id());
        assert_eq!(runs[0].status, "failed");
        assert_eq!(runs[0].pages_visited, 3);
        assert_eq!(runs[0].scraper_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn storage_errors_are_swallowed() {
        let conn = Connection::open_in_memory().unwrap();
        let tracker = RunTracker::new(&conn);
        tracker.start(&serde_json::json!({}));
        tracker.complete(RunStatus::Completed, &RunStats::default());
    }

    #[test]
    fn run_ids_are_unique() {
        let conn = memory_db();
        assert_ne!(RunTracker::new(&conn).run_id(), RunTracker::new(&conn).run_id());
    }
}
