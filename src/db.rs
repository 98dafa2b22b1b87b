use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::warn;

use crate::error::ValidationError;
use crate::model::{Attachment, CanonicalTender, TenderType};
use crate::stats::{RunStats, SaveStats};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tenders (
            id            INTEGER PRIMARY KEY,
            tender_id     TEXT NOT NULL,
            source        TEXT NOT NULL,
            tender_type   TEXT NOT NULL CHECK(tender_type IN ('Goods','Works','Services')),
            title         TEXT NOT NULL,
            organization  TEXT NOT NULL,
            publish_date  TEXT NOT NULL,
            closing_date  TEXT,
            description   TEXT NOT NULL,
            source_url    TEXT NOT NULL,
            attachments   TEXT NOT NULL DEFAULT '[]',
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(tender_id, source)
        );
        CREATE INDEX IF NOT EXISTS idx_tenders_publish ON tenders(source, publish_date);

        CREATE TABLE IF NOT EXISTS scraper_runs (
            run_id                  TEXT PRIMARY KEY,
            scraper_version         TEXT NOT NULL,
            config                  TEXT NOT NULL,
            start_time              TEXT NOT NULL,
            end_time                TEXT,
            duration_seconds        REAL,
            status                  TEXT NOT NULL CHECK(status IN ('running','completed','failed')),
            pages_visited           INTEGER NOT NULL DEFAULT 0,
            tenders_parsed          INTEGER NOT NULL DEFAULT 0,
            tenders_saved           INTEGER NOT NULL DEFAULT 0,
            deduped_count           INTEGER NOT NULL DEFAULT 0,
            failures                INTEGER NOT NULL DEFAULT 0,
            error_summary           TEXT NOT NULL DEFAULT '{}',
            classification_defaults INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_runs_start ON scraper_runs(start_time);
        ",
    )?;
    Ok(())
}

// ── Tenders ──

/// Persist a batch in one transaction. Identities already stored for
/// `source` are counted as deduped and left untouched; a row that fails to
/// write is counted and the batch carries on.
pub fn save_tenders_batch(
    conn: &Connection,
    source: &str,
    tenders: &[CanonicalTender],
    mut on_row: impl FnMut(),
) -> Result<SaveStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = SaveStats::default();
    {
        let mut exists = tx.prepare("SELECT 1 FROM tenders WHERE tender_id = ?1 AND source = ?2")?;
        let mut upsert = tx.prepare(
            "INSERT INTO tenders
             (tender_id, source, tender_type, title, organization, publish_date,
              closing_date, description, source_url, attachments)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(tender_id, source) DO UPDATE SET
                tender_type  = excluded.tender_type,
                title        = excluded.title,
                organization = excluded.organization,
                publish_date = excluded.publish_date,
                closing_date = excluded.closing_date,
                description  = excluded.description,
                source_url   = excluded.source_url,
                attachments  = excluded.attachments,
                updated_at   = datetime('now')",
        )?;

        for t in tenders {
            on_row();
            match exists.exists(rusqlite::params![t.tender_id, source]) {
                Ok(true) => {
                    stats.deduped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Error checking tender {}: {}", t.tender_id, e);
                    stats.failed += 1;
                    continue;
                }
            }

            let written = serde_json::to_string(&t.attachments)
                .map_err(anyhow::Error::from)
                .and_then(|attachments| {
                    upsert
                        .execute(rusqlite::params![
                            t.tender_id,
                            source,
                            t.tender_type.as_str(),
                            t.title,
                            t.organization,
                            t.publish_date.to_string(),
                            t.closing_date.map(|d| d.to_string()),
                            t.description,
                            t.source_url,
                            attachments,
                        ])
                        .map_err(anyhow::Error::from)
                });
            match written {
                Ok(_) => stats.saved += 1,
                Err(e) => {
                    warn!("Error saving tender {}: {}", t.tender_id, e);
                    stats.failed += 1;
                }
            }
        }
    }
    tx.commit()?;
    Ok(stats)
}

const TENDER_COLUMNS: &str = "tender_id, tender_type, title, organization, publish_date, \
                              closing_date, description, source_url, attachments";

pub fn fetch_tender(conn: &Connection, source: &str, tender_id: &str) -> Result<Option<CanonicalTender>> {
    let sql = format!(
        "SELECT {} FROM tenders WHERE tender_id = ?1 AND source = ?2",
        TENDER_COLUMNS
    );
    let tender = conn
        .query_row(&sql, rusqlite::params![tender_id, source], tender_from_row)
        .optional()?;
    Ok(tender)
}

/// Most recently published first.
pub fn fetch_recent(conn: &Connection, source: &str, limit: usize) -> Result<Vec<CanonicalTender>> {
    let sql = format!(
        "SELECT {} FROM tenders WHERE source = ?1
         ORDER BY publish_date DESC, tender_id
         LIMIT {}",
        TENDER_COLUMNS, limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([source], tender_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_tenders(conn: &Connection, source: &str) -> Result<usize> {
    let total = conn.query_row(
        "SELECT COUNT(*) FROM tenders WHERE source = ?1",
        [source],
        |r| r.get(0),
    )?;
    Ok(total)
}

fn tender_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalTender> {
    let label: String = row.get(1)?;
    let tender_type = TenderType::from_label(&label)
        .ok_or_else(|| conversion(1, ValidationError::InvalidTenderType(label)))?;
    let publish_date = parse_stored_date(4, row.get(4)?)?;
    let closing_date = row
        .get::<_, Option<String>>(5)?
        .map(|d| parse_stored_date(5, d))
        .transpose()?;
    let attachments: Vec<Attachment> =
        serde_json::from_str(&row.get::<_, String>(8)?).map_err(|e| conversion(8, e))?;

    Ok(CanonicalTender {
        tender_id: row.get(0)?,
        title: row.get(2)?,
        organization: row.get(3)?,
        tender_type,
        publish_date,
        closing_date,
        description: row.get(6)?,
        source_url: row.get(7)?,
        attachments,
    })
}

fn parse_stored_date(idx: usize, value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| conversion(idx, e))
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

// ── Runs ──

pub fn insert_run(
    conn: &Connection,
    run_id: &str,
    version: &str,
    config: &str,
    start_time: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO scraper_runs (run_id, scraper_version, config, start_time, status)
         VALUES (?1, ?2, ?3, ?4, 'running')",
        rusqlite::params![run_id, version, config, start_time],
    )?;
    Ok(())
}

pub fn finish_run(
    conn: &Connection,
    run_id: &str,
    status: &str,
    end_time: &str,
    duration_seconds: f64,
    stats: &RunStats,
) -> Result<()> {
    let error_summary = serde_json::to_string(&stats.failures)?;
    let updated = conn.execute(
        "UPDATE scraper_runs SET
            end_time = ?2, duration_seconds = ?3, status = ?4,
            pages_visited = ?5, tenders_parsed = ?6, tenders_saved = ?7,
            deduped_count = ?8, failures = ?9, error_summary = ?10,
            classification_defaults = ?11
         WHERE run_id = ?1",
        rusqlite::params![
            run_id,
            end_time,
            duration_seconds,
            status,
            stats.pages_visited,
            stats.parsed,
            stats.saved,
            stats.deduped,
            stats.total_failures(),
            error_summary,
            stats.classification_defaults(),
        ],
    )?;
    if updated == 0 {
        anyhow::bail!("run {} not found", run_id);
    }
    Ok(())
}

pub struct RunRow {
    pub run_id: String,
    pub scraper_version: String,
    pub start_time: String,
    pub duration_seconds: Option<f64>,
    pub status: String,
    pub pages_visited: usize,
    pub tenders_parsed: usize,
    pub tenders_saved: usize,
    pub deduped_count: usize,
    pub failures: usize,
    pub error_summary: String,
    pub classification_defaults: usize,
}

pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let sql = format!(
        "SELECT run_id, scraper_version, start_time, duration_seconds, status,
                pages_visited, tenders_parsed, tenders_saved, deduped_count,
                failures, error_summary, classification_defaults
         FROM scraper_runs
         ORDER BY start_time DESC
         LIMIT {}",
        limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RunRow {
                run_id: row.get(0)?,
                scraper_version: row.get(1)?,
                start_time: row.get(2)?,
                duration_seconds: row.get(3)?,
                status: row.get(4)?,
                pages_visited: row.get(5)?,
                tenders_parsed: row.get(6)?,
                tenders_saved: row.get(7)?,
                deduped_count: row.get(8)?,
                failures: row.get(9)?,
                error_summary: row.get(10)?,
                classification_defaults: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
