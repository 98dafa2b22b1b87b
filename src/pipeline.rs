use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::clean::{clean_tender, Cleaned};
use crate::crawl::{crawl, CrawlLimits, StopReason};
use crate::db;
use crate::dedup::deduplicate;
use crate::error::FailureKind;
use crate::fetcher::Fetch;
use crate::model::{CanonicalTender, TenderDetail};
use crate::parser::TenderParser;
use crate::stats::{RunStats, SaveStats, CLASSIFICATION_DEFAULT};
use crate::tracker::RunStatus;

/// crawl -> clean -> dedup -> save for one source.
pub struct TenderScraper<'a, F> {
    pub fetcher: F,
    pub parser: TenderParser,
    pub conn: &'a Connection,
    pub source: String,
    pub limits: CrawlLimits,
}

impl<F: Fetch> TenderScraper<'_, F> {
    /// Counters land in `stats` as they happen, so a caller that drops this
    /// future midway still holds everything counted so far.
    pub async fn run(&self, stats: &mut RunStats) -> Result<RunStatus> {
        let outcome = crawl(&self.fetcher, &self.parser, self.limits, stats).await;
        if let StopReason::ListingFetchFailed { page } = outcome.stop {
            error!(
                "Crawl aborted on page {}; keeping {} records collected so far",
                page,
                outcome.records.len()
            );
        }
        let status = if outcome.stop.is_failure() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        if outcome.records.is_empty() {
            warn!("No tenders collected");
            return Ok(status);
        }

        let cleaned = clean_all(&outcome.records, stats);
        let before = cleaned.len();
        let unique = deduplicate(cleaned);
        stats.increment_deduped(before - unique.len());

        if unique.is_empty() {
            warn!("No valid tenders after cleaning");
            return Ok(status);
        }

        info!("Saving {} tenders", unique.len());
        let save = self.save(&unique)?;
        stats.update_stats(save);
        info!(
            "Saved {} tenders ({} already stored, {} failed)",
            save.saved, save.deduped, save.failed
        );
        Ok(status)
    }

    fn save(&self, tenders: &[CanonicalTender]) -> Result<SaveStats> {
        let pb = ProgressBar::new(tenders.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
                .progress_chars("#>-"),
        );
        let save = db::save_tenders_batch(self.conn, &self.source, tenders, || pb.inc(1));
        pb.finish_and_clear();
        save
    }
}

/// Normalize and validate in parallel, then tally serially in input order.
fn clean_all(records: &[TenderDetail], stats: &mut RunStats) -> Vec<CanonicalTender> {
    let results: Vec<Cleaned> = records.par_iter().map(clean_tender).collect();

    let mut valid = Vec::with_capacity(results.len());
    for (record, cleaned) in records.iter().zip(results) {
        if let Some(raw) = &cleaned.defaulted_type {
            warn!(
                "Unrecognized tender type {:?} for {}, defaulting to Services",
                raw, record.tender_id
            );
            stats.record_warning(CLASSIFICATION_DEFAULT);
        }
        match cleaned.tender {
            Ok(tender) => valid.push(tender),
            Err(e) => {
                warn!("Dropping tender {}: {}", record.tender_id, e);
                stats.record_failure(FailureKind::Validation);
            }
        }
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::tests::{card, detail, listing, FakeSite, BASE};
    use crate::db::tests::{memory_db, tender};
    use crate::model::TenderType;

    fn scraper(site: FakeSite, conn: &Connection) -> TenderScraper<'_, FakeSite> {
        TenderScraper {
            fetcher: site,
            parser: TenderParser::new(BASE).unwrap(),
            conn,
            source: "nprocure".into(),
            limits: CrawlLimits {
                max_pages: 10,
                limit: None,
            },
        }
    }

    #[tokio::test]
    async fn full_run_counts_every_outcome() {
        let conn = memory_db();
        db::save_tenders_batch(&conn, "nprocure", &[tender("4", "2024-01-01")], || {}).unwrap();

        let undescribed = r#"<h1 class="tender-title">Two</h1><div class="tender-type">Works</div>"#;
        let site = FakeSite::default()
            .page(
                "/",
                listing(
                    &[card("1", "One"), card("2", "Two"), card("3", "Three"), card("1", "One")],
                    Some(2),
                ),
            )
            .page("/?page=2", listing(&[card("4", "Four")], None))
            .page(&format!("{BASE}/tender/1"), detail("One", "Goods"))
            .page(&format!("{BASE}/tender/2"), undescribed)
            .page(&format!("{BASE}/tender/3"), detail("Three", "Miscellaneous"))
            .page(&format!("{BASE}/tender/4"), detail("Four", "Works"));

        let mut stats = RunStats::default();
        let status = scraper(site, &conn).run(&mut stats).await.unwrap();

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(stats.pages_visited, 7);
        assert_eq!(stats.parsed, 5);
        assert_eq!(stats.failure_count(FailureKind::Validation), 1);
        assert_eq!(stats.classification_defaults(), 1);
        assert_eq!(stats.saved, 2);
        // one in-run repeat, one already stored
        assert_eq!(stats.deduped, 2);
        assert_eq!(db::count_tenders(&conn, "nprocure").unwrap(), 3);

        let three = db::fetch_tender(&conn, "nprocure", "3").unwrap().unwrap();
        assert_eq!(three.tender_type, TenderType::Services);
        assert_eq!(three.organization, "Listing Org");
        assert_eq!(three.source_url, format!("{BASE}/tender/3"));
    }

    #[tokio::test]
    async fn listing_failure_still_saves_collected_records() {
        let conn = memory_db();
        let site = FakeSite::default()
            .page("/", listing(&[card("1", "One")], Some(2)))
            .page(&format!("{BASE}/tender/1"), detail("One", "Goods"));

        let mut stats = RunStats::default();
        let status = scraper(site, &conn).run(&mut stats).await.unwrap();

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(stats.failure_count(FailureKind::Fetch), 1);
        assert_eq!(stats.saved, 1);
        assert!(db::fetch_tender(&conn, "nprocure", "1").unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_site_completes_without_writes() {
        let conn = memory_db();
        let site = FakeSite::default().page("/", listing(&[], None));

        let mut stats = RunStats::default();
        let status = scraper(site, &conn).run(&mut stats).await.unwrap();

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(stats.pages_visited, 1);
        assert_eq!(stats.total_failures(), 0);
        assert_eq!(db::count_tenders(&conn, "nprocure").unwrap(), 0);
    }

    #[test]
    fn cleaning_keeps_input_order() {
        let records: Vec<TenderDetail> = (1..=20)
            .map(|i| TenderDetail {
                tender_id: i.to_string(),
                title: Some(format!("Tender {i}")),
                organization: Some("Org".into()),
                tender_type: Some("Supply".into()),
                publish_date: Some("2024-02-01".into()),
                description: Some("Body".into()),
                source_url: format!("{BASE}/tender/{i}"),
                ..Default::default()
            })
            .collect();
        let mut stats = RunStats::default();
        let ids: Vec<_> = clean_all(&records, &mut stats)
            .into_iter()
            .map(|t| t.tender_id)
            .collect();
        let expected: Vec<_> = (1..=20).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(stats, RunStats::default());
    }

    #[test]
    fn blank_organization_is_dropped_and_counted() {
        let record = |id: &str, organization: &str| TenderDetail {
            tender_id: id.into(),
            title: Some(format!("Tender {id}")),
            organization: Some(organization.into()),
            tender_type: Some("Works".into()),
            publish_date: Some("2024-02-01".into()),
            description: Some("Body".into()),
            source_url: format!("{BASE}/tender/{id}"),
            ..Default::default()
        };
        let records = vec![record("1", "  "), record("2", "Roads Department")];

        let mut stats = RunStats::default();
        let cleaned = clean_all(&records, &mut stats);

        assert_eq!(stats.failure_count(FailureKind::Validation), 1);
        assert_eq!(stats.total_failures(), 1);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].tender_id, "2");
    }
}
