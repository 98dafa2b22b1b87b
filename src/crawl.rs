use tracing::{debug, error, info, warn};

use crate::error::{FailureKind, ParseError};
use crate::fetcher::Fetch;
use crate::model::{TenderDetail, TenderStub};
use crate::parser::TenderParser;
use crate::stats::RunStats;

#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    pub max_pages: usize,
    /// Stop once this many records are merged.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A listing page had no usable stubs.
    Exhausted,
    NoNextPage,
    PageCap,
    LimitReached,
    /// A listing page could not be fetched.
    ListingFetchFailed { page: usize },
}

impl StopReason {
    pub fn is_failure(self) -> bool {
        matches!(self, StopReason::ListingFetchFailed { .. })
    }
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<TenderDetail>,
    pub stop: StopReason,
}

/// Listing URL for a 1-based page number.
pub fn listing_url(page: usize) -> String {
    if page > 1 {
        format!("/?page={}", page)
    } else {
        "/".to_string()
    }
}

/// Walk listing pages, fetch each stub's detail page and merge the two.
/// Pages are processed strictly one after another.
pub async fn crawl<F: Fetch>(
    fetcher: &F,
    parser: &TenderParser,
    limits: CrawlLimits,
    stats: &mut RunStats,
) -> CrawlOutcome {
    let mut records = Vec::new();
    let mut page = 1;

    let stop = loop {
        info!("Fetching page {}", page);
        let html = match fetcher.fetch(&listing_url(page)).await {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to fetch page {}: {}", page, e);
                stats.record_failure(FailureKind::Fetch);
                break StopReason::ListingFetchFailed { page };
            }
        };
        stats.increment_pages(1);

        let stubs = collect_stubs(parser, &html, stats);
        if stubs.is_empty() {
            info!("No tenders found on page {}, stopping", page);
            break StopReason::Exhausted;
        }
        info!("Found {} tenders on page {}", stubs.len(), page);

        let mut limit_hit = false;
        for stub in stubs {
            match fetch_detail(fetcher, parser, stub, stats).await {
                Ok(detail) => records.push(detail),
                Err(kind) => {
                    stats.record_failure(kind);
                    continue;
                }
            }
            if limits.limit.is_some_and(|limit| records.len() >= limit) {
                limit_hit = true;
                break;
            }
        }
        if limit_hit {
            info!("Reached limit of {} tenders", records.len());
            break StopReason::LimitReached;
        }

        let pagination = parser.pagination(&html);
        debug!(
            "Page {} of {}, next: {:?}",
            pagination.current_page, pagination.total_pages, pagination.next_url
        );
        if !pagination.has_next {
            info!("No more pages available");
            break StopReason::NoNextPage;
        }
        if page >= limits.max_pages {
            info!("Reached page cap of {}", limits.max_pages);
            break StopReason::PageCap;
        }
        page += 1;
    };

    CrawlOutcome { records, stop }
}

fn collect_stubs(parser: &TenderParser, html: &str, stats: &mut RunStats) -> Vec<TenderStub> {
    parser
        .parse_listing_page(html)
        .into_iter()
        .filter_map(|item| match item {
            Ok(stub) => Some(stub),
            Err(e) => {
                warn!("Skipping listing card: {}", e);
                stats.record_failure(FailureKind::ListingParse);
                None
            }
        })
        .collect()
}

async fn fetch_detail<F: Fetch>(
    fetcher: &F,
    parser: &TenderParser,
    stub: TenderStub,
    stats: &mut RunStats,
) -> Result<TenderDetail, FailureKind> {
    debug!("Fetching tender {}", stub.tender_id);

    let html = fetcher.fetch(&stub.source_url).await.map_err(|e| {
        warn!("Failed to fetch tender {}: {}", stub.tender_id, e);
        FailureKind::DetailFetch
    })?;
    stats.increment_pages(1);

    let mut detail = parser
        .parse_detail_page(&html, &stub.tender_id)
        .map_err(|e: ParseError| {
            warn!("Failed to parse tender {}: {}", stub.tender_id, e);
            FailureKind::Parse
        })?;

    detail.merge_stub(stub);
    stats.increment_parsed(1);
    Ok(detail)
}
