use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FailureKind;

pub const CLASSIFICATION_DEFAULT: &str = "classification_default";

/// Counters for one run. Only ever incremented.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub pages_visited: usize,
    pub parsed: usize,
    pub saved: usize,
    pub deduped: usize,
    /// Rows the persistence layer could not write.
    pub save_failed: usize,
    pub failures: BTreeMap<String, usize>,
    pub warnings: BTreeMap<String, usize>,
}

/// Outcome of one `save_batch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub saved: usize,
    pub failed: usize,
    pub deduped: usize,
}

impl RunStats {
    pub fn increment_pages(&mut self, n: usize) {
        self.pages_visited += n;
    }

    pub fn increment_parsed(&mut self, n: usize) {
        self.parsed += n;
    }

    pub fn increment_deduped(&mut self, n: usize) {
        self.deduped += n;
    }

    pub fn record_error(&mut self, category: &str) {
        *self.failures.entry(category.to_string()).or_default() += 1;
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        self.record_error(kind.as_str());
    }

    pub fn record_warning(&mut self, category: &str) {
        *self.warnings.entry(category.to_string()).or_default() += 1;
    }

    pub fn update_stats(&mut self, save: SaveStats) {
        self.saved += save.saved;
        self.deduped += save.deduped;
        self.save_failed += save.failed;
    }

    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures.get(kind.as_str()).copied().unwrap_or(0)
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().sum::<usize>() + self.save_failed
    }

    pub fn classification_defaults(&self) -> usize {
        self.warnings.get(CLASSIFICATION_DEFAULT).copied().unwrap_or(0)
    }

    pub fn print(&self) {
        println!("Pages visited:   {}", self.pages_visited);
        println!("Tenders parsed:  {}", self.parsed);
        println!("Tenders saved:   {}", self.saved);
        println!("Duplicates:      {}", self.deduped);
        println!("Failures:        {}", self.total_failures());
        for (category, count) in &self.failures {
            println!("  {:<22} {}", category, count);
        }
        if self.save_failed > 0 {
            println!("  {:<22} {}", "save_failed", self.save_failed);
        }
        let defaulted = self.classification_defaults();
        if defaulted > 0 {
            println!("Tender types defaulted to Services: {}", defaulted);
        }
    }
}
