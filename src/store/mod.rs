//! Storage port for measurements and summaries.
//!
//! The ingestion pipeline writes only through [`StoreTx`], obtained from
//! [`Store::begin`]. A transaction that is dropped without [`StoreTx::commit`]
//! leaves the store untouched, which is what makes aborted requests and
//! early returns safe.
//!
//! Exports to the crate: the traits, the read-side filter types and the
//! Postgres implementation. The in-memory store only exists for tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::StorageFault;
use crate::models::{Measurement, NewSummary, Summary, ValidatedMeasurement};

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

// ---

/// Shared handle used as router state.
pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Start a write transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StorageFault>;

    /// Summaries matching every bound set in `filter`.
    async fn find_summaries(&self, filter: &SummaryFilter) -> Result<Vec<Summary>, StorageFault>;

    /// The most recent (or oldest) measurements of one file.
    async fn last_values(&self, query: &ValuesQuery) -> Result<Vec<Measurement>, StorageFault>;
}

/// One atomic unit of writes.
#[async_trait]
pub trait StoreTx: Send {
    /// Remove every measurement and the summary for `file_name`.
    /// Returns the number of measurement rows removed.
    async fn delete_by_file_name(&mut self, file_name: &str) -> Result<u64, StorageFault>;

    /// Insert rows for `file_name`, returning them as stored.
    async fn insert_rows(
        &mut self,
        file_name: &str,
        rows: &[ValidatedMeasurement],
    ) -> Result<Vec<Measurement>, StorageFault>;

    async fn insert_summary(&mut self, summary: NewSummary) -> Result<Summary, StorageFault>;

    async fn commit(self: Box<Self>) -> Result<(), StorageFault>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageFault>;
}

/// Optional, inclusive bounds over stored summaries.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    // ---
    /// Substring of the file name. Blank values are ignored.
    pub file_name: Option<String>,
    pub min_start_time: Option<DateTime<Utc>>,
    pub max_start_time: Option<DateTime<Utc>>,
    pub min_avg_value: Option<Decimal>,
    pub max_avg_value: Option<Decimal>,
    pub min_avg_execution_time: Option<Decimal>,
    pub max_avg_execution_time: Option<Decimal>,
}

impl SummaryFilter {
    /// The file-name fragment to match, if one was given.
    pub fn file_name_fragment(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Evaluate the filter against one summary.
    #[cfg(test)]
    pub fn matches(&self, s: &Summary) -> bool {
        // ---
        fn within<T: PartialOrd>(v: &T, min: &Option<T>, max: &Option<T>) -> bool {
            min.as_ref().map_or(true, |m| v >= m) && max.as_ref().map_or(true, |m| v <= m)
        }

        self.file_name_fragment()
            .map_or(true, |frag| s.file_name.contains(frag))
            && within(&s.min_start_time, &self.min_start_time, &self.max_start_time)
            && within(&s.avg_value, &self.min_avg_value, &self.max_avg_value)
            && within(
                &s.avg_execution_time,
                &self.min_avg_execution_time,
                &self.max_avg_execution_time,
            )
    }
}

/// Selects the newest (or oldest) measurements of one file.
#[derive(Debug, Clone)]
pub struct ValuesQuery {
    pub file_name: String,
    pub descending: bool,
    pub limit: u32,
}
