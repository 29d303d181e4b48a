//! CSV ingestion pipeline.
//!
//! `ingest` runs parse → validate → size check → replace → aggregate →
//! commit for one uploaded file. The first three stages are pure and run
//! before the store is touched; the rest happen inside one store
//! transaction, so a failure at any point leaves the file's previous rows
//! and summary exactly as they were.
//!
//! Module layout (EMBP): `parser`, `validator` and `aggregator` are internal
//! stages; only [`Ingestor`] is exported to the rest of the crate.

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::IngestError;
use crate::models::{RawRow, Summary, ValidatedMeasurement};
use crate::store::{SharedStore, StoreTx};

mod aggregator;
mod parser;
mod validator;

// ---

/// Where an ingestion call currently is. Used for logging rollbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parsing,
    Validating,
    Replacing,
    Aggregating,
    Committing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Replacing => "replacing",
            Stage::Aggregating => "aggregating",
            Stage::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Runs the ingestion pipeline against a store.
pub struct Ingestor {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    max_rows: usize,
}

impl Ingestor {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, max_rows: usize) -> Self {
        Ingestor {
            store,
            clock,
            max_rows,
        }
    }

    /// Replace everything stored for `file_name` with the contents of `reader`.
    ///
    /// Returns the new summary. On error nothing is changed in the store.
    #[tracing::instrument(
        name = "ingest",
        skip_all,
        fields(file_name = %file_name, ingest_id = %Uuid::new_v4())
    )]
    pub async fn ingest<R: io::Read>(
        &self,
        reader: R,
        file_name: &str,
    ) -> Result<Summary, IngestError> {
        // ---
        let rows = self.prepare(reader)?;
        let summary = self.replace(file_name, &rows).await?;

        info!(
            rows = rows.len(),
            median = %summary.median_value,
            "Ingested {}",
            file_name
        );
        Ok(summary)
    }

    /// Parse, validate and bound-check the batch. Touches no storage.
    fn prepare<R: io::Read>(&self, reader: R) -> Result<Vec<ValidatedMeasurement>, IngestError> {
        // ---
        debug!(stage = %Stage::Parsing);
        // One row past the cap is enough to know the batch is too large.
        let raw = parser::parse(reader)?
            .take(self.max_rows.saturating_add(1))
            .collect::<Result<Vec<RawRow>, _>>()?;

        debug!(stage = %Stage::Validating, rows = raw.len());
        let validated = validator::validate(raw, self.clock.now())?;

        if validated.is_empty() || validated.len() > self.max_rows {
            return Err(IngestError::BatchSize { max: self.max_rows });
        }
        Ok(validated)
    }

    /// Delete-then-insert inside one transaction, rolling back on any error.
    async fn replace(
        &self,
        file_name: &str,
        rows: &[ValidatedMeasurement],
    ) -> Result<Summary, IngestError> {
        // ---
        let mut tx = self.store.begin().await?;
        let mut stage = Stage::Replacing;

        let result = write_batch(tx.as_mut(), file_name, rows, &mut stage).await;
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Rolling back {} during {}: {}", file_name, stage, e);
                if let Err(rollback_err) = tx.rollback().await {
                    // The transaction is discarded either way; keep the original error.
                    warn!("Rollback of {} failed: {}", file_name, rollback_err);
                }
                return Err(e);
            }
        };

        debug!(stage = %Stage::Committing);
        tx.commit().await?;
        Ok(summary)
    }
}

async fn write_batch(
    tx: &mut dyn StoreTx,
    file_name: &str,
    rows: &[ValidatedMeasurement],
    stage: &mut Stage,
) -> Result<Summary, IngestError> {
    // ---
    debug!(stage = %Stage::Replacing);
    let deleted = tx.delete_by_file_name(file_name).await?;
    let stored = tx.insert_rows(file_name, rows).await?;
    debug!(deleted, inserted = stored.len(), "Replaced rows");

    *stage = Stage::Aggregating;
    debug!(stage = %Stage::Aggregating);
    let summary = aggregator::summarize(file_name, &stored)?;
    Ok(tx.insert_summary(summary).await?)
}
