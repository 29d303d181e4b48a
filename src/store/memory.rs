//! In-memory store for tests.
//!
//! Each transaction works on a private copy of the tables that replaces the
//! shared copy on commit. Only one writer at a time is supported, which is
//! all the tests need. A fail point can be armed to make one operation
//! return a [`StorageFault`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageFault;
use crate::models::{Measurement, NewSummary, Summary, ValidatedMeasurement};
use crate::store::{Store, StoreTx, SummaryFilter, ValuesQuery};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    Delete,
    InsertRows,
    InsertSummary,
    Commit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    next_id: i64,
    pub measurements: Vec<Measurement>,
    pub summaries: Vec<Summary>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Counters {
    commits: usize,
    rollbacks: usize,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
    counters: Arc<Mutex<Counters>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `point` fail.
    pub fn fail_at(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap() = Some(point);
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    pub fn measurements(&self, file_name: &str) -> Vec<Measurement> {
        self.snapshot()
            .measurements
            .into_iter()
            .filter(|m| m.file_name == file_name)
            .collect()
    }

    pub fn summaries(&self, file_name: &str) -> Vec<Summary> {
        self.snapshot()
            .summaries
            .into_iter()
            .filter(|s| s.file_name == file_name)
            .collect()
    }

    pub fn commits(&self) -> usize {
        self.counters.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.counters.lock().unwrap().rollbacks
    }

    /// Seed committed summaries directly, bypassing ingestion.
    pub fn seed_summaries(&self, summaries: Vec<Summary>) {
        self.tables.lock().unwrap().summaries.extend(summaries);
    }

    fn trip(&self, point: FailPoint) -> Result<(), StorageFault> {
        let mut armed = self.fail_point.lock().unwrap();
        if *armed == Some(point) {
            *armed = None;
            return Err(StorageFault::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

struct MemoryTx {
    store: MemoryStore,
    working: Tables,
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StorageFault> {
        // ---
        self.trip(FailPoint::Begin)?;
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            working: self.snapshot(),
        }))
    }

    async fn find_summaries(&self, filter: &SummaryFilter) -> Result<Vec<Summary>, StorageFault> {
        Ok(self
            .snapshot()
            .summaries
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect())
    }

    async fn last_values(&self, query: &ValuesQuery) -> Result<Vec<Measurement>, StorageFault> {
        // ---
        let mut rows = self.measurements(&query.file_name);
        rows.sort_by_key(|m| (m.date, m.id));
        if query.descending {
            rows.reverse();
        }
        rows.truncate(query.limit as usize);
        Ok(rows)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn delete_by_file_name(&mut self, file_name: &str) -> Result<u64, StorageFault> {
        // ---
        self.store.trip(FailPoint::Delete)?;
        let before = self.working.measurements.len();
        self.working.measurements.retain(|m| m.file_name != file_name);
        self.working.summaries.retain(|s| s.file_name != file_name);
        Ok((before - self.working.measurements.len()) as u64)
    }

    async fn insert_rows(
        &mut self,
        file_name: &str,
        rows: &[ValidatedMeasurement],
    ) -> Result<Vec<Measurement>, StorageFault> {
        // ---
        self.store.trip(FailPoint::InsertRows)?;
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let m = Measurement {
                id: self.working.next_id(),
                file_name: file_name.to_string(),
                date: row.date,
                execution_time: row.execution_time,
                value: row.value,
            };
            self.working.measurements.push(m.clone());
            stored.push(m);
        }
        Ok(stored)
    }

    async fn insert_summary(&mut self, summary: NewSummary) -> Result<Summary, StorageFault> {
        // ---
        self.store.trip(FailPoint::InsertSummary)?;
        if self
            .working
            .summaries
            .iter()
            .any(|s| s.file_name == summary.file_name)
        {
            return Err(StorageFault::Unavailable(format!(
                "duplicate summary for {}",
                summary.file_name
            )));
        }
        let stored = Summary::from_new(self.working.next_id(), summary);
        self.working.summaries.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageFault> {
        // ---
        self.store.trip(FailPoint::Commit)?;
        let MemoryTx { store, working } = *self;
        *store.tables.lock().unwrap() = working;
        store.counters.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageFault> {
        self.store.counters.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
