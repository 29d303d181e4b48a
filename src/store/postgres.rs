//! PostgreSQL implementation of the storage port.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::error::StorageFault;
use crate::models::{Measurement, NewSummary, Summary, ValidatedMeasurement};
use crate::store::{Store, StoreTx, SummaryFilter, ValuesQuery};

// ---

/// Rows per INSERT statement; 4 binds per row keeps us well under the
/// 65535 bind-parameter limit.
const INSERT_CHUNK: usize = 5_000;

const MEASUREMENT_COLUMNS: &str = "id, file_name, date, execution_time, value";

const SUMMARY_COLUMNS: &str = "id, file_name, time_delta_seconds, min_start_time, \
     avg_execution_time, avg_value, median_value, max_value, min_value";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

/// Open write transaction. Dropping it without commit rolls back.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StorageFault> {
        // ---
        let tx = self.pool.begin().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageFault::Unavailable(e.to_string())
            }
            other => StorageFault::Database(other),
        })?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn find_summaries(&self, filter: &SummaryFilter) -> Result<Vec<Summary>, StorageFault> {
        // ---
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SUMMARY_COLUMNS} FROM summaries WHERE TRUE"
        ));

        if let Some(fragment) = filter.file_name_fragment() {
            // strpos avoids treating `%` and `_` in the fragment as wildcards
            qb.push(" AND strpos(file_name, ")
                .push_bind(fragment.to_string())
                .push(") > 0");
        }
        if let Some(t) = filter.min_start_time {
            qb.push(" AND min_start_time >= ").push_bind(t);
        }
        if let Some(t) = filter.max_start_time {
            qb.push(" AND min_start_time <= ").push_bind(t);
        }
        if let Some(v) = filter.min_avg_value {
            qb.push(" AND avg_value >= ").push_bind(v);
        }
        if let Some(v) = filter.max_avg_value {
            qb.push(" AND avg_value <= ").push_bind(v);
        }
        if let Some(v) = filter.min_avg_execution_time {
            qb.push(" AND avg_execution_time >= ").push_bind(v);
        }
        if let Some(v) = filter.max_avg_execution_time {
            qb.push(" AND avg_execution_time <= ").push_bind(v);
        }
        qb.push(" ORDER BY id");

        let summaries = qb.build_query_as::<Summary>().fetch_all(&self.pool).await?;
        Ok(summaries)
    }

    async fn last_values(&self, query: &ValuesQuery) -> Result<Vec<Measurement>, StorageFault> {
        // ---
        let order = if query.descending { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements \
             WHERE file_name = $1 ORDER BY date {order}, id {order} LIMIT $2"
        );

        let rows = sqlx::query_as::<_, Measurement>(&sql)
            .bind(&query.file_name)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn delete_by_file_name(&mut self, file_name: &str) -> Result<u64, StorageFault> {
        // ---
        // Serialises concurrent ingests of the same file until this
        // transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(file_name)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM summaries WHERE file_name = $1")
            .bind(file_name)
            .execute(&mut *self.tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM measurements WHERE file_name = $1")
            .bind(file_name)
            .execute(&mut *self.tx)
            .await?;

        Ok(deleted.rows_affected())
    }

    async fn insert_rows(
        &mut self,
        file_name: &str,
        rows: &[ValidatedMeasurement],
    ) -> Result<Vec<Measurement>, StorageFault> {
        // ---
        let mut stored = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO measurements (file_name, date, execution_time, value) ",
            );
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(file_name)
                    .push_bind(row.date)
                    .push_bind(row.execution_time)
                    .push_bind(row.value);
            });
            qb.push(" RETURNING ").push(MEASUREMENT_COLUMNS);

            let inserted = qb
                .build_query_as::<Measurement>()
                .fetch_all(&mut *self.tx)
                .await?;
            stored.extend(inserted);
        }

        Ok(stored)
    }

    async fn insert_summary(&mut self, summary: NewSummary) -> Result<Summary, StorageFault> {
        // ---
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO summaries (
                file_name, time_delta_seconds, min_start_time,
                avg_execution_time, avg_value, median_value, max_value, min_value
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&summary.file_name)
        .bind(summary.time_delta_seconds)
        .bind(summary.min_start_time)
        .bind(summary.avg_execution_time)
        .bind(summary.avg_value)
        .bind(summary.median_value)
        .bind(summary.max_value)
        .bind(summary.min_value)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Summary::from_new(id, summary))
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageFault> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageFault> {
        self.tx.rollback().await?;
        Ok(())
    }
}
