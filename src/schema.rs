//! Database schema management for `codemetal-csvflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Statements run in order inside one transaction. Every statement is
/// idempotent.
const SCHEMA: &[&str] = &[
    // One row per line of an uploaded file
    r#"
    CREATE TABLE IF NOT EXISTS measurements (
        id             BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        file_name      VARCHAR(255)   NOT NULL,
        date           TIMESTAMPTZ    NOT NULL,
        execution_time NUMERIC(18, 6) NOT NULL CHECK (execution_time >= 0),
        value          NUMERIC(18, 6) NOT NULL CHECK (value >= 0)
    );
    "#,
    // Exactly one summary per file name
    r#"
    CREATE TABLE IF NOT EXISTS summaries (
        id                 BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
        file_name          VARCHAR(255)   NOT NULL,
        time_delta_seconds BIGINT         NOT NULL CHECK (time_delta_seconds >= 0),
        min_start_time     TIMESTAMPTZ    NOT NULL,
        avg_execution_time NUMERIC(18, 6) NOT NULL,
        avg_value          NUMERIC(18, 6) NOT NULL,
        median_value       NUMERIC(18, 6) NOT NULL,
        max_value          NUMERIC(18, 6) NOT NULL,
        min_value          NUMERIC(18, 6) NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_measurements_file_name ON measurements (file_name);",
    "CREATE INDEX IF NOT EXISTS idx_measurements_file_name_date ON measurements (file_name, date);",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_summaries_file_name ON summaries (file_name);",
    "CREATE INDEX IF NOT EXISTS idx_summaries_min_start_time ON summaries (min_start_time);",
    "CREATE INDEX IF NOT EXISTS idx_summaries_avg_value ON summaries (avg_value);",
    "CREATE INDEX IF NOT EXISTS idx_summaries_avg_execution_time ON summaries (avg_execution_time);",
];

/// Create or update the database schema (idempotent).
///
/// Creates the `measurements` table for raw rows and the `summaries` table
/// for per-file aggregates. Safe to call on every startup; no-op if objects
/// already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for statement in SCHEMA {
        sqlx::query(*statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!("Database schema ready ({} statements)", SCHEMA.len());
    Ok(())
}
