//! Summary statistics for one batch of measurements.

use rust_decimal::Decimal;

use crate::error::IngestError;
use crate::ingest::validator::to_scale;
use crate::models::{NewSummary, Observation};

// ---

/// Compute the summary for `file_name` over a non-empty batch.
///
/// Averages and the even-count median are rounded to the stored scale, so
/// the result is exactly what ends up in the `summaries` table.
pub fn summarize<T: Observation>(file_name: &str, rows: &[T]) -> Result<NewSummary, IngestError> {
    // ---
    let first = rows.first().ok_or(IngestError::EmptyBatch)?;

    let mut min_date = first.date();
    let mut max_date = first.date();
    let mut total_execution_time = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let mut values = Vec::with_capacity(rows.len());

    for row in rows {
        min_date = min_date.min(row.date());
        max_date = max_date.max(row.date());
        total_execution_time += row.execution_time();
        total_value += row.value();
        values.push(row.value());
    }

    values.sort_unstable();
    let count = Decimal::from(rows.len());

    Ok(NewSummary {
        file_name: file_name.to_string(),
        time_delta_seconds: (max_date - min_date).num_seconds(),
        min_start_time: min_date,
        avg_execution_time: to_scale(total_execution_time / count),
        avg_value: to_scale(total_value / count),
        median_value: to_scale(median(&values)),
        max_value: values[values.len() - 1],
        min_value: values[0],
    })
}

/// Median of an ascending, non-empty slice. Even counts take the mean of the
/// two middle elements.
fn median(sorted: &[Decimal]) -> Decimal {
    // ---
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    } else {
        sorted[mid]
    }
}
