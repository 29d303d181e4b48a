//! Row validation.
//!
//! The whole batch is checked before anything is stored. Every violation is
//! collected so the caller sees all bad rows at once, and a single violation
//! rejects the batch.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Field, RowViolation, ValidationErrors};
use crate::models::{RawRow, ValidatedMeasurement};

// ---

/// Fractional digits kept for stored numbers, matching `NUMERIC(18,6)`.
pub const SCALE: u32 = 6;

/// Integer digits that fit in `NUMERIC(18,6)`.
const MAX_INTEGER_DIGITS: u32 = 12;

/// Unsigned decimal: digits with an optional fractional part.
static UNSIGNED_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("static regex"));

/// Round to the stored scale the same way Postgres does for `NUMERIC`.
pub fn to_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate every row against `now`.
///
/// Returns all rows converted, in input order, or every violation found.
pub fn validate<I>(rows: I, now: DateTime<Utc>) -> Result<Vec<ValidatedMeasurement>, ValidationErrors>
where
    I: IntoIterator<Item = RawRow>,
{
    // ---
    let mut accepted = Vec::new();
    let mut violations = Vec::new();

    for (row_index, row) in rows.into_iter().enumerate() {
        let mut violate = |field: Field, reason: String| {
            violations.push(RowViolation {
                row_index,
                field,
                reason,
            })
        };

        let date_ok = row.date < now;
        if !date_ok {
            violate(
                Field::Date,
                format!(
                    "must be in the past ({})",
                    row.date.to_rfc3339_opts(SecondsFormat::Millis, true)
                ),
            );
        }

        let execution_time = check_decimal(&row.execution_time_text)
            .map_err(|reason| violate(Field::ExecutionTime, reason))
            .ok();
        let value = check_decimal(&row.value_text)
            .map_err(|reason| violate(Field::Value, reason))
            .ok();

        if let (true, Some(execution_time), Some(value)) = (date_ok, execution_time, value) {
            accepted.push(ValidatedMeasurement {
                date: row.date,
                execution_time,
                value,
            });
        }
    }

    if violations.is_empty() {
        Ok(accepted)
    } else {
        Err(ValidationErrors(violations))
    }
}

/// Check one numeric column, returning the normalised number or the reason
/// it was rejected.
fn check_decimal(text: &str) -> Result<Decimal, String> {
    // ---
    if text.is_empty() {
        return Err("is required".to_string());
    }
    if text
        .strip_prefix('-')
        .is_some_and(|magnitude| UNSIGNED_DECIMAL.is_match(magnitude))
    {
        return Err(format!("must be non-negative ({text})"));
    }
    if !UNSIGNED_DECIMAL.is_match(text) {
        return Err(format!("must be a valid number ({text})"));
    }

    let parsed = Decimal::from_str(text).map_err(|_| format!("must be a valid number ({text})"))?;

    let scaled = to_scale(parsed);
    if scaled >= Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS)) {
        return Err(format!(
            "exceeds {MAX_INTEGER_DIGITS} integer digits ({text})"
        ));
    }
    Ok(scaled)
}
