//! Data models for the CSV ingestion pipeline.
//!
//! Rows move through three shapes: [`RawRow`] (straight out of the parser),
//! [`ValidatedMeasurement`] (after validation) and [`Measurement`] (as stored).
//! [`Summary`] is the single aggregate record kept per file name.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

// ---

/// One candidate row as read from the CSV file.
///
/// The numeric columns are kept as text so the validator can apply its own
/// format rules before anything is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    // ---
    pub date: DateTime<Utc>,
    pub execution_time_text: String,
    pub value_text: String,
}

/// A row that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMeasurement {
    // ---
    pub date: DateTime<Utc>,
    pub execution_time: Decimal,
    pub value: Decimal,
}

/// Stored measurement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    // ---
    pub id: i64,
    pub file_name: String,
    pub date: DateTime<Utc>,
    pub execution_time: Decimal,
    pub value: Decimal,
}

/// Aggregates computed for one file, before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    // ---
    pub file_name: String,
    pub time_delta_seconds: i64,
    pub min_start_time: DateTime<Utc>,
    pub avg_execution_time: Decimal,
    pub avg_value: Decimal,
    pub median_value: Decimal,
    pub max_value: Decimal,
    pub min_value: Decimal,
}

/// Stored per-file summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    // ---
    pub id: i64,
    pub file_name: String,
    pub time_delta_seconds: i64,
    pub min_start_time: DateTime<Utc>,
    pub avg_execution_time: Decimal,
    pub avg_value: Decimal,
    pub median_value: Decimal,
    pub max_value: Decimal,
    pub min_value: Decimal,
}

impl Summary {
    pub fn from_new(id: i64, new: NewSummary) -> Self {
        // ---
        Summary {
            id,
            file_name: new.file_name,
            time_delta_seconds: new.time_delta_seconds,
            min_start_time: new.min_start_time,
            avg_execution_time: new.avg_execution_time,
            avg_value: new.avg_value,
            median_value: new.median_value,
            max_value: new.max_value,
            min_value: new.min_value,
        }
    }
}

/// Read access shared by validated and stored rows, so the aggregator can
/// work over either.
pub trait Observation {
    fn date(&self) -> DateTime<Utc>;
    fn execution_time(&self) -> Decimal;
    fn value(&self) -> Decimal;
}

impl Observation for ValidatedMeasurement {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
    fn execution_time(&self) -> Decimal {
        self.execution_time
    }
    fn value(&self) -> Decimal {
        self.value
    }
}

impl Observation for Measurement {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
    fn execution_time(&self) -> Decimal {
        self.execution_time
    }
    fn value(&self) -> Decimal {
        self.value
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summary_serializes_camel_case() {
        // ---
        let new = NewSummary {
            file_name: "a.csv".to_string(),
            time_delta_seconds: 60,
            min_start_time: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            avg_execution_time: Decimal::new(15, 1),
            avg_value: Decimal::new(20, 0),
            median_value: Decimal::new(20, 0),
            max_value: Decimal::new(30, 0),
            min_value: Decimal::new(10, 0),
        };
        let json = serde_json::to_value(Summary::from_new(7, new)).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["fileName"], "a.csv");
        assert_eq!(json["timeDeltaSeconds"], 60);
        assert!(json.get("minStartTime").is_some());
        assert!(json.get("avgExecutionTime").is_some());
        assert!(json.get("medianValue").is_some());
    }

    #[test]
    fn test_observation_view_matches_fields() {
        // ---
        let m = Measurement {
            id: 1,
            file_name: "a.csv".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            execution_time: Decimal::new(125, 2),
            value: Decimal::new(42, 0),
        };
        assert_eq!(Observation::date(&m), m.date);
        assert_eq!(Observation::execution_time(&m), Decimal::new(125, 2));
        assert_eq!(Observation::value(&m), Decimal::new(42, 0));
    }
}
