//! `GET /api/values/values` – last measurements of one file.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use super::error_response;
use crate::store::ValuesQuery;
use crate::{Config, SharedStore};

// ---

const DEFAULT_COUNT: u32 = 10;
const MAX_COUNT: u32 = 1000;

pub fn router() -> Router<(SharedStore, Config)> {
    // ---
    Router::new().route("/api/values/values", get(handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesParams {
    file_name: String,
    #[serde(default = "default_count")]
    count: u32,
    #[serde(default = "default_descending")]
    sort_descending: bool,
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_descending() -> bool {
    true
}

async fn handler(
    Query(params): Query<ValuesParams>,
    State((store, _config)): State<(SharedStore, Config)>,
) -> Response {
    // ---
    info!("GET /api/values/values - {:?}", params);

    if params.file_name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "fileName is required");
    }
    if !(1..=MAX_COUNT).contains(&params.count) {
        return error_response(StatusCode::BAD_REQUEST, "count must be between 1 and 1000");
    }

    let query = ValuesQuery {
        file_name: params.file_name,
        descending: params.sort_descending,
        limit: params.count,
    };

    match store.last_values(&query).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Error retrieving values for file {}: {}", query.file_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::clock::FixedClock;
    use crate::ingest::Ingestor;
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const BODY: &str = "Date;ExecutionTime;Value\n\
        2024-01-01T10:00:00.000Z;1;10\n\
        2024-01-01T10:00:02.000Z;1;30\n\
        2024-01-01T10:00:01.000Z;1;20\n";

    async fn seeded_store() -> SharedStore {
        // ---
        let store: SharedStore = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        Ingestor::new(store.clone(), clock, 100)
            .ingest(BODY.as_bytes(), "a.csv")
            .await
            .unwrap();
        store
    }

    fn config() -> Config {
        Config {
            db_url: "postgres://unused".to_string(),
            db_pool_max: 1,
            http_port: 0,
            max_rows: 100,
            upload_max_bytes: 1024,
        }
    }

    fn params(file_name: &str, count: u32, sort_descending: bool) -> ValuesParams {
        ValuesParams {
            file_name: file_name.to_string(),
            count,
            sort_descending,
        }
    }

    async fn values(p: ValuesParams) -> (StatusCode, serde_json::Value) {
        // ---
        let response = handler(Query(p), State((seeded_store().await, config()))).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn value_strings(json: &serde_json::Value) -> Vec<String> {
        json.as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_newest_first_by_default() {
        // ---
        let (status, json) = values(params("a.csv", DEFAULT_COUNT, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value_strings(&json), vec!["30", "20", "10"]);
    }

    #[tokio::test]
    async fn test_ascending_with_limit() {
        // ---
        let (status, json) = values(params("a.csv", 2, false)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value_strings(&json), vec!["10", "20"]);
        assert_eq!(json[0]["fileName"], "a.csv");
    }

    #[tokio::test]
    async fn test_unknown_file_is_empty() {
        // ---
        let (status, json) = values(params("missing.csv", 10, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_count() {
        // ---
        for count in [0, MAX_COUNT + 1] {
            let (status, json) = values(params("a.csv", count, true)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "count must be between 1 and 1000");
        }
    }

    #[tokio::test]
    async fn test_rejects_blank_file_name() {
        // ---
        let (status, _) = values(params(" ", 10, true)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
