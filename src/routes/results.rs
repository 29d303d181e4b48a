//! `GET /api/results/results` – filtered per-file summaries.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use super::error_response;
use crate::store::SummaryFilter;
use crate::{Config, SharedStore};

// ---

pub fn router() -> Router<(SharedStore, Config)> {
    // ---
    Router::new().route("/api/results/results", get(handler))
}

/// Query parameters; every one is optional and bounds are inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsQuery {
    file_name: Option<String>,
    min_start_time: Option<DateTime<Utc>>,
    max_start_time: Option<DateTime<Utc>>,
    min_avg_value: Option<Decimal>,
    max_avg_value: Option<Decimal>,
    min_avg_execution_time: Option<Decimal>,
    max_avg_execution_time: Option<Decimal>,
}

impl From<ResultsQuery> for SummaryFilter {
    fn from(q: ResultsQuery) -> Self {
        SummaryFilter {
            file_name: q.file_name,
            min_start_time: q.min_start_time,
            max_start_time: q.max_start_time,
            min_avg_value: q.min_avg_value,
            max_avg_value: q.max_avg_value,
            min_avg_execution_time: q.min_avg_execution_time,
            max_avg_execution_time: q.max_avg_execution_time,
        }
    }
}

async fn handler(
    Query(params): Query<ResultsQuery>,
    State((store, _config)): State<(SharedStore, Config)>,
) -> Response {
    // ---
    info!("GET /api/results/results - {:?}", params);
    let filter = SummaryFilter::from(params);

    match store.find_summaries(&filter).await {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => {
            error!("Error retrieving filtered results: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
