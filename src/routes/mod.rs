//! Route gateway (EMBP).
//!
//! Each sibling module exports a subrouter over the shared state
//! `(SharedStore, Config)`; this module merges them and attaches the state
//! and body limit, so `main.rs` only calls [`router`].

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use crate::{Config, SharedStore};

mod health;
mod results;
mod upload;
mod values;

// ---

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(store: SharedStore, config: Config) -> Router {
    // ---
    let body_limit = config.upload_max_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(upload::router())
        .merge(results::router())
        .merge(values::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state((store, config))
}

/// JSON body for plain error responses.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}
