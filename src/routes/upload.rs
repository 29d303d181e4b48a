//! `POST /api/csv/upload` – multipart CSV upload.
//!
//! Gatekeeping (presence, size, extension, content type) happens here; the
//! file body is then handed to the ingestion pipeline.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::error_response;
use crate::clock::SystemClock;
use crate::ingest::Ingestor;
use crate::{Config, SharedStore};

// ---

const FILE_FIELD: &str = "file";
const ALLOWED_CONTENT_TYPES: &[&str] = &["text/csv", "application/csv"];
const MAX_FILE_NAME_LEN: usize = 255;

pub fn router() -> Router<(SharedStore, Config)> {
    // ---
    Router::new().route("/api/csv/upload", post(handler))
}

/// The `file` part of the form.
#[derive(Debug)]
struct Upload {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadAccepted<'a> {
    message: &'static str,
    file_name: &'a str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRejected<'a> {
    error: &'static str,
    message: String,
    file_name: &'a str,
}

async fn handler(
    State((store, config)): State<(SharedStore, Config)>,
    mut multipart: Multipart,
) -> Response {
    // ---
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "No file uploaded or file is empty.")
        }
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return error_response(StatusCode::BAD_REQUEST, &size_message(config.upload_max_bytes))
        }
        Err(e) => {
            warn!("Unreadable multipart body: {}", e);
            return error_response(e.status(), &e.body_text());
        }
    };

    if let Err(reason) = check_upload(&upload, config.upload_max_bytes) {
        warn!("Rejected upload '{}': {}", upload.file_name, reason);
        return error_response(StatusCode::BAD_REQUEST, &reason);
    }

    info!(
        "POST /api/csv/upload - {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let ingestor = Ingestor::new(store, Arc::new(SystemClock), config.max_rows);
    let file_name = upload.file_name.as_str();

    match ingestor.ingest(upload.bytes.as_ref(), file_name).await {
        Ok(_) => (
            StatusCode::OK,
            Json(UploadAccepted {
                message: "CSV file processed successfully",
                file_name,
                timestamp: Utc::now(),
            }),
        )
            .into_response(),
        Err(e) if e.is_user_error() => {
            warn!("Validation error processing CSV file {}: {}", file_name, e);
            (
                StatusCode::BAD_REQUEST,
                Json(UploadRejected {
                    error: "Validation error",
                    message: e.to_string(),
                    file_name,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Unexpected error processing CSV file {}: {}", file_name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadRejected {
                    error: "Internal server error",
                    message: "An unexpected error occurred while processing the file".to_string(),
                    file_name,
                }),
            )
                .into_response()
        }
    }
}

/// Find the `file` part and read it fully. Other parts are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, MultipartError> {
    // ---
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        return Ok(Some(Upload {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

fn size_message(max_bytes: usize) -> String {
    format!(
        "File size exceeds the maximum limit of {} MB.",
        max_bytes / (1024 * 1024)
    )
}

/// Reject uploads that are empty, too large, or not CSV.
fn check_upload(upload: &Upload, max_bytes: usize) -> Result<(), String> {
    // ---
    if upload.bytes.is_empty() {
        return Err("No file uploaded or file is empty.".to_string());
    }
    if upload.bytes.len() > max_bytes {
        return Err(size_message(max_bytes));
    }

    let has_csv_extension = Path::new(&upload.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    // Ignore parameters such as `; charset=utf-8`
    let media_type = upload
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !has_csv_extension || !ALLOWED_CONTENT_TYPES.contains(&media_type.as_str()) {
        return Err("Invalid file type. Only CSV files are allowed.".to_string());
    }
    if upload.file_name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(format!(
            "File name must not exceed {MAX_FILE_NAME_LEN} characters."
        ));
    }
    Ok(())
}
