//! Upload and status handlers.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::transfer::upload::FILE_FIELD;

use super::state::{ReceivedJob, ReceiverState};

/// Name used when the client sends no usable file name.
const DEFAULT_FILE_NAME: &str = "upload.gcode";

/// Response from the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub jobs: Vec<ReceivedJob>,
}

/// GET / - Receiver status and received jobs.
pub async fn status(State(state): State<Arc<ReceiverState>>) -> Json<StatusResponse> {
    let jobs = state.jobs.read().await;
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        jobs: jobs.clone(),
    })
}

/// POST /print - Store an uploaded job.
pub async fn print(
    State(state): State<Arc<ReceiverState>>,
    mut multipart: Multipart,
) -> Result<Json<ReceivedJob>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or(""));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| {
        warn!("upload without a file field");
        (StatusCode::BAD_REQUEST, "No file field found".to_string())
    })?;

    let dir = &state.config.storage_dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create {}: {}", dir.display(), e),
        )
    })?;
    tokio::fs::write(dir.join(&file_name), &data)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store {}: {}", file_name, e),
            )
        })?;

    let job = ReceivedJob {
        id: Uuid::new_v4(),
        file_name,
        bytes: data.len(),
        received_at: Utc::now(),
    };
    info!(file = %job.file_name, bytes = job.bytes, "job received");

    state.jobs.write().await.push(job.clone());
    Ok(Json(job))
}

/// Keep only the final path component of a client-supplied name.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    Path::new(&name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}
