//! # Multipart Upload
//!
//! Builds and sends the request the WirelessPrint firmware expects:
//!
//! ```text
//! POST http://{address}/print
//! Content-Type: multipart/form-data; boundary=...
//!
//! --boundary
//! Content-Disposition: form-data; name="file"; filename="{file_name}"
//! Content-Type: application/octet-stream
//!
//! <raw g-code bytes>
//! --boundary--
//! ```
//!
//! The file part is streamed from the shared transfer buffer in fixed-size
//! chunks. Each chunk handed to the connection advances upload progress.

use std::error::Error as StdError;
use std::sync::Arc;

use reqwest::{
    Body, StatusCode,
    multipart::{Form, Part},
};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::error::{Result, WirelessPrintError};

/// Name of the form field carrying the job.
pub const FILE_FIELD: &str = "file";

/// Content type of the file part.
const FILE_MIME: &str = "application/octet-stream";

/// Split `total` bytes into `[start, end)` ranges of at most `chunk_size`.
fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    let chunk_size = chunk_size.max(1);
    (0..total)
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(total)))
        .collect()
}

/// Build the multipart form with a single streamed `file` part.
///
/// `on_progress(sent, total)` is called as each chunk is pulled by the client.
pub(crate) fn build_form<F>(
    file_name: &str,
    data: Arc<Vec<u8>>,
    chunk_size: usize,
    on_progress: F,
) -> Result<Form>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let total = data.len();
    let stream = tokio_stream::iter(chunk_ranges(total, chunk_size)).map(move |(start, end)| {
        on_progress(end as u64, total as u64);
        Ok::<Vec<u8>, std::io::Error>(data[start..end].to_vec())
    });

    let part = Part::stream_with_length(Body::wrap_stream(stream), total as u64)
        .file_name(file_name.to_string())
        .mime_str(FILE_MIME)
        .map_err(|e| WirelessPrintError::NetworkTransfer(format!("Invalid part type: {}", e)))?;

    Ok(Form::new().part(FILE_FIELD, part))
}

/// POST the form and interpret the reply.
pub(crate) async fn send(client: &reqwest::Client, url: &str, form: Form) -> Result<()> {
    debug!(%url, "sending upload");

    let response = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(classify)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
        warn!(%url, %status, "printer requested authentication, not yet implemented");
        return Err(WirelessPrintError::UnsupportedAuth(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    info!(%status, reply = %body.trim(), "upload finished");

    if !status.is_success() {
        let detail = body.trim();
        return Err(WirelessPrintError::NetworkTransfer(if detail.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, detail)
        }));
    }

    Ok(())
}

/// Map a client error onto the transfer error taxonomy.
pub(crate) fn classify(err: reqwest::Error) -> WirelessPrintError {
    let description = describe(&err);
    if is_tls_failure(&description) {
        WirelessPrintError::TlsValidation(description)
    } else if err.is_timeout() {
        WirelessPrintError::NetworkTransfer(format!("timed out: {}", description))
    } else {
        WirelessPrintError::NetworkTransfer(description)
    }
}

/// Join an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

fn is_tls_failure(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl")
}

// ============================================================================
// TESTS
// ============================================================================
