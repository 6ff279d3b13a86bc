//! # Printer-Side Receiver
//!
//! A minimal HTTP endpoint speaking the WirelessPrint upload contract. It
//! stores every job it receives instead of printing it, which makes it
//! useful for trying the sender without hardware and for integration tests.
//!
//! ## Usage
//!
//! ```bash
//! wireless-print receive --listen 0.0.0.0:8080 --storage ./received
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Status and list of received jobs (JSON) |
//! | POST | `/print` | Multipart upload, `file` part |

mod handlers;
mod state;

pub use handlers::StatusResponse;
pub use state::{ReceivedJob, ReceiverConfig, ReceiverState};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Result, WirelessPrintError};

/// Build the receiver routes over shared state.
pub fn router(state: Arc<ReceiverState>) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::status))
        .route(
            "/print",
            post(handlers::print).layer(DefaultBodyLimit::max(limit)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the receiver until the process is stopped.
///
/// ## Example
///
/// ```no_run
/// use wireless_print::receiver::{serve, ReceiverConfig};
///
/// # async fn example() -> Result<(), wireless_print::WirelessPrintError> {
/// let config = ReceiverConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     ..Default::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ReceiverConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            WirelessPrintError::Receiver(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!(
        listen = %config.listen_addr,
        storage = %config.storage_dir.display(),
        "receiver listening"
    );

    serve_on(listener, config).await
}

/// Run the receiver on an already-bound listener.
pub async fn serve_on(listener: tokio::net::TcpListener, config: ReceiverConfig) -> Result<()> {
    let app = router(Arc::new(ReceiverState::new(config)));
    axum::serve(listener, app)
        .await
        .map_err(|e| WirelessPrintError::Receiver(format!("Server error: {}", e)))
}
