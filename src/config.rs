//! # Session Configuration
//!
//! Tunables for a [`TransferSession`](crate::transfer::TransferSession).
//!
//! | Setting | Default | Meaning |
//! |---------|---------|---------|
//! | `progress_interval` | 50ms | Minimum time between serialization progress events |
//! | `upload_chunk_size` | 16 KiB | Body chunk size, also the upload progress granularity |
//! | `connect_timeout` | 10s | TCP connect timeout |
//! | `request_timeout` | none | Whole-request timeout (large jobs over slow Wi-Fi take minutes) |
//! | `user_agent` | `WirelessPrint/<version>` | `User-Agent` header sent with the upload |

use std::time::Duration;

use crate::error::{Result, WirelessPrintError};

/// Default time between progress events while serializing (at most 20/s).
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Default upload body chunk size in bytes.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transfer session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum interval between progress events during serialization.
    /// Zero reports after every line.
    pub progress_interval: Duration,
    /// Size of the chunks the upload body is streamed in.
    pub upload_chunk_size: usize,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Timeout for the whole request, if any.
    pub request_timeout: Option<Duration>,
    /// User agent sent with the upload.
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            user_agent: format!("WirelessPrint/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SessionConfig {
    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.upload_chunk_size == 0 {
            return Err(WirelessPrintError::Config(
                "upload_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(WirelessPrintError::Config(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(WirelessPrintError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(WirelessPrintError::Config(
                "user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the HTTP client used for uploads.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| WirelessPrintError::Config(format!("HTTP client error: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
