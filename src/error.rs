//! # Error Types
//!
//! This module defines error types used throughout the wireless-print library.
//!
//! Every failure is terminal for the transfer it happened in, never for the
//! process. The session always returns to idle so the user can try again.

use thiserror::Error;

/// Main error type for wireless-print operations
#[derive(Debug, Error)]
pub enum WirelessPrintError {
    /// A transfer was requested while another one is still active
    #[error("Device is busy with another transfer")]
    DeviceBusy,

    /// The HTTP upload failed (connection refused, non-2xx, timeout)
    #[error("Network transfer failed: {0}")]
    NetworkTransfer(String),

    /// The printer demanded credentials, which are not supported
    #[error("Printer requested authentication (HTTP {0}), which is not supported")]
    UnsupportedAuth(u16),

    /// Certificate or TLS negotiation failure
    #[error("TLS validation failed: {0}")]
    TlsValidation(String),

    /// The transfer was aborted by the caller
    #[error("Transfer cancelled")]
    Cancelled,

    /// The job source could not produce its lines
    #[error("Job error: {0}")]
    Job(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Printer-side receiver failure (bind, storage)
    #[error("Receiver error: {0}")]
    Receiver(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wireless-print operations.
pub type Result<T> = std::result::Result<T, WirelessPrintError>;
