//! Tracing setup for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary (or to the host embedding the library).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, WirelessPrintError};

/// Map a `-v` count to a level name (0=warn, 1=info, 2=debug, 3+=trace).
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize stderr logging. `RUST_LOG` overrides the verbosity.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wireless_print={},wireless-print={},tower_http={}",
            level, level, level
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbosity >= 2)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| WirelessPrintError::Config(format!("Failed to initialize logging: {}", e)))
}
