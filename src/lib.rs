//! # WirelessPrint - Network Printing Library
//!
//! Sends g-code jobs to 3D printers running the WirelessPrint firmware, which
//! accepts uploads over plain HTTP. It provides:
//!
//! - **Transfer session**: the output device that serializes a job and
//!   uploads it, one transfer at a time, with progress and outcome events
//! - **Device model**: printer identity and typed zeroconf properties
//! - **Receiver**: a printer-side endpoint for testing without hardware
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use wireless_print::{
//!     config::SessionConfig,
//!     device::{DeviceProperties, PrinterDevice},
//!     job::FileJob,
//!     transfer::{TransferEvent, TransferSession},
//! };
//!
//! # async fn example() -> Result<(), wireless_print::WirelessPrintError> {
//! let device = PrinterDevice::new("wirelessprint", "192.0.2.5", 80, DeviceProperties::default());
//! let (events, mut rx) = mpsc::unbounded_channel();
//! let session = TransferSession::new(device, SessionConfig::default(), events)?;
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         if let TransferEvent::WriteProgress(p) = event {
//!             println!("{:.0}%", p * 100.0);
//!         }
//!     }
//! });
//!
//! session.request_write(&FileJob::new("benchy.gcode"), None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transfer`] | Transfer session, events, upload |
//! | [`device`] | Printer identity and properties |
//! | [`job`] | Job sources |
//! | [`receiver`] | Printer-side upload endpoint |
//! | [`config`] | Session tunables |
//! | [`error`] | Error types |

pub mod config;
pub mod device;
pub mod error;
pub mod job;
pub mod logging;
pub mod receiver;
pub mod transfer;

// Re-exports for convenience
pub use config::SessionConfig;
pub use device::PrinterDevice;
pub use error::WirelessPrintError;
pub use transfer::TransferSession;
