//! # Transfer Layer
//!
//! Sends one job at a time to a WirelessPrint printer.
//!
//! ## Modules
//!
//! - [`session`]: The output device state machine
//! - [`stage`]: Transfer stages and progress scaling
//! - [`events`]: Host events and user notifications
//! - [`filename`]: Output file naming
//! - [`upload`]: Multipart request construction and submission

pub mod events;
pub mod filename;
pub mod session;
pub mod stage;
pub mod upload;

pub use events::{
    LogNotifier, Notification, NotificationAction, NotificationLevel, Notifier, TransferEvent,
};
pub use filename::{OUTPUT_EXTENSION, output_file_name};
pub use session::{ConnectionState, TransferReport, TransferSession};
pub use stage::Stage;
