//! Receiver state and configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory uploaded jobs are stored in
    pub storage_dir: PathBuf,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            storage_dir: PathBuf::from("received"),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

/// A job stored by the receiver.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedJob {
    pub id: Uuid,
    pub file_name: String,
    pub bytes: usize,
    pub received_at: DateTime<Utc>,
}

/// State shared across handlers.
pub struct ReceiverState {
    pub config: ReceiverConfig,
    /// Jobs received since startup, oldest first.
    pub jobs: RwLock<Vec<ReceivedJob>>,
}

impl ReceiverState {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            jobs: RwLock::new(Vec::new()),
        }
    }
}
