//! # Transfer Events and Notifications
//!
//! Two outputs leave a transfer session:
//!
//! - [`TransferEvent`]s for the host, sent over an unbounded tokio channel.
//!   One `WriteStarted` per transfer, any number of `WriteProgress`, then
//!   exactly one `WriteSuccess` or `WriteError`, then `WriteFinished`.
//! - User-facing notifications through a [`Notifier`]: a progress message
//!   while the transfer runs, then a success or error message.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::stage::Stage;

/// Lifecycle event of a single transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    WriteStarted,
    /// Overall progress in [0, 1].
    WriteProgress(f32),
    WriteSuccess,
    /// Human-readable failure description.
    WriteError(String),
    /// Always the last event of a transfer.
    WriteFinished,
}

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Action the user can trigger from a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    /// Open the printer's web interface in a browser.
    OpenBrowser { url: String },
}

/// A one-shot message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
    pub action: Option<NotificationAction>,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            text: text.into(),
            action: None,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            text: text.into(),
            action: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// UI notification sink provided by the host.
pub trait Notifier: Send + Sync {
    /// Show the transient progress message of a transfer.
    fn show_progress(&self, text: &str);

    /// Update the progress message, in percent.
    fn set_progress(&self, percent: f32);

    /// Dismiss the progress message. Must tolerate being called when nothing is shown.
    fn hide_progress(&self);

    /// Show a standalone message.
    fn notify(&self, notification: Notification);
}

/// Notifier that writes everything to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_progress(&self, text: &str) {
        info!("{}", text);
    }

    fn set_progress(&self, percent: f32) {
        debug!("progress: {:.1}%", percent);
    }

    fn hide_progress(&self) {}

    fn notify(&self, notification: Notification) {
        let action = match &notification.action {
            Some(NotificationAction::OpenBrowser { url }) => format!(" (open {})", url),
            None => String::new(),
        };
        match notification.level {
            NotificationLevel::Info => info!("{}{}", notification.text, action),
            NotificationLevel::Warning => warn!("{}{}", notification.text, action),
            NotificationLevel::Error => error!("{}{}", notification.text, action),
        }
    }
}

// ============================================================================
// PROGRESS REPORTER
// ============================================================================

/// Fans progress out to the host channel and the notifier, keeping the
/// emitted sequence non-decreasing.
///
/// Cloned into the upload body stream, so it is shareable across tasks.
#[derive(Clone)]
pub(crate) struct ProgressReporter {
    events: UnboundedSender<TransferEvent>,
    notifier: Arc<dyn Notifier>,
    current: Arc<Mutex<f32>>,
}

impl ProgressReporter {
    pub(crate) fn new(
        events: UnboundedSender<TransferEvent>,
        notifier: Arc<dyn Notifier>,
        current: Arc<Mutex<f32>>,
    ) -> Self {
        Self {
            events,
            notifier,
            current,
        }
    }

    /// Report a stage-local fraction. Values that would move progress
    /// backwards are dropped.
    pub(crate) fn report(&self, stage: Stage, fraction: f32) {
        let overall = stage.scale_progress(fraction);
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if overall < *current {
                return;
            }
            *current = overall;
        }
        self.notifier.set_progress(overall * 100.0);
        let _ = self.events.send(TransferEvent::WriteProgress(overall));
    }
}

/// Time gate for progress reports: at most one per `interval`.
pub(crate) struct ProgressThrottle {
    interval: Duration,
    next: Instant,
}

impl ProgressThrottle {
    /// The first report is due one `interval` after `start`.
    pub(crate) fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    /// Whether a report is due at `now`. A `true` answer starts the next interval.
    pub(crate) fn ready(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.interval;
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_reporter_scales_by_stage() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(tx, Arc::new(LogNotifier), Arc::default());

        reporter.report(Stage::Serializing, 0.5);
        reporter.report(Stage::Uploading, 0.5);

        assert_eq!(
            drain(&mut rx),
            vec![
                TransferEvent::WriteProgress(0.25),
                TransferEvent::WriteProgress(0.75)
            ]
        );
    }

    #[test]
    fn test_reporter_drops_backwards_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let current = Arc::new(Mutex::new(0.0));
        let reporter = ProgressReporter::new(tx, Arc::new(LogNotifier), current.clone());

        reporter.report(Stage::Uploading, 0.5);
        reporter.report(Stage::Serializing, 1.0);
        reporter.report(Stage::Uploading, 0.25);

        assert_eq!(drain(&mut rx), vec![TransferEvent::WriteProgress(0.75)]);
        assert_eq!(*current.lock().unwrap(), 0.75);
    }

    #[test]
    fn test_reporter_survives_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let reporter = ProgressReporter::new(tx, Arc::new(LogNotifier), Arc::default());
        reporter.report(Stage::Serializing, 0.3);
    }

    #[test]
    fn test_throttle_spaces_reports_by_interval() {
        let start = Instant::now();
        let interval = Duration::from_millis(50);
        let mut throttle = ProgressThrottle::new(interval, start);

        // One line per millisecond for two seconds.
        let due: Vec<Instant> = (1..=2000)
            .map(|ms| start + Duration::from_millis(ms))
            .filter(|now| throttle.ready(*now))
            .collect();

        assert_eq!(due.len(), 40);
        assert!(due[0] >= start + interval);
        assert!(due.windows(2).all(|w| w[1] - w[0] >= interval));
    }

    #[test]
    fn test_throttle_default_rate_is_bounded() {
        let start = Instant::now();
        let mut throttle =
            ProgressThrottle::new(crate::config::DEFAULT_PROGRESS_INTERVAL, start);

        // 100k lines over one second.
        let due = (1..=100_000u64)
            .filter(|i| throttle.ready(start + Duration::from_micros(i * 10)))
            .count();

        assert!(due <= 20, "{} reports in one second", due);
    }

    #[test]
    fn test_throttle_zero_interval_reports_every_time() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::ZERO, start);
        assert!(throttle.ready(start));
        assert!(throttle.ready(start));
    }

    #[test]
    fn test_notification_builders() {
        let n = Notification::info("Saved").with_action(NotificationAction::OpenBrowser {
            url: "http://192.0.2.5".to_string(),
        });
        assert_eq!(n.level, NotificationLevel::Info);
        assert!(n.action.is_some());
        assert!(Notification::error("x").action.is_none());
    }
}
