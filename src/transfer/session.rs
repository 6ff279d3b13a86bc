//! # Transfer Session
//!
//! The output device for one printer. Each print submission runs through
//!
//! 1. **Serializing**: job lines are copied into the transfer buffer. Progress
//!    is reported at most once per `progress_interval` and the task yields to
//!    the runtime after each report, so large jobs do not starve other work.
//! 2. **Uploading**: the buffer is POSTed as a multipart `file` part.
//! 3. **Idle**: buffer released, outcome reported.
//!
//! Only one transfer runs at a time. A second `request_write` while the
//! session is busy fails with [`WirelessPrintError::DeviceBusy`] and changes
//! nothing.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use wireless_print::{
//!     config::SessionConfig,
//!     device::{DeviceProperties, PrinterDevice},
//!     job::Job,
//!     transfer::TransferSession,
//! };
//!
//! # async fn example() -> Result<(), wireless_print::WirelessPrintError> {
//! let device = PrinterDevice::new("wirelessprint", "192.0.2.5", 80, DeviceProperties::default());
//! let (events, _rx) = mpsc::unbounded_channel();
//! let session = Arc::new(TransferSession::new(device, SessionConfig::default(), events)?);
//!
//! let job = Job::from_text("cube", "G28\nG1 X10 Y10\n");
//! let report = session.request_write(&job, Some("cube.3mf")).await?;
//! assert_eq!(report.file_name, "cube.gcode");
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{mpsc::UnboundedSender, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::device::PrinterDevice;
use crate::error::{Result, WirelessPrintError};
use crate::job::JobSource;

use super::events::{
    LogNotifier, Notification, NotificationAction, Notifier, ProgressReporter, ProgressThrottle,
    TransferEvent,
};
use super::filename::output_file_name;
use super::stage::Stage;
use super::upload;

/// Reachability of the printer, independent of any transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Connected,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Name the printer stored the job under.
    pub file_name: String,
    /// Size of the uploaded job in bytes.
    pub bytes: usize,
}

#[derive(Default)]
struct SessionState {
    stage: Stage,
    file_name: Option<String>,
    /// Present iff `stage != Idle`.
    buffer: Option<Arc<Vec<u8>>>,
    cancel_requested: bool,
    abort: Option<oneshot::Sender<()>>,
    connection: ConnectionState,
    job_state: String,
    error_text: String,
}

/// Returns the session to idle if a transfer future is dropped before it
/// completes (timeout, `select!`, task abort).
struct TransferGuard<'a> {
    session: &'a TransferSession,
    file_name: String,
    armed: bool,
}

impl TransferGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abandon(&self.file_name);
        }
    }
}

/// Output device driving uploads to one WirelessPrint printer.
pub struct TransferSession {
    device: PrinterDevice,
    config: SessionConfig,
    client: reqwest::Client,
    notifier: Arc<dyn Notifier>,
    events: UnboundedSender<TransferEvent>,
    progress: Arc<Mutex<f32>>,
    state: Mutex<SessionState>,
}

impl TransferSession {
    /// Create a session for `device`. Events of every transfer go to `events`.
    ///
    /// Notifications are logged until a host notifier is attached with
    /// [`with_notifier`](Self::with_notifier).
    pub fn new(
        device: PrinterDevice,
        config: SessionConfig,
        events: UnboundedSender<TransferEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;
        Ok(Self {
            device,
            config,
            client,
            notifier: Arc::new(LogNotifier),
            events,
            progress: Arc::default(),
            state: Mutex::default(),
        })
    }

    /// Route user notifications to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // ========================================================================
    // TRANSFER
    // ========================================================================

    /// Serialize `job` and upload it to the printer.
    ///
    /// Resolves once the transfer has ended. On failure the terminal events
    /// (`WriteError`, `WriteFinished`) have already been emitted when the
    /// error is returned; `DeviceBusy` emits nothing.
    ///
    /// Dropping the returned future ends the transfer as cancelled: the
    /// session goes back to idle and `WriteError`, `WriteFinished` are
    /// emitted.
    pub async fn request_write(
        &self,
        job: &dyn JobSource,
        suggested_file_name: Option<&str>,
    ) -> Result<TransferReport> {
        let file_name = output_file_name(suggested_file_name, &job.job_name());

        {
            let mut state = self.lock_state();
            if state.stage.is_active() {
                debug!(device = %self.device.key(), "rejecting write, transfer in progress");
                return Err(WirelessPrintError::DeviceBusy);
            }
            state.stage = Stage::Serializing;
            state.file_name = Some(file_name.clone());
            state.buffer = Some(Arc::new(Vec::new()));
            state.cancel_requested = false;
        }
        let guard = TransferGuard {
            session: self,
            file_name: file_name.clone(),
            armed: true,
        };
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = 0.0;

        info!(device = %self.device.key(), file = %file_name, "write started");
        self.emit(TransferEvent::WriteStarted);
        self.notifier
            .show_progress(&format!("Saving to {}", self.device.name()));

        let result = self.run_transfer(job, &file_name).await;
        guard.disarm();
        self.finish(file_name, result)
    }

    /// Abort the current transfer.
    ///
    /// While uploading the in-flight request is dropped; while serializing
    /// the copy loop stops at its next progress check. Idle sessions ignore
    /// this.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        match state.stage {
            Stage::Idle => {
                debug!(device = %self.device.key(), "cancel ignored, no transfer");
                return;
            }
            Stage::Serializing => state.cancel_requested = true,
            Stage::Uploading => {
                if let Some(abort) = state.abort.take() {
                    let _ = abort.send(());
                }
            }
        }
        drop(state);

        info!(device = %self.device.key(), "cancelling transfer");
        self.notifier.hide_progress();
    }

    async fn run_transfer(&self, job: &dyn JobSource, file_name: &str) -> Result<usize> {
        let reporter = self.reporter();
        let data = self.serialize(job, &reporter).await?;

        let (abort_tx, abort_rx) = oneshot::channel();
        {
            let mut state = self.lock_state();
            if state.cancel_requested {
                return Err(WirelessPrintError::Cancelled);
            }
            state.stage = Stage::Uploading;
            state.abort = Some(abort_tx);
        }

        let url = self.device.print_url();
        debug!(%url, bytes = data.len(), "upload starting");

        let bytes = data.len();
        let upload_reporter = reporter.clone();
        let form = upload::build_form(
            file_name,
            data,
            self.config.upload_chunk_size,
            move |sent, total| upload_reporter.report(Stage::Uploading, sent as f32 / total as f32),
        )?;

        let result = tokio::select! {
            result = upload::send(&self.client, &url, form) => result.map(|()| bytes),
            _ = abort_rx => Err(WirelessPrintError::Cancelled),
        };
        // An empty body pulls no chunks.
        if result.is_ok() && bytes == 0 {
            reporter.report(Stage::Uploading, 1.0);
        }
        result
    }

    /// Copy the job into the transfer buffer.
    ///
    /// Lines are appended to a local buffer; the session lock is only taken
    /// at progress checks and once the copy is complete.
    async fn serialize(
        &self,
        job: &dyn JobSource,
        reporter: &ProgressReporter,
    ) -> Result<Arc<Vec<u8>>> {
        let lines = job.lines().await?;
        let total = lines.len();
        let mut data = Vec::with_capacity(lines.iter().map(String::len).sum());
        let mut throttle = ProgressThrottle::new(self.config.progress_interval, Instant::now());

        for (i, line) in lines.iter().enumerate() {
            data.extend_from_slice(line.as_bytes());

            if throttle.ready(Instant::now()) {
                self.check_cancelled()?;
                reporter.report(Stage::Serializing, (i + 1) as f32 / total as f32);
                tokio::task::yield_now().await;
            }
        }
        self.check_cancelled()?;
        reporter.report(Stage::Serializing, 1.0);

        debug!(lines = total, bytes = data.len(), "job serialized");
        let data = Arc::new(data);
        self.lock_state().buffer = Some(data.clone());
        Ok(data)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.lock_state().cancel_requested {
            return Err(WirelessPrintError::Cancelled);
        }
        Ok(())
    }

    /// Reset after the transfer future was dropped mid-flight.
    fn abandon(&self, file_name: &str) {
        let err = WirelessPrintError::Cancelled;
        {
            let mut state = self.lock_state();
            state.stage = Stage::Idle;
            state.file_name = None;
            state.buffer = None;
            state.abort = None;
            state.cancel_requested = false;
            state.error_text = err.to_string();
        }
        self.notifier.hide_progress();

        info!(device = %self.device.key(), file = %file_name, "write abandoned by caller");
        self.emit(TransferEvent::WriteError(err.to_string()));
        self.emit(TransferEvent::WriteFinished);
    }

    /// Return to idle and report the outcome.
    fn finish(&self, file_name: String, result: Result<usize>) -> Result<TransferReport> {
        {
            let mut state = self.lock_state();
            state.stage = Stage::Idle;
            state.file_name = None;
            state.buffer = None;
            state.abort = None;
            state.cancel_requested = false;
            match &result {
                Ok(_) => state.job_state = file_name.clone(),
                Err(err) => state.error_text = err.to_string(),
            }
        }
        self.notifier.hide_progress();

        match result {
            Ok(bytes) => {
                info!(device = %self.device.key(), file = %file_name, bytes, "write succeeded");
                self.notifier.notify(
                    Notification::info(format!(
                        "Saved to {} as {}",
                        self.device.name(),
                        file_name
                    ))
                    .with_action(NotificationAction::OpenBrowser {
                        url: self.device.base_url(),
                    }),
                );
                self.emit(TransferEvent::WriteSuccess);
                self.emit(TransferEvent::WriteFinished);
                Ok(TransferReport { file_name, bytes })
            }
            Err(err) => {
                match &err {
                    WirelessPrintError::Cancelled => {
                        info!(device = %self.device.key(), file = %file_name, "write cancelled")
                    }
                    WirelessPrintError::TlsValidation(detail) => {
                        warn!(device = %self.device.key(), %detail, "TLS errors");
                        self.notifier.notify(Notification::warning(format!(
                            "One or more SSL errors has occurred: {}",
                            detail
                        )));
                    }
                    _ => error!(device = %self.device.key(), file = %file_name, "write failed: {}", err),
                }
                self.notifier.notify(Notification::error(format!(
                    "Could not save to {}: {}",
                    self.device.name(),
                    err
                )));
                self.emit(TransferEvent::WriteError(err.to_string()));
                self.emit(TransferEvent::WriteFinished);
                Err(err)
            }
        }
    }

    fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(
            self.events.clone(),
            self.notifier.clone(),
            self.progress.clone(),
        )
    }

    fn emit(&self, event: TransferEvent) {
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // CONNECTION
    // ========================================================================

    /// Mark the printer as reachable.
    pub fn connect(&self) {
        info!(device = %self.device.key(), address = %self.device.address(), "connected");
        self.lock_state().connection = ConnectionState::Connected;
    }

    /// Mark the printer as closed and clear the job display.
    pub fn close(&self) {
        debug!(
            "Closing connection of printer {} with ip {}",
            self.device.key(),
            self.device.address()
        );
        {
            let mut state = self.lock_state();
            state.job_state.clear();
            state.connection = ConnectionState::Closed;
        }
        self.notifier.hide_progress();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock_state().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn device(&self) -> &PrinterDevice {
        &self.device
    }

    pub fn key(&self) -> &str {
        self.device.key()
    }

    /// Look up an announced device property. Empty string if absent.
    pub fn get_property(&self, key: &str) -> String {
        self.device.get_property(key)
    }

    pub fn stage(&self) -> Stage {
        self.lock_state().stage
    }

    /// Overall progress of the current (or last) transfer in [0, 1].
    pub fn progress(&self) -> f32 {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Output name of the current transfer, `None` when idle.
    pub fn file_name(&self) -> Option<String> {
        self.lock_state().file_name.clone()
    }

    /// Whether a transfer buffer is allocated.
    pub fn has_buffer(&self) -> bool {
        self.lock_state().buffer.is_some()
    }

    /// Size of the transfer buffer. Zero until serialization completes.
    pub fn buffered_bytes(&self) -> usize {
        self.lock_state().buffer.as_ref().map_or(0, |b| b.len())
    }

    /// Name of the last job handed to the printer, cleared by [`close`](Self::close).
    pub fn job_state(&self) -> String {
        self.lock_state().job_state.clone()
    }

    /// Description of the last failure.
    pub fn error_text(&self) -> String {
        self.lock_state().error_text.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProperties;
    use crate::job::Job;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn session_for(address: &str) -> (Arc<TransferSession>, mpsc::UnboundedReceiver<TransferEvent>) {
        session_with(address, Duration::ZERO, Arc::new(LogNotifier))
    }

    fn session_with(
        address: &str,
        progress_interval: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<TransferSession>, mpsc::UnboundedReceiver<TransferEvent>) {
        let device = PrinterDevice::new("wp-test", address, 80, DeviceProperties::default());
        let config = SessionConfig {
            progress_interval,
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let session = TransferSession::new(device, config, tx)
            .unwrap()
            .with_notifier(notifier);
        (Arc::new(session), rx)
    }

    /// Address nothing listens on; uploads fail right after serialization.
    fn closed_address() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    fn big_job(lines: usize) -> Job {
        Job::new("big", vec!["G1 X10 Y10 Z0.2 E0.05\n".to_string(); lines])
    }

    /// Notifier recording when each progress update arrived, and how far a
    /// background counter had got at that point.
    #[derive(Default)]
    struct TimedNotifier {
        ticks: Arc<AtomicUsize>,
        updates: Mutex<Vec<(Instant, f32, usize)>>,
    }

    impl TimedNotifier {
        /// Updates strictly inside the serializing half.
        fn serializing_updates(&self) -> Vec<(Instant, f32, usize)> {
            self.updates
                .lock()
                .unwrap()
                .iter()
                .copied()
                .filter(|(_, percent, _)| *percent < 50.0)
                .collect()
        }
    }

    impl Notifier for TimedNotifier {
        fn show_progress(&self, _text: &str) {}

        fn set_progress(&self, percent: f32) {
            let ticks = self.ticks.load(Ordering::SeqCst);
            self.updates
                .lock()
                .unwrap()
                .push((Instant::now(), percent, ticks));
        }

        fn hide_progress(&self) {}

        fn notify(&self, _notification: Notification) {}
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    /// Job source that fails to render.
    struct BrokenJob;

    #[async_trait]
    impl JobSource for BrokenJob {
        fn job_name(&self) -> String {
            "broken".to_string()
        }

        async fn lines(&self) -> Result<Vec<String>> {
            Err(WirelessPrintError::Job("renderer crashed".to_string()))
        }
    }

    /// Job source that cancels its own session while being rendered.
    struct CancellingJob(Arc<TransferSession>);

    #[async_trait]
    impl JobSource for CancellingJob {
        fn job_name(&self) -> String {
            "cancelled".to_string()
        }

        async fn lines(&self) -> Result<Vec<String>> {
            self.0.cancel();
            Ok(vec!["G28\n".to_string(); 10])
        }
    }

    /// Job source whose renderer never finishes.
    struct StalledJob;

    #[async_trait]
    impl JobSource for StalledJob {
        fn job_name(&self) -> String {
            "stalled".to_string()
        }

        async fn lines(&self) -> Result<Vec<String>> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_new_session_is_idle_and_closed() {
        let (session, _rx) = session_for("192.0.2.5");
        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.has_buffer());
        assert_eq!(session.file_name(), None);
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let device = PrinterDevice::new("wp", "192.0.2.5", 80, DeviceProperties::default());
        let config = SessionConfig {
            upload_chunk_size: 0,
            ..Default::default()
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(TransferSession::new(device, config, tx).is_err());
    }

    #[test]
    fn test_connect_and_close() {
        let (session, _rx) = session_for("192.0.2.5");
        session.connect();
        assert!(session.is_connected());

        session.lock_state().job_state = "cube.gcode".to_string();
        session.close();
        assert!(!session.is_connected());
        assert_eq!(session.job_state(), "");
    }

    #[test]
    fn test_cancel_while_idle_is_noop() {
        let (session, mut rx) = session_for("192.0.2.5");
        session.cancel();
        assert_eq!(session.stage(), Stage::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_busy_rejected_without_side_effects() {
        let (session, mut rx) = session_for("192.0.2.5");
        {
            let mut state = session.lock_state();
            state.stage = Stage::Uploading;
            state.buffer = Some(Arc::new(b"G28\n".to_vec()));
            state.file_name = Some("first.gcode".to_string());
        }

        let job = Job::from_text("second", "G1 X1\n");
        let err = session.request_write(&job, None).await.unwrap_err();

        assert!(matches!(err, WirelessPrintError::DeviceBusy));
        assert_eq!(session.stage(), Stage::Uploading);
        assert_eq!(session.buffered_bytes(), 4);
        assert_eq!(session.file_name().as_deref(), Some("first.gcode"));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_job_failure_reports_error_and_resets() {
        let (session, mut rx) = session_for("192.0.2.5");

        let err = session.request_write(&BrokenJob, None).await.unwrap_err();
        assert!(matches!(err, WirelessPrintError::Job(_)));

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&TransferEvent::WriteStarted));
        assert_eq!(
            &events[events.len() - 2..],
            &[
                TransferEvent::WriteError("Job error: renderer crashed".to_string()),
                TransferEvent::WriteFinished
            ]
        );
        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.has_buffer());
        assert_eq!(session.error_text(), "Job error: renderer crashed");
    }

    #[tokio::test]
    async fn test_cancel_during_serialization() {
        let (session, mut rx) = session_for("192.0.2.5");
        let job = CancellingJob(session.clone());

        let err = session.request_write(&job, None).await.unwrap_err();
        assert!(matches!(err, WirelessPrintError::Cancelled));

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                TransferEvent::WriteStarted,
                TransferEvent::WriteError("Transfer cancelled".to_string()),
                TransferEvent::WriteFinished
            ]
        );
        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.has_buffer());
    }

    #[tokio::test]
    async fn test_dropped_write_returns_session_to_idle() {
        let (session, mut rx) = session_for("192.0.2.5");

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), session.request_write(&StalledJob, None))
                .await;
        assert!(timed_out.is_err());

        assert_eq!(session.stage(), Stage::Idle);
        assert!(!session.has_buffer());
        assert_eq!(session.file_name(), None);
        assert_eq!(session.error_text(), "Transfer cancelled");
        assert_eq!(
            drain(&mut rx),
            vec![
                TransferEvent::WriteStarted,
                TransferEvent::WriteError("Transfer cancelled".to_string()),
                TransferEvent::WriteFinished
            ]
        );

        let err = session.request_write(&BrokenJob, None).await.unwrap_err();
        assert!(matches!(err, WirelessPrintError::Job(_)));
    }

    #[tokio::test]
    async fn test_serialization_progress_with_long_interval_reports_once() {
        let notifier = Arc::new(TimedNotifier::default());
        let (session, mut rx) =
            session_with(&closed_address(), Duration::from_secs(3600), notifier.clone());

        let _ = session.request_write(&big_job(10_000), None).await;

        let serializing: Vec<f32> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                TransferEvent::WriteProgress(p) if p <= 0.5 => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(serializing, vec![0.5]);
        assert!(notifier.serializing_updates().is_empty());
    }

    #[tokio::test]
    async fn test_serialization_progress_is_time_throttled() {
        let interval = Duration::from_millis(20);
        let lines = 300_000;
        let notifier = Arc::new(TimedNotifier::default());
        let (session, _rx) = session_with(&closed_address(), interval, notifier.clone());

        let started = Instant::now();
        let _ = session.request_write(&big_job(lines), None).await;
        let elapsed = started.elapsed();

        let updates = notifier.serializing_updates();
        let bound = (elapsed.as_millis() / interval.as_millis()) as usize + 1;
        assert!(updates.len() <= bound, "{} updates in {:?}", updates.len(), elapsed);
        assert!(updates.len() < lines / 100);
        if let Some((first, _, _)) = updates.first() {
            assert!(*first - started >= interval);
        }
        assert!(updates.windows(2).all(|w| w[1].0 - w[0].0 >= interval));
    }

    #[tokio::test]
    async fn test_serialization_yields_between_reports() {
        let notifier = Arc::new(TimedNotifier::default());
        let ticks = notifier.ticks.clone();
        let (session, _rx) = session_with(&closed_address(), Duration::ZERO, notifier.clone());

        tokio::spawn(async move {
            loop {
                ticks.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        });

        let _ = session.request_write(&big_job(50), None).await;

        let updates = notifier.serializing_updates();
        assert!(updates.len() >= 2);
        let (_, _, first) = updates[0];
        let (_, _, last) = updates[updates.len() - 1];
        assert!(last > first, "background task never ran during serialization");
    }
}
