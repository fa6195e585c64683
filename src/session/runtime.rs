//! Async shell around [`SessionCoordinator`].
//!
//! One tokio task owns the coordinator and the placement engine and is the
//! only place either is mutated. Pointer readings, analysis completions and
//! control commands all funnel into it through channels; callers talk to it
//! through a cloneable [`SessionHandle`].

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::coordinator::{Completion, SessionCoordinator, StartResult, TickDecision};
use super::state::{InFlightTicket, SessionStatus};
use crate::capture::{capture_region, CaptureContext, DEFAULT_CROP_SIZE};
use crate::collaborators::{
    AnalysisError, AnalysisRequest, AnalysisResponse, Collaborators, PermissionStatus,
};
use crate::geometry::Point;
use crate::metrics::{CycleMetrics, CycleOutcome, MetricsCollector, MetricsSnapshot, TickOutcome};
use crate::models::{InteractionMode, PositionReading, PresentationPolicy, TextRegion, TokenUsageStats};
use crate::placement::{PlacementEngine, PlacementHints};
use crate::sensing::{SamplerController, READING_BUFFER};
use crate::settings::CompanionSettings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const COMMAND_BUFFER: usize = 32;
const COMMENTARY_BUFFER: usize = 16;

type AnalysisResult = Result<AnalysisResponse, AnalysisError>;

/// Broadcast to subscribers whenever a cycle produces something to show.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentaryEvent {
    Delivered {
        text: String,
        mode: InteractionMode,
        /// Where the overlay bubble went, if the overlay was used.
        origin: Option<Point>,
    },
    Failed {
        error: AnalysisError,
    },
}

enum SessionCommand {
    Start(oneshot::Sender<SessionStatus>),
    Stop(oneshot::Sender<SessionStatus>),
    Toggle(oneshot::Sender<SessionStatus>),
    SetMode(InteractionMode, oneshot::Sender<bool>),
    SetOverlayEnabled(bool, oneshot::Sender<()>),
    SetVoiceEnabled(bool, oneshot::Sender<()>),
    SetNotificationsEnabled(bool, oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
    mode: watch::Receiver<InteractionMode>,
    usage: watch::Receiver<Option<TokenUsageStats>>,
    commentary: broadcast::Sender<CommentaryEvent>,
    metrics: MetricsCollector,
    cancel_token: CancellationToken,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| anyhow!("session runtime has shut down"))?;
        reply_rx
            .await
            .context("session runtime dropped the request")
    }

    /// Requests permissions if needed and activates the capture pipeline.
    /// Returns the resulting status; `Stopped` means permissions were denied.
    pub async fn start(&self) -> Result<SessionStatus> {
        self.request(SessionCommand::Start).await
    }

    pub async fn stop(&self) -> Result<SessionStatus> {
        self.request(SessionCommand::Stop).await
    }

    pub async fn toggle(&self) -> Result<SessionStatus> {
        self.request(SessionCommand::Toggle).await
    }

    /// Returns whether the mode actually changed.
    pub async fn set_mode(&self, mode: InteractionMode) -> Result<bool> {
        self.request(|reply| SessionCommand::SetMode(mode, reply)).await
    }

    pub async fn set_overlay_enabled(&self, enabled: bool) -> Result<()> {
        self.request(|reply| SessionCommand::SetOverlayEnabled(enabled, reply))
            .await
    }

    pub async fn set_voice_enabled(&self, enabled: bool) -> Result<()> {
        self.request(|reply| SessionCommand::SetVoiceEnabled(enabled, reply))
            .await
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.request(|reply| SessionCommand::SetNotificationsEnabled(enabled, reply))
            .await
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn mode(&self) -> InteractionMode {
        *self.mode.borrow()
    }

    pub fn usage_stats(&self) -> Option<TokenUsageStats> {
        *self.usage.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn subscribe_usage(&self) -> watch::Receiver<Option<TokenUsageStats>> {
        self.usage.clone()
    }

    pub fn subscribe_commentary(&self) -> broadcast::Receiver<CommentaryEvent> {
        self.commentary.subscribe()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }

    /// Stops the session and ends the runtime task.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

pub struct SessionRuntime {
    coordinator: SessionCoordinator,
    placement: PlacementEngine,
    collaborators: Collaborators,
    overlay_enabled: bool,
    voice_enabled: bool,
    notifications_enabled: bool,
    poll_interval: Duration,
    sampler: SamplerController,
    reading_tx: mpsc::Sender<PositionReading>,
    reading_rx: mpsc::Receiver<PositionReading>,
    completion_tx: mpsc::UnboundedSender<(InFlightTicket, AnalysisResult)>,
    completion_rx: mpsc::UnboundedReceiver<(InFlightTicket, AnalysisResult)>,
    status_tx: watch::Sender<SessionStatus>,
    mode_tx: watch::Sender<InteractionMode>,
    usage_tx: watch::Sender<Option<TokenUsageStats>>,
    commentary_tx: broadcast::Sender<CommentaryEvent>,
    metrics: MetricsCollector,
}

impl SessionRuntime {
    /// Spawns the runtime on the current tokio runtime.
    pub fn spawn(
        settings: CompanionSettings,
        collaborators: Collaborators,
    ) -> (SessionHandle, JoinHandle<()>) {
        Self::spawn_with_placement(settings, collaborators, PlacementEngine::new())
    }

    pub fn spawn_with_placement(
        settings: CompanionSettings,
        collaborators: Collaborators,
        placement: PlacementEngine,
    ) -> (SessionHandle, JoinHandle<()>) {
        let mode = settings.interaction_mode;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (reading_tx, reading_rx) = mpsc::channel(READING_BUFFER);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::Stopped);
        let (mode_tx, mode_rx) = watch::channel(mode);
        let (usage_tx, usage_rx) = watch::channel(None);
        let (commentary_tx, _) = broadcast::channel(COMMENTARY_BUFFER);
        let metrics = MetricsCollector::new();
        let cancel_token = CancellationToken::new();

        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
            mode: mode_rx,
            usage: usage_rx,
            commentary: commentary_tx.clone(),
            metrics: metrics.clone(),
            cancel_token: cancel_token.clone(),
        };

        let runtime = SessionRuntime {
            coordinator: SessionCoordinator::new(mode, settings.gate_profiles),
            placement,
            collaborators,
            overlay_enabled: settings.overlay_enabled,
            voice_enabled: settings.voice_enabled,
            notifications_enabled: settings.notifications_enabled,
            poll_interval: settings.poll_interval(),
            sampler: SamplerController::new(),
            reading_tx,
            reading_rx,
            completion_tx,
            completion_rx,
            status_tx,
            mode_tx,
            usage_tx,
            commentary_tx,
            metrics,
        };

        log_info!(
            "Session runtime ready ({} mode, analysis via {})",
            mode,
            runtime.collaborators.analysis.describe()
        );

        let join = tokio::spawn(runtime.run(command_rx, cancel_token));
        (handle, join)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, cancel_token: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    log_info!("Session runtime shutting down");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        log_info!("All session handles dropped; shutting down");
                        break;
                    }
                },
                Some(reading) = self.reading_rx.recv() => {
                    self.on_reading(reading).await;
                }
                Some((ticket, result)) = self.completion_rx.recv() => {
                    self.settle(ticket, result).await;
                }
            }
        }

        self.stop().await;
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start(reply) => {
                let _ = reply.send(self.start().await);
            }
            SessionCommand::Stop(reply) => {
                let _ = reply.send(self.stop().await);
            }
            SessionCommand::Toggle(reply) => {
                let status = if self.coordinator.status() == SessionStatus::Stopped {
                    self.start().await
                } else {
                    self.stop().await
                };
                let _ = reply.send(status);
            }
            SessionCommand::SetMode(mode, reply) => {
                let changed = self.coordinator.set_mode(mode);
                if changed {
                    self.mode_tx.send_replace(mode);
                    self.publish_usage();
                }
                let _ = reply.send(changed);
            }
            SessionCommand::SetOverlayEnabled(enabled, reply) => {
                self.overlay_enabled = enabled;
                if !enabled {
                    self.collaborators.presentation.hide();
                }
                let _ = reply.send(());
            }
            SessionCommand::SetVoiceEnabled(enabled, reply) => {
                self.voice_enabled = enabled;
                let _ = reply.send(());
            }
            SessionCommand::SetNotificationsEnabled(enabled, reply) => {
                self.notifications_enabled = enabled;
                let _ = reply.send(());
            }
        }
    }

    async fn start(&mut self) -> SessionStatus {
        if !self.coordinator.begin_start() {
            return self.coordinator.status();
        }
        self.publish_status();

        let permissions = self.resolve_permissions();
        let foreground_app = self.collaborators.foreground.foreground_app_id();

        match self.coordinator.finish_start(permissions, foreground_app) {
            StartResult::Activated => {
                if let Err(err) = self.sampler.start(
                    self.collaborators.pointer.clone(),
                    self.poll_interval,
                    self.reading_tx.clone(),
                ) {
                    log_error!("Failed to start pointer sampler: {}", err);
                    self.coordinator.stop();
                }
            }
            StartResult::Denied { show_reminder } => {
                if show_reminder {
                    self.collaborators.permissions.show_reminder(&permissions);
                }
            }
            StartResult::AlreadyRunning => {}
        }

        self.publish_status();
        self.coordinator.status()
    }

    fn resolve_permissions(&self) -> PermissionStatus {
        let status = self.collaborators.permissions.status();
        if status.all_granted() {
            return status;
        }
        log_info!("Requesting missing permissions: {:?}", status);
        self.collaborators.permissions.request_missing()
    }

    async fn stop(&mut self) -> SessionStatus {
        if self.coordinator.stop() {
            if let Err(err) = self.sampler.stop().await {
                log_warn!("Sampler did not stop cleanly: {}", err);
            }
            // Readings queued before the sampler stopped belong to the old session.
            while self.reading_rx.try_recv().is_ok() {}
            self.collaborators.presentation.hide();
            self.publish_status();
        }
        self.coordinator.status()
    }

    async fn on_reading(&mut self, reading: PositionReading) {
        let foreground_app = self.collaborators.foreground.foreground_app_id();

        match self.coordinator.on_reading(reading, foreground_app) {
            TickDecision::Inactive => {}
            TickDecision::Rejected => self.metrics.record_tick(TickOutcome::Rejected).await,
            TickDecision::Dropped => self.metrics.record_tick(TickOutcome::Dropped).await,
            TickDecision::Dispatch(ticket) => {
                self.metrics.record_tick(TickOutcome::Dispatched).await;
                self.dispatch(ticket);
            }
        }
    }

    fn dispatch(&self, ticket: InFlightTicket) {
        log_debug!(
            "Dispatching capture {} at ({:.0}, {:.0})",
            ticket.id(),
            ticket.reading().location.x,
            ticket.reading().location.y
        );
        let collaborators = self.collaborators.clone();
        let completions = self.completion_tx.clone();

        tokio::spawn(async move {
            let (ticket, result) = run_cycle(collaborators, ticket).await;
            if completions.send((ticket, result)).is_err() {
                log_debug!("Session runtime gone; dropping analysis result");
            }
        });
    }

    async fn settle(&mut self, ticket: InFlightTicket, result: AnalysisResult) {
        let mode = ticket.mode();
        let elapsed = ticket.elapsed();
        let text_regions = ticket.context().map_or(0, |c| c.text_regions.len());

        let completion = self.coordinator.complete(ticket, result);
        self.publish_usage();

        let outcome = match completion {
            Completion::Delivered { response, context } => {
                self.present_commentary(response, context);
                CycleOutcome::Delivered
            }
            Completion::Failed { error, context } => {
                self.present_failure(error, context);
                CycleOutcome::Failed
            }
            Completion::Discarded => CycleOutcome::Discarded,
        };

        let (cpu_percent, memory_mb) = self.metrics.sample_system_metrics().await;
        self.metrics
            .record_cycle(CycleMetrics {
                timestamp: Utc::now(),
                mode,
                outcome,
                total_ms: elapsed.as_millis() as u64,
                text_regions,
                cpu_percent,
                memory_mb,
            })
            .await;
    }

    fn policy(&self) -> PresentationPolicy {
        let mode_policy = self.coordinator.mode().presentation_policy();
        PresentationPolicy {
            overlay: mode_policy.overlay && self.overlay_enabled,
            voice: mode_policy.voice && self.voice_enabled,
            notification: mode_policy.notification && self.notifications_enabled,
        }
    }

    fn present_commentary(&mut self, response: AnalysisResponse, context: Option<CaptureContext>) {
        let text = response.text.trim();
        if text.is_empty() {
            log_warn!("Analysis returned empty commentary; nothing to present");
            return;
        }

        let policy = self.policy();
        let origin = if policy.overlay {
            self.show_overlay(text, context.as_ref())
        } else {
            None
        };

        if policy.voice {
            self.collaborators.voice.speak(text);
        }

        if policy.notification {
            self.collaborators.notifications.deliver(text);
        }

        let _ = self.commentary_tx.send(CommentaryEvent::Delivered {
            text: text.to_string(),
            mode: self.coordinator.mode(),
            origin,
        });
    }

    /// Shows `text` in the overlay, placed against `context` when the capture
    /// got that far. Returns the origin handed to the surface, if it asked.
    fn show_overlay(&mut self, text: &str, context: Option<&CaptureContext>) -> Option<Point> {
        let layout = self.collaborators.displays.layout();
        let hints = PlacementHints {
            cursor: self
                .coordinator
                .latest_cursor()
                .or_else(|| context.map(|c| c.cursor)),
            focus_bounds: context.and_then(CaptureContext::focus_bounds),
            text_regions: context.map_or(&[] as &[TextRegion], |c| c.text_regions.as_slice()),
        };
        let placement = &mut self.placement;
        let mut origin = None;
        self.collaborators.presentation.present(text, &mut |bubble| {
            let point = placement.place(bubble, &hints, &layout);
            origin = Some(point);
            point
        });
        origin
    }

    fn present_failure(&mut self, error: AnalysisError, context: Option<CaptureContext>) {
        log_warn!("Commentary failed: {}", error);

        if self.notifications_enabled {
            self.collaborators
                .notifications
                .deliver(&format!("Commentary failed: {error}"));
        }

        if self.policy().overlay {
            self.show_overlay(&format!("Oops, I hit a snag: {error}"), context.as_ref());
        }

        let _ = self.commentary_tx.send(CommentaryEvent::Failed { error });
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.coordinator.status());
    }

    fn publish_usage(&self) {
        self.usage_tx.send_replace(self.coordinator.usage_stats());
    }
}

/// Capture, detect and analyse around the ticket's reading. Always hands the
/// ticket back so the runtime can free the request slot.
async fn run_cycle(
    collaborators: Collaborators,
    ticket: InFlightTicket,
) -> (InFlightTicket, AnalysisResult) {
    let cursor = ticket.reading().location;
    let layout = collaborators.displays.layout();
    let Some(display) = layout.resolve(Some(cursor)).copied() else {
        return (ticket, Err(AnalysisError::Capture("no display available".into())));
    };
    let region = capture_region(cursor, display.frame, DEFAULT_CROP_SIZE);

    let images = collaborators.images.clone();
    let detector = collaborators.detector.clone();
    let captured = tokio::task::spawn_blocking(move || {
        let image = images.capture(region)?;
        let regions = TextRegion::filter_detected(detector.detect(&image));
        Ok::<_, AnalysisError>((image, regions))
    })
    .await;

    let (image, regions) = match captured {
        Ok(Ok(captured)) => captured,
        Ok(Err(err)) => return (ticket, Err(err)),
        Err(join_err) => {
            return (
                ticket,
                Err(AnalysisError::Capture(format!("capture task failed: {join_err}"))),
            )
        }
    };

    let foreground = collaborators.foreground.foreground();
    let context = CaptureContext::new(cursor, display.frame.size, foreground).with_text_regions(regions);
    let ticket = ticket.with_context(context.clone());

    let request = AnalysisRequest {
        image,
        context,
        mode: ticket.mode(),
    };
    let analysis = collaborators.analysis.clone();
    let result = match tokio::spawn(async move { analysis.analyze(request).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(AnalysisError::Transport(format!(
            "analysis task failed: {join_err}"
        ))),
    };

    (ticket, result)
}
