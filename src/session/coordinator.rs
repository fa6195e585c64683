//! Synchronous heart of a session: lifecycle, mode, gate, request slot and
//! usage totals. Only the runtime's event loop calls into it, so nothing
//! here is shared or locked.

use log::{debug, info, warn};

use super::state::{InFlightTicket, RequestSlot, SessionStatus};
use crate::capture::{CaptureContext, CaptureGate, GateProfiles};
use crate::collaborators::{AnalysisError, AnalysisResponse, PermissionStatus};
use crate::geometry::Point;
use crate::models::{InteractionMode, PositionReading, TokenUsageStats, UsageAccumulator};

/// What the loop should do with one pointer reading.
#[derive(Debug)]
pub enum TickDecision {
    /// Session isn't active.
    Inactive,
    /// The gate said no.
    Rejected,
    /// The gate said yes but a request is still outstanding.
    Dropped,
    Dispatch(InFlightTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    AlreadyRunning,
    Activated,
    /// `show_reminder` is true only the first time this happens.
    Denied { show_reminder: bool },
}

/// A settled request, as seen by the result handler.
#[derive(Debug)]
pub enum Completion {
    Delivered {
        response: AnalysisResponse,
        context: Option<CaptureContext>,
    },
    Failed {
        error: AnalysisError,
        context: Option<CaptureContext>,
    },
    /// Settled after the session stopped; nobody is listening.
    Discarded,
}

pub struct SessionCoordinator {
    status: SessionStatus,
    mode: InteractionMode,
    mode_epoch: u64,
    session_epoch: u64,
    profiles: GateProfiles,
    gate: CaptureGate,
    slot: RequestSlot,
    usage: UsageAccumulator,
    reminder_shown: bool,
    foreground_app: Option<String>,
    latest_cursor: Option<Point>,
}

impl SessionCoordinator {
    pub fn new(mode: InteractionMode, profiles: GateProfiles) -> Self {
        Self {
            status: SessionStatus::Stopped,
            mode,
            mode_epoch: 0,
            session_epoch: 0,
            profiles,
            gate: CaptureGate::new(profiles.for_mode(mode)),
            slot: RequestSlot::Idle,
            usage: UsageAccumulator::new(),
            reminder_shown: false,
            foreground_app: None,
            latest_cursor: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    pub fn usage_stats(&self) -> Option<TokenUsageStats> {
        self.usage.stats()
    }

    pub fn latest_cursor(&self) -> Option<Point> {
        self.latest_cursor
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.slot.is_busy()
    }

    /// Moves `Stopped -> Starting`. Returns false if already starting or active.
    pub fn begin_start(&mut self) -> bool {
        if self.status != SessionStatus::Stopped {
            return false;
        }
        self.status = SessionStatus::Starting;
        true
    }

    /// Resolves `Starting` once the permission check has run.
    pub fn finish_start(
        &mut self,
        permissions: PermissionStatus,
        foreground_app: Option<String>,
    ) -> StartResult {
        if self.status != SessionStatus::Starting {
            return StartResult::AlreadyRunning;
        }

        if !permissions.all_granted() {
            warn!("Required permissions missing; capture pipeline remains inactive");
            self.status = SessionStatus::Stopped;
            let show_reminder = !self.reminder_shown;
            self.reminder_shown = true;
            return StartResult::Denied { show_reminder };
        }

        info!("Starting capture pipeline in {} mode", self.mode);
        self.gate.reset();
        self.foreground_app = foreground_app;
        self.status = SessionStatus::Active;
        StartResult::Activated
    }

    /// Any state to `Stopped`. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if self.status == SessionStatus::Stopped {
            return false;
        }
        info!("Stopping capture pipeline");
        self.gate.reset();
        self.session_epoch = self.session_epoch.wrapping_add(1);
        self.status = SessionStatus::Stopped;
        true
    }

    /// Swaps gate thresholds and zeroes usage. Placement memory is untouched.
    pub fn set_mode(&mut self, mode: InteractionMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.mode_epoch = self.mode_epoch.wrapping_add(1);
        self.gate.reconfigure(self.profiles.for_mode(mode));
        self.usage.reset();
        info!("Interaction mode switched to {}", mode);
        true
    }

    /// Resets the gate when the foreground application changed. Only
    /// meaningful while active.
    pub fn observe_foreground(&mut self, app_id: Option<String>) -> bool {
        if self.status != SessionStatus::Active || app_id == self.foreground_app {
            return false;
        }
        debug!(
            "Foreground app changed ({:?} -> {:?}); resetting capture gate",
            self.foreground_app, app_id
        );
        self.foreground_app = app_id;
        self.gate.reset();
        true
    }

    pub fn on_reading(&mut self, reading: PositionReading, foreground_app: Option<String>) -> TickDecision {
        if self.status != SessionStatus::Active {
            return TickDecision::Inactive;
        }

        self.latest_cursor = Some(reading.location);
        self.observe_foreground(foreground_app);

        if !self.gate.evaluate(reading) {
            return TickDecision::Rejected;
        }

        match self.slot.claim(self.mode, self.mode_epoch, self.session_epoch, reading) {
            Some(ticket) => TickDecision::Dispatch(ticket),
            None => {
                info!("Skipping capture; a previous request is still processing");
                TickDecision::Dropped
            }
        }
    }

    /// Hands a ticket back with its outcome. Always frees the slot.
    pub fn complete(
        &mut self,
        ticket: InFlightTicket,
        result: Result<AnalysisResponse, AnalysisError>,
    ) -> Completion {
        if !self.slot.release(&ticket) {
            warn!("Completion for unknown request {}", ticket.id());
        }

        if let Ok(response) = &result {
            match response.usage {
                Some(usage) if ticket.mode_epoch() == self.mode_epoch => self.usage.record(usage),
                Some(_) => debug!("Dropping usage from request issued under a previous mode"),
                None => {}
            }
        }

        if self.status != SessionStatus::Active || ticket.session_epoch() != self.session_epoch {
            debug!("Discarding result of request {} after stop", ticket.id());
            return Completion::Discarded;
        }

        let context = ticket.into_context();
        match result {
            Ok(response) => Completion::Delivered { response, context },
            Err(error) => Completion::Failed { error, context },
        }
    }
}
