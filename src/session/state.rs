use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::capture::CaptureContext;
use crate::models::{InteractionMode, PositionReading};

/// Session lifecycle: `Stopped -> Starting -> Active -> Stopped`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Stopped,
    Starting,
    Active,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Stopped => "Stopped",
            SessionStatus::Starting => "Starting",
            SessionStatus::Active => "Active",
        }
    }
}

/// Proof that the request slot was claimed. Not `Clone`: exactly one ticket
/// exists per outstanding request, and handing it back is the only way to
/// free the slot.
#[derive(Debug)]
pub struct InFlightTicket {
    id: Uuid,
    mode: InteractionMode,
    mode_epoch: u64,
    session_epoch: u64,
    reading: PositionReading,
    dispatched_at: Instant,
    context: Option<CaptureContext>,
}

impl InFlightTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn mode_epoch(&self) -> u64 {
        self.mode_epoch
    }

    /// Which activation of the session issued the request.
    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn reading(&self) -> &PositionReading {
        &self.reading
    }

    pub fn context(&self) -> Option<&CaptureContext> {
        self.context.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.dispatched_at.elapsed()
    }

    /// Attaches the capture the request was built from, so the response is
    /// placed against the screen it describes.
    pub fn with_context(self, context: CaptureContext) -> Self {
        Self {
            context: Some(context),
            ..self
        }
    }

    pub(crate) fn into_context(self) -> Option<CaptureContext> {
        self.context
    }
}

/// Single-slot guard for the outbound analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSlot {
    #[default]
    Idle,
    Busy(Uuid),
}

impl RequestSlot {
    pub fn is_busy(&self) -> bool {
        matches!(self, RequestSlot::Busy(_))
    }

    pub fn claim(
        &mut self,
        mode: InteractionMode,
        mode_epoch: u64,
        session_epoch: u64,
        reading: PositionReading,
    ) -> Option<InFlightTicket> {
        if self.is_busy() {
            return None;
        }

        let id = Uuid::new_v4();
        *self = RequestSlot::Busy(id);
        Some(InFlightTicket {
            id,
            mode,
            mode_epoch,
            session_epoch,
            reading,
            dispatched_at: Instant::now(),
            context: None,
        })
    }

    /// Frees the slot if `ticket` is the one holding it.
    pub fn release(&mut self, ticket: &InFlightTicket) -> bool {
        match *self {
            RequestSlot::Busy(id) if id == ticket.id => {
                *self = RequestSlot::Idle;
                true
            }
            _ => false,
        }
    }
}
