pub mod coordinator;
pub mod runtime;
pub mod state;

pub use coordinator::{Completion, SessionCoordinator, StartResult, TickDecision};
pub use runtime::{CommentaryEvent, SessionHandle, SessionRuntime};
pub use state::{InFlightTicket, RequestSlot, SessionStatus};
