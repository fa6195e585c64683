pub mod capture;
pub mod collaborators;
pub mod geometry;
pub mod metrics;
pub mod models;
pub mod placement;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

pub use capture::{CaptureContext, CaptureGate, ForegroundContext, GateConfig, GateProfiles};
pub use collaborators::{AnalysisError, AnalysisProvider, Collaborators, LocalAnalysisProvider};
pub use geometry::{Point, Rect, Size};
pub use models::{InteractionMode, PositionReading, TextRegion, TokenUsage, TokenUsageStats};
pub use placement::{Display, DisplayLayout, PlacementEngine, PlacementHints};
pub use session::{CommentaryEvent, SessionCoordinator, SessionHandle, SessionRuntime, SessionStatus};
pub use settings::{CompanionSettings, SettingsStore};
pub use utils::logging::init_logging;
