pub mod hotspot;
pub mod mode;
pub mod reading;
pub mod usage;

pub use hotspot::TextRegion;
pub use mode::{InteractionMode, PresentationPolicy};
pub use reading::PositionReading;
pub use usage::{TokenUsage, TokenUsageStats, UsageAccumulator};
