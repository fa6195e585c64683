pub mod config;
pub mod context;
pub mod gate;
pub mod region;

pub use config::{GateConfig, GateProfiles};
pub use context::{CaptureContext, ForegroundContext};
pub use gate::CaptureGate;
pub use region::{capture_region, DEFAULT_CROP_SIZE};
