pub mod display;
pub mod engine;

pub use display::{clamp_origin, Display, DisplayLayout};
pub use engine::{AnchorSource, Placement, PlacementEngine, PlacementHints};
