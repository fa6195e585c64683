use std::time::Instant;

use crate::geometry::Point;

/// One pointer sample. Only the gate's two reference readings outlive a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub location: Point,
    pub timestamp: Instant,
}

impl PositionReading {
    pub fn new(location: Point, timestamp: Instant) -> Self {
        Self {
            location,
            timestamp,
        }
    }

    pub fn now(location: Point) -> Self {
        Self::new(location, Instant::now())
    }

    pub fn distance_to(&self, other: &PositionReading) -> f64 {
        self.location.distance(&other.location)
    }
}
