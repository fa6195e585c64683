//! Capture gate: decides, per pointer sample, whether a capture+analysis
//! cycle should run.
//!
//! Rules, in order:
//! 1. The first reading after a reset always fires.
//! 2. Nothing fires before `min_interval` has elapsed since the last capture.
//! 3. Movement of at least `min_movement` from the movement reference fires
//!    and advances both references.
//! 4. Otherwise, once `max_interval` has elapsed, the staleness fallback fires
//!    and advances only the capture reference.
//!
//! Independently of the outcome, the movement reference follows the pointer
//! whenever it travels at least `min_movement` from it, even on ticks that
//! were rejected by the floor.

use super::config::GateConfig;
use crate::models::PositionReading;

#[derive(Debug, Clone)]
pub struct CaptureGate {
    config: GateConfig,
    last_capture: Option<PositionReading>,
    last_movement: Option<PositionReading>,
}

impl CaptureGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_capture: None,
            last_movement: None,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Swaps thresholds and forgets both references.
    pub fn reconfigure(&mut self, config: GateConfig) {
        self.config = config;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.last_capture = None;
        self.last_movement = None;
    }

    pub fn last_capture(&self) -> Option<&PositionReading> {
        self.last_capture.as_ref()
    }

    pub fn last_movement(&self) -> Option<&PositionReading> {
        self.last_movement.as_ref()
    }

    /// Timestamps must be non-decreasing across calls.
    pub fn evaluate(&mut self, reading: PositionReading) -> bool {
        let accepted = self.decide(reading);
        self.follow_movement(reading);
        accepted
    }

    fn decide(&mut self, reading: PositionReading) -> bool {
        let Some(last_capture) = self.last_capture else {
            self.last_capture = Some(reading);
            self.last_movement = Some(reading);
            return true;
        };

        let elapsed = reading
            .timestamp
            .saturating_duration_since(last_capture.timestamp);
        if elapsed < self.config.min_interval() {
            return false;
        }

        if let Some(last_movement) = self.last_movement {
            if reading.distance_to(&last_movement) >= self.config.min_movement() {
                self.last_capture = Some(reading);
                self.last_movement = Some(reading);
                return true;
            }
        }

        if let Some(limit) = self.config.staleness_limit() {
            if elapsed >= limit {
                // Movement reference stays put so jitter can't restart the clock.
                self.last_capture = Some(reading);
                return true;
            }
        }

        false
    }

    fn follow_movement(&mut self, reading: PositionReading) {
        match self.last_movement {
            Some(previous) if reading.distance_to(&previous) < self.config.min_movement() => {}
            _ => self.last_movement = Some(reading),
        }
    }
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
