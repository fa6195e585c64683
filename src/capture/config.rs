use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::InteractionMode;

/// Throttling thresholds for the capture gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Hard floor between two accepted captures.
    pub min_interval_secs: f64,

    /// Staleness fallback; zero or negative disables it.
    pub max_interval_secs: f64,

    /// Pointer travel (in points) that counts as movement.
    pub min_movement: f64,
}

impl GateConfig {
    pub const CASUAL: GateConfig = GateConfig {
        min_interval_secs: 5.0,
        max_interval_secs: 60.0,
        min_movement: 40.0,
    };

    pub const FOCUS: GateConfig = GateConfig {
        min_interval_secs: 12.0,
        max_interval_secs: 90.0,
        min_movement: 60.0,
    };

    pub const ACCESSIBILITY: GateConfig = GateConfig {
        min_interval_secs: 6.0,
        max_interval_secs: 75.0,
        min_movement: 40.0,
    };

    pub fn new(min_interval: Duration, max_interval: Duration, min_movement: f64) -> Self {
        Self {
            min_interval_secs: min_interval.as_secs_f64(),
            max_interval_secs: max_interval.as_secs_f64(),
            min_movement,
        }
    }

    pub fn min_interval(&self) -> Duration {
        non_negative_duration(self.min_interval_secs)
    }

    /// `None` when the staleness fallback is disabled.
    pub fn staleness_limit(&self) -> Option<Duration> {
        if self.max_interval_secs > 0.0 {
            Some(non_negative_duration(self.max_interval_secs))
        } else {
            None
        }
    }

    pub fn min_movement(&self) -> f64 {
        if self.min_movement.is_nan() {
            0.0
        } else {
            self.min_movement.max(0.0)
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::CASUAL
    }
}

fn non_negative_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO)
}

/// One gate configuration per interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateProfiles {
    pub casual: GateConfig,
    pub focus: GateConfig,
    pub accessibility: GateConfig,
}

impl GateProfiles {
    pub fn for_mode(&self, mode: InteractionMode) -> GateConfig {
        match mode {
            InteractionMode::Casual => self.casual,
            InteractionMode::Focus => self.focus,
            InteractionMode::Accessibility => self.accessibility,
        }
    }

    /// Every mode shares the same thresholds.
    pub fn uniform(config: GateConfig) -> Self {
        Self {
            casual: config,
            focus: config,
            accessibility: config,
        }
    }
}

impl Default for GateProfiles {
    fn default() -> Self {
        Self {
            casual: GateConfig::CASUAL,
            focus: GateConfig::FOCUS,
            accessibility: GateConfig::ACCESSIBILITY,
        }
    }
}
