use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::InteractionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TickOutcome {
    Rejected,
    /// Gate accepted while a request was already in flight.
    Dropped,
    Dispatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleOutcome {
    Delivered,
    Failed,
    Discarded,
}

/// One settled capture+analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetrics {
    pub timestamp: DateTime<Utc>,
    pub mode: InteractionMode,
    pub outcome: CycleOutcome,
    pub total_ms: u64,
    pub text_regions: usize,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_cycles: Vec<CycleMetrics>,
    pub tick_count: u64,
    pub accepted_count: u64,
    pub dropped_in_flight_count: u64,
    pub dispatched_count: u64,
    pub delivered_count: u64,
    pub failed_count: u64,
    pub last_latency_ms: Option<u64>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            system: SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            },
            recent_cycles: Vec::new(),
            tick_count: 0,
            accepted_count: 0,
            dropped_in_flight_count: 0,
            dispatched_count: 0,
            delivered_count: 0,
            failed_count: 0,
            last_latency_ms: None,
        }
    }
}
