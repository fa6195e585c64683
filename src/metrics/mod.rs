mod types;

pub use types::{CycleMetrics, CycleOutcome, MetricsSnapshot, SystemMetrics, TickOutcome};

use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_CYCLES: usize = 20;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_cycles: Vec<CycleMetrics>,
    tick_count: u64,
    accepted_count: u64,
    dropped_in_flight_count: u64,
    dispatched_count: u64,
    delivered_count: u64,
    failed_count: u64,
    last_latency_ms: Option<u64>,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_cycles: Vec::with_capacity(MAX_RECENT_CYCLES),
                tick_count: 0,
                accepted_count: 0,
                dropped_in_flight_count: 0,
                dispatched_count: 0,
                delivered_count: 0,
                failed_count: 0,
                last_latency_ms: None,
                system,
                pid,
            })),
        }
    }

    /// Current process CPU and resident memory (MB). CPU needs two samples
    /// some time apart before it reads non-zero.
    pub async fn sample_system_metrics(&self) -> (f32, f64) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        if let Some(process) = state.system.process(pid) {
            (
                process.cpu_usage(),
                process.memory() as f64 / 1024.0 / 1024.0,
            )
        } else {
            (0.0, 0.0)
        }
    }

    pub async fn record_tick(&self, outcome: TickOutcome) {
        let mut state = self.inner.lock().await;
        state.tick_count += 1;
        match outcome {
            TickOutcome::Rejected => {}
            TickOutcome::Dropped => {
                state.accepted_count += 1;
                state.dropped_in_flight_count += 1;
            }
            TickOutcome::Dispatched => {
                state.accepted_count += 1;
                state.dispatched_count += 1;
            }
        }
    }

    pub async fn record_cycle(&self, metrics: CycleMetrics) {
        let mut state = self.inner.lock().await;

        match metrics.outcome {
            CycleOutcome::Delivered => state.delivered_count += 1,
            CycleOutcome::Failed => state.failed_count += 1,
            CycleOutcome::Discarded => {}
        }
        state.last_latency_ms = Some(metrics.total_ms);

        state.recent_cycles.push(metrics);

        if state.recent_cycles.len() > MAX_RECENT_CYCLES {
            state.recent_cycles.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;

        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system_metrics = if let Some(process) = state.system.process(pid) {
            SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            }
        } else {
            SystemMetrics {
                cpu_percent: 0.0,
                memory_mb: 0.0,
            }
        };

        MetricsSnapshot {
            system: system_metrics,
            recent_cycles: state.recent_cycles.clone(),
            tick_count: state.tick_count,
            accepted_count: state.accepted_count,
            dropped_in_flight_count: state.dropped_in_flight_count,
            dispatched_count: state.dispatched_count,
            delivered_count: state.delivered_count,
            failed_count: state.failed_count,
            last_latency_ms: state.last_latency_ms,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.recent_cycles.clear();
        state.tick_count = 0;
        state.accepted_count = 0;
        state.dropped_in_flight_count = 0;
        state.dispatched_count = 0;
        state.delivered_count = 0;
        state.failed_count = 0;
        state.last_latency_ms = None;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
