use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::collaborators::PointerSource;
use crate::models::PositionReading;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub const READING_BUFFER: usize = 64;

/// Polls `source` every `poll_interval` and forwards timestamped readings.
/// Never waits on the consumer: a full buffer drops the reading.
pub async fn sampling_loop(
    source: Arc<dyn PointerSource>,
    poll_interval: Duration,
    readings: mpsc::Sender<PositionReading>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(location) = source.location() else {
                    continue;
                };

                match readings.try_send(PositionReading::new(location, Instant::now())) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        log_debug!("reading buffer full; dropping pointer sample");
                    }
                    Err(TrySendError::Closed(_)) => {
                        log_info!("reading consumer gone; sampler exiting");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampler shutting down");
                break;
            }
        }
    }
}
