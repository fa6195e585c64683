use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::collaborators::PointerSource;
use crate::models::PositionReading;

use super::sampler::sampling_loop;

/// Owns the sampler task for the lifetime of one active session.
pub struct SamplerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        source: Arc<dyn PointerSource>,
        poll_interval: Duration,
        readings: mpsc::Sender<PositionReading>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sampler already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            source,
            poll_interval,
            readings,
            cancel_token.clone(),
        ));

        info!("Sampler started ({}ms cadence)", poll_interval.as_millis());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampler task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SamplerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    struct Fixed;

    impl PointerSource for Fixed {
        fn location(&self) -> Option<Point> {
            Some(Point::new(5.0, 5.0))
        }
    }

    #[tokio::test]
    async fn refuses_double_start_and_stops_cleanly() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut controller = SamplerController::new();

        controller
            .start(Arc::new(Fixed), Duration::from_millis(5), tx.clone())
            .unwrap();
        assert!(controller.is_running());
        assert!(controller
            .start(Arc::new(Fixed), Duration::from_millis(5), tx)
            .is_err());

        assert!(rx.recv().await.is_some());

        controller.stop().await.unwrap();
        assert!(!controller.is_running());
        // Stopping twice is harmless.
        controller.stop().await.unwrap();
    }
}
