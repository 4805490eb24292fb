use anyhow::{Context, Result};
use tokio::{task::JoinHandle, time::Duration};
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::log_info;

use super::loop_worker::{polling_loop, Poller};

/// Sole owner of the polling task. `start` replaces any running loop, so
/// two loops never run at once.
pub struct PollingController {
    poller: Poller,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    period: Option<Duration>,
}

impl PollingController {
    pub fn new(poller: Poller) -> Self {
        Self {
            poller,
            handle: None,
            cancel_token: None,
            period: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub async fn start(&mut self, period: Duration) -> Result<()> {
        if self.handle.is_some() {
            log_info!("Stopping running polling loop before restart");
            self.stop().await?;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            self.poller.clone(),
            period,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.period = Some(period);
        log_info!("Polling started every {:.1}s", period.as_secs_f64());
        Ok(())
    }

    /// Cancels the loop and waits for it to wind down. A tick already in
    /// progress finishes first. No-op when nothing is running.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.period = None;

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("polling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}
