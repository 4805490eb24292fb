use std::sync::Arc;

use tokio::{
    sync::watch,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    detection::{CycleReport, DetectCycle},
    pause::PauseController,
    settings::Settings,
    source::PageActions,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Look at the page as it is, without reloading it.
    InPlace,
    /// Reload the page, then look.
    Refresh,
}

#[derive(Debug)]
pub enum TickOutcome {
    ManuallyPaused,
    Paused,
    Checked(CycleReport),
    Failed,
}

impl TickOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            TickOutcome::Checked(report) => Some(report),
            _ => None,
        }
    }
}

/// Everything a single tick needs. Cheap to clone into the loop task.
#[derive(Clone)]
pub struct Poller {
    settings: watch::Receiver<Settings>,
    pause: PauseController,
    page: Arc<dyn PageActions>,
    cycle: Arc<DetectCycle>,
}

impl Poller {
    pub fn new(
        settings: watch::Receiver<Settings>,
        pause: PauseController,
        page: Arc<dyn PageActions>,
        cycle: Arc<DetectCycle>,
    ) -> Self {
        Self {
            settings,
            pause,
            page,
            cycle,
        }
    }

    /// One polling step. Never refreshes while any pause is in effect; every
    /// failure degrades to skipping this tick.
    pub async fn tick(&self, kind: CheckKind) -> TickOutcome {
        let settings = self.settings.borrow().clone();

        if settings.manually_paused {
            log_debug!("Tick skipped: manually paused");
            return TickOutcome::ManuallyPaused;
        }

        if self.pause.is_active().await {
            log_debug!("Tick skipped: temporarily paused");
            return TickOutcome::Paused;
        }

        if kind == CheckKind::Refresh {
            if let Err(err) = self.page.refresh().await {
                log_warn!("Page refresh failed, skipping tick: {err:#}");
                return TickOutcome::Failed;
            }
        }

        match self.cycle.run(&settings).await {
            Ok(report) => TickOutcome::Checked(report),
            Err(err) => {
                log_error!("Lead detection failed: {err:#}");
                TickOutcome::Failed
            }
        }
    }
}

/// Ticks every `period` until cancelled. The first tick fires immediately
/// and checks in place; later ticks refresh first. A tick that has started
/// always runs to completion.
pub async fn polling_loop(poller: Poller, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut kind = CheckKind::InPlace;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("Polling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                poller.tick(kind).await;
                kind = CheckKind::Refresh;
            }
        }
    }
}
