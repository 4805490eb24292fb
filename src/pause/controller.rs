use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    events::{EventBus, MonitorEvent},
    settings::Settings,
};

use super::{PauseMode, PauseState, PauseStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PauseSnapshot {
    pub status: PauseStatus,
    pub remaining_ms: u64,
    pub planned_ms: u64,
}

impl PauseSnapshot {
    pub fn is_active(&self) -> bool {
        self.status == PauseStatus::Paused
    }

    fn of(state: &PauseState, now: Instant) -> Self {
        Self {
            status: state.status(),
            remaining_ms: state.remaining(now).as_millis() as u64,
            planned_ms: state.planned().as_millis() as u64,
        }
    }
}

/// Sent when a pause runs out while monitoring is not manually paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeSignal {
    /// The expiry timer fired on schedule.
    Expired,
    /// A read found the deadline already passed before the timer ran.
    Overdue,
}

/// Owns the post-interaction cool-down. Whether a pause is in effect is
/// always derived from the stored deadline; the expiry timer only exists to
/// deliver the resume signal on time.
#[derive(Clone)]
pub struct PauseController {
    state: Arc<Mutex<PauseState>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    settings: watch::Receiver<Settings>,
    resume_tx: mpsc::UnboundedSender<ResumeSignal>,
    events: EventBus,
}

impl PauseController {
    pub fn new(
        settings: watch::Receiver<Settings>,
        events: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<ResumeSignal>) {
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: Arc::new(Mutex::new(PauseState::new())),
            timer: Arc::new(Mutex::new(None)),
            settings,
            resume_tx,
            events,
        };
        (controller, resume_rx)
    }

    /// Pauses for `requested`, combined with any running pause under the
    /// configured composition mode.
    pub async fn request_pause(&self, requested: Duration) -> PauseSnapshot {
        let mode = self.settings.borrow().pause_composition_mode;

        let mut state = self.state.lock().await;
        let now = Instant::now();
        let remaining = state.remaining(now);
        let planned = state.request(mode, requested, now);

        if remaining.is_zero() {
            log_info!("Pausing polling for {:.1}s", planned.as_secs_f64());
        } else {
            match mode {
                PauseMode::Reset => log_info!(
                    "Resetting pause to {:.1}s (was {:.1}s remaining)",
                    planned.as_secs_f64(),
                    remaining.as_secs_f64()
                ),
                PauseMode::Extend => log_info!(
                    "Extending pause: {:.1}s remaining + {:.1}s = {:.1}s",
                    remaining.as_secs_f64(),
                    requested.as_secs_f64(),
                    planned.as_secs_f64()
                ),
                PauseMode::Max => log_info!(
                    "Keeping longer pause: {:.1}s (was {:.1}s remaining, asked {:.1}s)",
                    planned.as_secs_f64(),
                    remaining.as_secs_f64(),
                    requested.as_secs_f64()
                ),
            }
        }

        self.spawn_timer().await;
        let snapshot = PauseSnapshot::of(&state, now);
        // Still under the lock, so the expiry event cannot overtake it.
        self.emit_changed(&snapshot);
        snapshot
    }

    /// Whether polling is currently held back by a pause. A pause whose
    /// deadline has passed is resolved here even if its timer never fired.
    pub async fn is_active(&self) -> bool {
        let mut state = self.state.lock().await;
        if self.resolve_if_due(&mut state) {
            return false;
        }
        state.is_active()
    }

    pub async fn snapshot(&self) -> PauseSnapshot {
        let mut state = self.state.lock().await;
        self.resolve_if_due(&mut state);
        PauseSnapshot::of(&state, Instant::now())
    }

    /// Drops any pause without sending the resume signal. Safe when idle.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        let was_active = state.is_active();
        state.clear();
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }

        if was_active {
            log_info!("Pause cancelled");
            self.emit_changed(&PauseSnapshot::of(&state, Instant::now()));
        }
    }

    fn resolve_if_due(&self, state: &mut PauseState) -> bool {
        if !state.is_due(Instant::now()) {
            return false;
        }
        state.clear();
        log_info!("Pause deadline passed before its timer fired; treating it as over");
        self.emit_changed(&PauseSnapshot::of(state, Instant::now()));
        send_resume(&self.settings, &self.resume_tx, ResumeSignal::Overdue);
        true
    }

    // Callers hold the state lock, so the new timer cannot observe a
    // half-applied request.
    async fn spawn_timer(&self) {
        let mut timer_guard = self.timer.lock().await;
        if let Some(handle) = timer_guard.take() {
            handle.abort();
        }

        let handle = tokio::spawn(expiry_timer(
            self.state.clone(),
            self.settings.clone(),
            self.resume_tx.clone(),
            self.events.clone(),
        ));
        *timer_guard = Some(handle);
    }

    fn emit_changed(&self, snapshot: &PauseSnapshot) {
        self.events.emit(MonitorEvent::PauseChanged {
            active: snapshot.is_active(),
            remaining_ms: snapshot.remaining_ms,
        });
    }
}

async fn expiry_timer(
    state: Arc<Mutex<PauseState>>,
    settings: watch::Receiver<Settings>,
    resume_tx: mpsc::UnboundedSender<ResumeSignal>,
    events: EventBus,
) {
    loop {
        let until = state.lock().await.until();
        let Some(until) = until else {
            return;
        };

        if Instant::now() < until {
            time::sleep_until(until).await;
            continue;
        }

        let mut guard = state.lock().await;
        if !guard.is_due(Instant::now()) {
            continue;
        }
        guard.clear();
        events.emit(MonitorEvent::PauseChanged {
            active: false,
            remaining_ms: 0,
        });
        break;
    }

    send_resume(&settings, &resume_tx, ResumeSignal::Expired);
}

fn send_resume(
    settings: &watch::Receiver<Settings>,
    resume_tx: &mpsc::UnboundedSender<ResumeSignal>,
    signal: ResumeSignal,
) {
    if settings.borrow().manually_paused {
        log_info!("Pause over; staying idle because monitoring is manually paused");
        return;
    }

    log_info!("Pause over ({:?}), resuming polling", signal);
    if resume_tx.send(signal).is_err() {
        log_debug!("Resume signal dropped: no receiver");
    }
}
