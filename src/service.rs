use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    detection::DetectCycle,
    events::{EventBus, MonitorEvent},
    models::LeadView,
    pause::{PauseController, PauseSnapshot, ResumeSignal},
    polling::{Poller, PollingController},
    settings::{Settings, SettingsPatch, SettingsStore},
    source::{LeadSource, Notifier, PageActions},
    store::{KeyLocks, KeyValueStore},
    utils::epoch_ms_now,
};

/// The external pieces a monitor is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub source: Arc<dyn LeadSource>,
    pub page: Arc<dyn PageActions>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub monitoring: bool,
    pub manually_paused: bool,
    pub pause: PauseSnapshot,
    pub settings: Settings,
}

/// Owns settings, the pause controller, the polling task and the detect
/// cycle, and answers control requests against them.
#[derive(Clone)]
pub struct LeadWatch {
    settings: Arc<SettingsStore>,
    pause: PauseController,
    polling: Arc<Mutex<PollingController>>,
    cycle: Arc<DetectCycle>,
    page: Arc<dyn PageActions>,
    events: EventBus,
    shutdown: CancellationToken,
    resume_listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LeadWatch {
    pub async fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            source,
            page,
            notifier,
        } = collaborators;

        let locks = KeyLocks::new();
        let events = EventBus::new();
        let settings = Arc::new(SettingsStore::load(store.clone(), locks.clone()).await);
        let (pause, resume_rx) = PauseController::new(settings.subscribe(), events.clone());

        let cycle = Arc::new(DetectCycle::new(
            store,
            locks,
            source,
            page.clone(),
            notifier,
            events.clone(),
        ));
        let poller = Poller::new(settings.subscribe(), pause.clone(), page.clone(), cycle.clone());

        let watch = Self {
            settings,
            pause,
            polling: Arc::new(Mutex::new(PollingController::new(poller))),
            cycle,
            page,
            events,
            shutdown: CancellationToken::new(),
            resume_listener: Arc::new(Mutex::new(None)),
        };

        let listener = tokio::spawn(resume_listener(watch.clone(), resume_rx));
        *watch.resume_listener.lock().await = Some(listener);
        watch
    }

    pub fn settings(&self) -> Settings {
        self.settings.current()
    }

    pub fn pause_controller(&self) -> &PauseController {
        &self.pause
    }

    pub fn detect_cycle(&self) -> &DetectCycle {
        &self.cycle
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// (Re)starts polling at the configured interval.
    pub async fn start(&self) -> Result<()> {
        let period = Duration::from_millis(self.settings.current().poll_interval_ms);
        self.polling.lock().await.start(period).await
    }

    /// Stops polling. A running pause keeps its own timer.
    pub async fn stop(&self) -> Result<()> {
        self.polling.lock().await.stop().await
    }

    pub async fn is_monitoring(&self) -> bool {
        self.polling.lock().await.is_running()
    }

    pub async fn status(&self) -> StatusReport {
        let settings = self.settings.current();
        StatusReport {
            monitoring: self.is_monitoring().await,
            manually_paused: settings.manually_paused,
            pause: self.pause.snapshot().await,
            settings,
        }
    }

    /// The filtered snapshot with each lead's first-seen instant.
    pub async fn get_leads(&self) -> Result<Vec<LeadView>> {
        let settings = self.settings.current();
        let leads = self.cycle.current_leads(&settings).await?;
        let first_seen = self.cycle.first_seen().all().await;
        let now_ms = epoch_ms_now();

        Ok(leads
            .iter()
            .map(|lead| LeadView::from_lead(lead, first_seen.get(&lead.id).copied(), now_ms))
            .collect())
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let settings = self.settings.update(patch).await;
        self.stop().await?;
        self.start().await?;
        Ok(settings)
    }

    pub async fn clear_new_indicators(&self) -> Result<()> {
        self.page.clear_new_marks().await
    }

    pub async fn pause_monitoring(&self) {
        self.settings.set_manually_paused(true).await;
        self.pause.cancel().await;
        info!("Monitoring manually paused");
    }

    pub async fn resume_monitoring(&self) -> Result<()> {
        self.settings.set_manually_paused(false).await;
        info!("Monitoring manually resumed");
        self.start().await
    }

    /// Pauses first, then asks the page to reveal the lead. `false` means the
    /// lead is gone (accepted or removed since the last snapshot).
    pub async fn scroll_to_lead(&self, lead_id: &str, pause_ms: Option<u64>) -> bool {
        let pause_ms = pause_ms
            .filter(|ms| *ms > 0)
            .unwrap_or_else(|| self.settings.current().pause_after_action_ms);
        self.pause.request_pause(Duration::from_millis(pause_ms)).await;

        match self.page.reveal_lead(lead_id).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Lead {lead_id} is no longer on the page");
                false
            }
            Err(err) => {
                warn!("Could not reveal lead {lead_id}: {err:#}");
                false
            }
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(listener) = self.resume_listener.lock().await.take() {
            let _ = listener.await;
        }
        self.pause.cancel().await;
        self.stop().await
    }
}

async fn resume_listener(watch: LeadWatch, mut resume_rx: mpsc::UnboundedReceiver<ResumeSignal>) {
    loop {
        tokio::select! {
            _ = watch.shutdown.cancelled() => break,
            signal = resume_rx.recv() => {
                let Some(signal) = signal else {
                    break;
                };
                // A running loop noticed the overdue pause itself.
                if signal == ResumeSignal::Overdue && watch.is_monitoring().await {
                    continue;
                }
                if let Err(err) = watch.start().await {
                    warn!("Failed to restart polling after pause: {err:#}");
                }
            }
        }
    }
}
