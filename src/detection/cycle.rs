use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    events::{EventBus, MonitorEvent},
    ledger::{FirstSeenLedger, SoundGate},
    models::{Lead, StoredLead},
    settings::Settings,
    source::{LeadSource, Notifier, PageActions},
    store::{load_or_default, save_json, KeyLocks, KeyValueStore, KEY_LEADS},
    utils::epoch_ms_now,
};

use super::{dedupe_by_id, diff, CategoryFilter};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Gap between consecutive notifications so sounds do not overlap.
pub const NOTIFY_STAGGER: Duration = Duration::from_millis(400);

/// What one detect cycle saw and did.
#[derive(Debug)]
pub struct CycleReport {
    pub observed: usize,
    pub new_leads: Vec<Lead>,
    pub sounded: Vec<String>,
    /// Staggered notification playback, still running when the report is returned.
    pub playback: Option<JoinHandle<()>>,
}

impl CycleReport {
    pub fn new_ids(&self) -> Vec<&str> {
        self.new_leads.iter().map(|lead| lead.id.as_str()).collect()
    }
}

/// snapshot -> category filter -> diff against the stored baseline ->
/// first-seen stamps -> sound gate + notifications -> new baseline.
pub struct DetectCycle {
    store: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
    source: Arc<dyn LeadSource>,
    page: Arc<dyn PageActions>,
    notifier: Arc<dyn Notifier>,
    sound_gate: SoundGate,
    first_seen: FirstSeenLedger,
    events: EventBus,
}

impl DetectCycle {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        locks: KeyLocks,
        source: Arc<dyn LeadSource>,
        page: Arc<dyn PageActions>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
    ) -> Self {
        Self {
            sound_gate: SoundGate::new(store.clone(), locks.clone()),
            first_seen: FirstSeenLedger::new(store.clone(), locks.clone()),
            store,
            locks,
            source,
            page,
            notifier,
            events,
        }
    }

    pub fn first_seen(&self) -> &FirstSeenLedger {
        &self.first_seen
    }

    pub fn sound_gate(&self) -> &SoundGate {
        &self.sound_gate
    }

    /// The snapshot as the monitor sees it: filtered by category and with
    /// repeated ids collapsed onto their first occurrence.
    pub async fn current_leads(&self, settings: &Settings) -> Result<Vec<Lead>> {
        let snapshot = self
            .source
            .snapshot()
            .await
            .context("lead source failed to produce a snapshot")?;
        let filter = CategoryFilter::new(&settings.category_filters);
        Ok(filter.apply(dedupe_by_id(&snapshot)))
    }

    /// Fails only when the source cannot produce a snapshot; store trouble
    /// is logged and the cycle carries on with defaults.
    pub async fn run(&self, settings: &Settings) -> Result<CycleReport> {
        let current = self.current_leads(settings).await?;

        let baseline_guard = self.locks.lock(KEY_LEADS).await;
        let previous: Vec<StoredLead> = load_or_default(self.store.as_ref(), KEY_LEADS).await;
        let found = diff(&current, &previous);
        let new_ids = found.ids();

        if !found.is_empty() {
            self.first_seen.record(&new_ids, epoch_ms_now()).await;
            if let Err(err) = self.page.mark_new(&new_ids).await {
                log_warn!("Failed to mark new leads on the page: {err:#}");
            }
        }

        let (sounded, playback) = if settings.sound_enabled && !found.is_empty() {
            let admitted = self.sound_gate.admit(&new_ids).await;
            let playback = if admitted.is_empty() {
                None
            } else {
                log_info!("Playing {} notification(s)", admitted.len());
                Some(self.spawn_playback(admitted.clone()))
            };
            (admitted, playback)
        } else {
            (Vec::new(), None)
        };

        let baseline: Vec<StoredLead> = current.iter().map(Lead::to_stored).collect();
        if let Err(err) = save_json(self.store.as_ref(), KEY_LEADS, &baseline).await {
            log_error!("Failed to save lead baseline: {err:#}");
        }
        drop(baseline_guard);

        if !found.is_empty() {
            log_info!("Found {} new lead(s): {}", found.new_leads.len(), new_ids.join(", "));
            self.events.emit(MonitorEvent::NewLeadsDetected {
                count: found.new_leads.len(),
                leads: found.new_leads.iter().map(Lead::to_summary).collect(),
            });
        }

        Ok(CycleReport {
            observed: current.len(),
            new_leads: found.new_leads,
            sounded,
            playback,
        })
    }

    fn spawn_playback(&self, lead_ids: Vec<String>) -> JoinHandle<()> {
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            for (index, lead_id) in lead_ids.iter().enumerate() {
                time::sleep_until(start + NOTIFY_STAGGER * index as u32).await;
                if let Err(err) = notifier.notify(lead_id).await {
                    log_warn!("Notification for lead {lead_id} failed: {err:#}");
                }
            }
        })
    }
}
