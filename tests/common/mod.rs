#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use leadwatch::{
    detection::DetectCycle,
    events::EventBus,
    models::Lead,
    service::{Collaborators, LeadWatch},
    source::{LeadSource, Notifier, PageActions},
    store::{KeyLocks, KeyValueStore, MemoryStore},
};
use serde_json::Value;
use tokio::time::Instant;

pub const BOND_CLEAN: &str = "Rental Bond Cleaning";

pub fn lead(id: &str) -> Lead {
    Lead::new(id, BOND_CLEAN)
}

pub fn lead_in(id: &str, category: &str) -> Lead {
    Lead::new(id, category)
}

#[derive(Default)]
pub struct FakeSource {
    leads: Mutex<Vec<Lead>>,
    failing: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    snapshots: Mutex<usize>,
}

impl FakeSource {
    pub fn with(leads: Vec<Lead>) -> Arc<Self> {
        let source = Self::default();
        *source.leads.lock().unwrap() = leads;
        Arc::new(source)
    }

    pub fn set_leads(&self, leads: Vec<Lead>) {
        *self.leads.lock().unwrap() = leads;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Makes every snapshot take `delay`, as a slow page would.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn snapshots(&self) -> usize {
        *self.snapshots.lock().unwrap()
    }
}

#[async_trait]
impl LeadSource for FakeSource {
    async fn snapshot(&self) -> Result<Vec<Lead>> {
        *self.snapshots.lock().unwrap() += 1;
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("page is not ready"));
        }
        Ok(self.leads.lock().unwrap().clone())
    }
}

/// Records every page side effect. `reveal_lead` answers from the source.
pub struct FakePage {
    source: Arc<FakeSource>,
    refreshes: Mutex<usize>,
    revealed: Mutex<Vec<String>>,
    marked: Mutex<Vec<String>>,
    clears: Mutex<usize>,
}

impl FakePage {
    pub fn new(source: Arc<FakeSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            refreshes: Mutex::new(0),
            revealed: Mutex::new(Vec::new()),
            marked: Mutex::new(Vec::new()),
            clears: Mutex::new(0),
        })
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }

    pub fn revealed(&self) -> Vec<String> {
        self.revealed.lock().unwrap().clone()
    }

    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

#[async_trait]
impl PageActions for FakePage {
    async fn refresh(&self) -> Result<()> {
        *self.refreshes.lock().unwrap() += 1;
        Ok(())
    }

    async fn reveal_lead(&self, lead_id: &str) -> Result<bool> {
        let present = self
            .source
            .snapshot()
            .await?
            .iter()
            .any(|lead| lead.id == lead_id);
        if present {
            self.revealed.lock().unwrap().push(lead_id.to_string());
        }
        Ok(present)
    }

    async fn mark_new(&self, lead_ids: &[String]) -> Result<()> {
        self.marked.lock().unwrap().extend_from_slice(lead_ids);
        Ok(())
    }

    async fn clear_new_marks(&self) -> Result<()> {
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    played: Mutex<Vec<(String, Instant)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn played(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn played_at(&self) -> Vec<Instant> {
        self.played.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, lead_id: &str) -> Result<()> {
        self.played
            .lock()
            .unwrap()
            .push((lead_id.to_string(), Instant::now()));
        Ok(())
    }
}

/// Every read and write fails.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Err(anyhow!("storage unavailable reading {key}"))
    }

    async fn set(&self, key: &str, _value: Value) -> Result<()> {
        Err(anyhow!("storage unavailable writing {key}"))
    }
}

/// Reads succeed from an inner memory store, writes to listed keys fail.
pub struct ReadOnlyKeys {
    inner: MemoryStore,
    blocked: HashSet<String>,
}

impl ReadOnlyKeys {
    pub fn new(blocked: &[&str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            blocked: blocked.iter().map(|key| key.to_string()).collect(),
        }
    }
}

#[async_trait]
impl KeyValueStore for ReadOnlyKeys {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.blocked.contains(key) {
            return Err(anyhow!("write to {key} rejected"));
        }
        self.inner.set(key, value).await
    }
}

pub struct CycleHarness {
    pub store: Arc<dyn KeyValueStore>,
    pub source: Arc<FakeSource>,
    pub page: Arc<FakePage>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: EventBus,
    pub cycle: Arc<DetectCycle>,
}

impl CycleHarness {
    pub fn new(store: Arc<dyn KeyValueStore>, leads: Vec<Lead>) -> Self {
        let source = FakeSource::with(leads);
        let page = FakePage::new(source.clone());
        let notifier = RecordingNotifier::new();
        let events = EventBus::new();
        let cycle = Arc::new(DetectCycle::new(
            store.clone(),
            KeyLocks::new(),
            source.clone(),
            page.clone(),
            notifier.clone(),
            events.clone(),
        ));

        Self {
            store,
            source,
            page,
            notifier,
            events,
            cycle,
        }
    }

    pub fn in_memory(leads: Vec<Lead>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), leads)
    }
}

pub struct WatchHarness {
    pub store: Arc<dyn KeyValueStore>,
    pub source: Arc<FakeSource>,
    pub page: Arc<FakePage>,
    pub notifier: Arc<RecordingNotifier>,
    pub watch: LeadWatch,
}

impl WatchHarness {
    pub async fn new(store: Arc<dyn KeyValueStore>, leads: Vec<Lead>) -> Self {
        let source = FakeSource::with(leads);
        let page = FakePage::new(source.clone());
        let notifier = RecordingNotifier::new();
        let watch = LeadWatch::new(Collaborators {
            store: store.clone(),
            source: source.clone(),
            page: page.clone(),
            notifier: notifier.clone(),
        })
        .await;

        Self {
            store,
            source,
            page,
            notifier,
            watch,
        }
    }

    pub async fn in_memory(leads: Vec<Lead>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), leads).await
    }
}
