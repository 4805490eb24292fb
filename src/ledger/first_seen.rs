use std::{collections::HashMap, sync::Arc};

use log::{error, warn};

use crate::store::{
    load_json, load_or_default, save_json, KeyLocks, KeyValueStore, KEY_FIRST_SEEN,
};

pub type FirstSeenMap = HashMap<String, i64>;

/// Write-once record of when each lead id was first observed, in epoch ms.
#[derive(Clone)]
pub struct FirstSeenLedger {
    store: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
}

impl FirstSeenLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, locks: KeyLocks) -> Self {
        Self { store, locks }
    }

    /// Stamps `now_ms` on every id that has no entry yet. Existing entries
    /// are never overwritten. Returns the ids that were stamped.
    pub async fn record(&self, lead_ids: &[String], now_ms: i64) -> Vec<String> {
        if lead_ids.is_empty() {
            return Vec::new();
        }

        let _guard = self.locks.lock(KEY_FIRST_SEEN).await;

        let mut map: FirstSeenMap = match load_json(self.store.as_ref(), KEY_FIRST_SEEN).await {
            Ok(map) => map,
            Err(err) => {
                warn!("First-seen map unavailable, skipping this batch: {err:#}");
                return Vec::new();
            }
        };

        let mut stamped = Vec::new();
        for id in lead_ids {
            if !map.contains_key(id) {
                map.insert(id.clone(), now_ms);
                stamped.push(id.clone());
            }
        }

        if !stamped.is_empty() {
            if let Err(err) = save_json(self.store.as_ref(), KEY_FIRST_SEEN, &map).await {
                error!("Failed to record first-seen timestamps: {err:#}");
            }
        }

        stamped
    }

    pub async fn all(&self) -> FirstSeenMap {
        load_or_default(self.store.as_ref(), KEY_FIRST_SEEN).await
    }

    pub async fn get(&self, lead_id: &str) -> Option<i64> {
        self.all().await.get(lead_id).copied()
    }
}
