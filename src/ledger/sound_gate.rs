use std::{collections::HashSet, sync::Arc};

use log::{error, warn};

use crate::store::{load_json, save_json, KeyLocks, KeyValueStore, KEY_SOUNDED_LEADS};

/// Remembers which leads have already been announced so each id triggers at
/// most one notification for the lifetime of the store.
#[derive(Clone)]
pub struct SoundGate {
    store: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
}

impl SoundGate {
    pub fn new(store: Arc<dyn KeyValueStore>, locks: KeyLocks) -> Self {
        Self { store, locks }
    }

    /// Returns the ids (in input order, without repeats) that were never
    /// sounded before and records them as sounded.
    pub async fn admit(&self, lead_ids: &[String]) -> Vec<String> {
        if lead_ids.is_empty() {
            return Vec::new();
        }

        let _guard = self.locks.lock(KEY_SOUNDED_LEADS).await;

        let mut sounded: Vec<String> = match load_json(self.store.as_ref(), KEY_SOUNDED_LEADS).await
        {
            Ok(sounded) => sounded,
            Err(err) => {
                // Without the current set a write would clobber it; admit
                // everything and leave the persisted set untouched.
                warn!("Sounded set unavailable, not recording this batch: {err:#}");
                let mut seen = HashSet::new();
                return lead_ids
                    .iter()
                    .filter(|id| seen.insert((*id).clone()))
                    .cloned()
                    .collect();
            }
        };

        let mut known: HashSet<String> = sounded.iter().cloned().collect();
        let admitted: Vec<String> = lead_ids
            .iter()
            .filter(|id| known.insert((*id).clone()))
            .cloned()
            .collect();

        if admitted.is_empty() {
            return admitted;
        }

        sounded.extend(admitted.iter().cloned());
        if let Err(err) = save_json(self.store.as_ref(), KEY_SOUNDED_LEADS, &sounded).await {
            error!("Failed to record sounded leads: {err:#}");
        }

        admitted
    }

    pub async fn contains(&self, lead_id: &str) -> bool {
        match load_json::<Vec<String>>(self.store.as_ref(), KEY_SOUNDED_LEADS).await {
            Ok(sounded) => sounded.iter().any(|id| id == lead_id),
            Err(err) => {
                error!("{err:#}");
                false
            }
        }
    }
}
