use std::sync::Arc;

use log::{error, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::{
    pause::PauseMode,
    store::{load_or_default, save_json, KeyLocks, KeyValueStore, KEY_SETTINGS},
};

pub const DEFAULT_CATEGORY_FILTER: &str = "Rental Bond Cleaning";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_PAUSE_AFTER_ACTION_MS: u64 = 20_000;

const POLL_INTERVAL_RANGE_MS: (u64, u64) = (3_000, 300_000);
const PAUSE_AFTER_ACTION_RANGE_MS: (u64, u64) = (5_000, 300_000);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub pause_after_action_ms: u64,
    pub category_filters: Vec<String>,
    pub sound_enabled: bool,
    pub manually_paused: bool,
    pub pause_composition_mode: PauseMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            pause_after_action_ms: DEFAULT_PAUSE_AFTER_ACTION_MS,
            category_filters: vec![DEFAULT_CATEGORY_FILTER.to_string()],
            sound_enabled: true,
            manually_paused: false,
            pause_composition_mode: PauseMode::Reset,
        }
    }
}

impl Settings {
    /// Builds settings from whatever was persisted, taking defaults for any
    /// field that is missing or has the wrong shape.
    pub fn from_stored(value: Option<&Value>) -> Self {
        let mut settings = Self::default();
        if let Some(value) = value {
            settings.apply(SettingsPatch::from_value(value));
        }
        settings
    }

    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(value) = patch.poll_interval_ms {
            self.poll_interval_ms = value;
        }
        if let Some(value) = patch.pause_after_action_ms {
            self.pause_after_action_ms = value;
        }
        if let Some(filters) = patch.category_filters {
            self.category_filters = filters;
        }
        if let Some(value) = patch.sound_enabled {
            self.sound_enabled = value;
        }
        if let Some(value) = patch.manually_paused {
            self.manually_paused = value;
        }
        if let Some(mode) = patch.pause_composition_mode {
            self.pause_composition_mode = mode;
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.poll_interval_ms = self
            .poll_interval_ms
            .clamp(POLL_INTERVAL_RANGE_MS.0, POLL_INTERVAL_RANGE_MS.1);
        self.pause_after_action_ms = self
            .pause_after_action_ms
            .clamp(PAUSE_AFTER_ACTION_RANGE_MS.0, PAUSE_AFTER_ACTION_RANGE_MS.1);
        self.category_filters = normalize_filters(&self.category_filters);
    }
}

/// Trims, drops empties and case-insensitive duplicates. Never returns an
/// empty list.
pub fn normalize_filters(filters: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let normalized: Vec<String> = filters
        .iter()
        .map(|filter| filter.trim())
        .filter(|filter| !filter.is_empty())
        .filter(|filter| seen.insert(filter.to_lowercase()))
        .map(str::to_string)
        .collect();

    if normalized.is_empty() {
        vec![DEFAULT_CATEGORY_FILTER.to_string()]
    } else {
        normalized
    }
}

/// A partial settings update. Unset fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub poll_interval_ms: Option<u64>,
    pub pause_after_action_ms: Option<u64>,
    pub category_filters: Option<Vec<String>>,
    pub sound_enabled: Option<bool>,
    pub manually_paused: Option<bool>,
    pub pause_composition_mode: Option<PauseMode>,
}

impl SettingsPatch {
    /// Reads a patch from loosely shaped JSON, one field at a time. Older
    /// key names (`refreshInterval`, `pauseAfterClick`, `enableSound`,
    /// `isPaused`, `pauseMode`) are accepted too.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            warn!("Ignoring settings payload that is not an object");
            return Self::default();
        };

        Self {
            poll_interval_ms: field(map, &["pollIntervalMs", "refreshInterval"]),
            pause_after_action_ms: field(map, &["pauseAfterActionMs", "pauseAfterClick"]),
            category_filters: filters_field(map),
            sound_enabled: field(map, &["soundEnabled", "enableSound"]),
            manually_paused: field(map, &["manuallyPaused", "isPaused"]),
            pause_composition_mode: field(map, &["pauseCompositionMode", "pauseMode"]),
        }
    }

    pub fn manually_paused(paused: bool) -> Self {
        Self {
            manually_paused: Some(paused),
            ..Self::default()
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, names: &[&str]) -> Option<T> {
    names.iter().find_map(|name| {
        let raw = map.get(*name)?;
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring malformed setting '{name}': {err}");
                None
            }
        }
    })
}

// A present-but-malformed filter list becomes empty so normalization restores
// the default rather than keeping the old list.
fn filters_field(map: &Map<String, Value>) -> Option<Vec<String>> {
    let raw = map.get("categoryFilters")?;
    match raw.as_array() {
        Some(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        None => {
            warn!("categoryFilters is not a list; falling back to the default filter");
            Some(Vec::new())
        }
    }
}

/// Settings loaded once at startup and persisted after every mutation.
/// Readers subscribe to a watch channel instead of polling the store.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    locks: KeyLocks,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    pub async fn load(store: Arc<dyn KeyValueStore>, locks: KeyLocks) -> Self {
        let stored: Option<Value> = load_or_default(store.as_ref(), KEY_SETTINGS).await;
        let settings = Settings::from_stored(stored.as_ref());
        info!(
            "Settings loaded: every {}ms, filters [{}], mode {:?}, manually paused: {}",
            settings.poll_interval_ms,
            settings.category_filters.join(", "),
            settings.pause_composition_mode,
            settings.manually_paused
        );

        let (tx, _rx) = watch::channel(settings);
        Self { store, locks, tx }
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub async fn update(&self, patch: SettingsPatch) -> Settings {
        let _guard = self.locks.lock(KEY_SETTINGS).await;

        let mut next = self.current();
        let previous_filters = next.category_filters.clone();
        next.apply(patch);

        if let Err(err) = save_json(self.store.as_ref(), KEY_SETTINGS, &next).await {
            error!("Failed to persist settings: {err:#}");
        }
        if next.category_filters != previous_filters {
            info!("Category filters updated: {}", next.category_filters.join(", "));
        }

        self.tx.send_replace(next.clone());
        next
    }

    pub async fn set_manually_paused(&self, paused: bool) -> Settings {
        self.update(SettingsPatch::manually_paused(paused)).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};

    #[test]
    fn missing_fields_take_defaults() {
        let settings = Settings::from_stored(Some(&json!({ "soundEnabled": false })));
        assert!(!settings.sound_enabled);
        assert_eq!(settings.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(settings.category_filters, vec![DEFAULT_CATEGORY_FILTER]);
        assert_eq!(settings.pause_composition_mode, PauseMode::Reset);
    }

    #[test]
    fn wrong_typed_field_is_ignored_without_losing_the_rest() {
        let settings = Settings::from_stored(Some(&json!({
            "pollIntervalMs": "fast",
            "pauseCompositionMode": "max",
            "manuallyPaused": true,
        })));
        assert_eq!(settings.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(settings.pause_composition_mode, PauseMode::Max);
        assert!(settings.manually_paused);
    }

    #[test]
    fn legacy_keys_are_understood() {
        let settings = Settings::from_stored(Some(&json!({
            "refreshInterval": 10000,
            "pauseAfterClick": 30000,
            "enableSound": false,
            "isPaused": true,
            "pauseMode": "extend",
        })));
        assert_eq!(settings.poll_interval_ms, 10_000);
        assert_eq!(settings.pause_after_action_ms, 30_000);
        assert!(!settings.sound_enabled);
        assert!(settings.manually_paused);
        assert_eq!(settings.pause_composition_mode, PauseMode::Extend);
    }

    #[test]
    fn filters_are_trimmed_and_deduplicated() {
        let filters = normalize_filters(&[
            "  End of Lease ".to_string(),
            "end of lease".to_string(),
            "".to_string(),
            "Carpet".to_string(),
        ]);
        assert_eq!(filters, vec!["End of Lease", "Carpet"]);
    }

    #[test]
    fn emptied_or_malformed_filters_fall_back_to_default() {
        let mut settings = Settings::default();
        settings.apply(SettingsPatch::from_value(&json!({ "categoryFilters": ["   "] })));
        assert_eq!(settings.category_filters, vec![DEFAULT_CATEGORY_FILTER]);

        settings.category_filters = vec!["Carpet".into()];
        settings.apply(SettingsPatch::from_value(&json!({ "categoryFilters": "Carpet" })));
        assert_eq!(settings.category_filters, vec![DEFAULT_CATEGORY_FILTER]);
    }

    #[test]
    fn intervals_are_clamped() {
        let settings = Settings::from_stored(Some(&json!({
            "pollIntervalMs": 10,
            "pauseAfterActionMs": 10_000_000,
        })));
        assert_eq!(settings.poll_interval_ms, 3_000);
        assert_eq!(settings.pause_after_action_ms, 300_000);
    }

    #[tokio::test]
    async fn update_persists_and_broadcasts() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let settings = SettingsStore::load(store.clone(), KeyLocks::new()).await;
        let rx = settings.subscribe();

        let updated = settings
            .update(SettingsPatch {
                pause_composition_mode: Some(PauseMode::Extend),
                ..SettingsPatch::default()
            })
            .await;

        assert_eq!(updated.pause_composition_mode, PauseMode::Extend);
        assert_eq!(rx.borrow().pause_composition_mode, PauseMode::Extend);

        let persisted = store.get(KEY_SETTINGS).await.unwrap().unwrap();
        assert_eq!(persisted["pauseCompositionMode"], "extend");
    }

    #[tokio::test]
    async fn load_merges_persisted_values() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set(KEY_SETTINGS, json!({ "manuallyPaused": true, "categoryFilters": ["Carpet"] }))
            .await
            .unwrap();

        let settings = SettingsStore::load(store, KeyLocks::new()).await.current();
        assert!(settings.manually_paused);
        assert_eq!(settings.category_filters, vec!["Carpet"]);
        assert!(settings.sound_enabled);
    }
}
