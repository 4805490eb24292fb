//! Key-value persistence for monitor state.
//!
//! The backing store only offers `get`/`set` of JSON blobs, with no
//! compare-and-swap, so every read-modify-write goes through [`KeyLocks`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const KEY_LEADS: &str = "leads";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_SOUNDED_LEADS: &str = "sounded_leads";
pub const KEY_FIRST_SEEN: &str = "first_seen_timestamps";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// One async mutex per store key, created on first use.
#[derive(Clone, Default)]
pub struct KeyLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut guard = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

/// Reads `key` and decodes it. A missing key yields `T::default()`, and so
/// does a value of the wrong shape (logged). Only store access errors are
/// returned.
pub async fn load_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(value) = store
        .get(key)
        .await
        .with_context(|| format!("failed to read '{key}' from store"))?
    else {
        return Ok(T::default());
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Ok(decoded),
        Err(err) => {
            warn!("Discarding malformed '{key}' entry: {err}");
            Ok(T::default())
        }
    }
}

/// Like [`load_json`] but a store failure is logged and replaced with the default.
pub async fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match load_json(store, key).await {
        Ok(value) => value,
        Err(err) => {
            error!("{err:#}");
            T::default()
        }
    }
}

pub async fn save_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_value(value)
        .with_context(|| format!("failed to encode '{key}'"))?;
    store
        .set(key, encoded)
        .await
        .with_context(|| format!("failed to write '{key}' to store"))
}
