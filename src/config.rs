use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "LEADWATCH_DB";
pub const SNAPSHOT_PATH_VAR: &str = "LEADWATCH_SNAPSHOT";
pub const DEBUG_VAR: &str = "LEADWATCH_DEBUG";

const DEFAULT_DB_PATH: &str = "leadwatch.sqlite3";
const DEFAULT_SNAPSHOT_PATH: &str = "leads.json";

/// Process-level configuration. User-facing settings live in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub debug: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            db_path: path(DB_PATH_VAR, DEFAULT_DB_PATH),
            snapshot_path: path(SNAPSHOT_PATH_VAR, DEFAULT_SNAPSHOT_PATH),
            debug: lookup(DEBUG_VAR).is_some_and(|value| is_truthy(&value)),
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
