//! Seams to the collaborators the monitor drives but does not own: the page
//! that produces leads, the page's presentation side effects, and the
//! notification sound.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Lead;

#[cfg(test)]
pub(crate) mod fakes;
mod file;
mod terminal;

pub use file::JsonFileSource;
pub use terminal::{BellNotifier, HeadlessPage};

/// Produces the current lead snapshot on demand.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<Lead>>;
}

/// Side effects on the page the leads come from.
#[async_trait]
pub trait PageActions: Send + Sync {
    /// Reloads the page so the next snapshot is fresh.
    async fn refresh(&self) -> Result<()>;

    /// Brings a lead into view. `Ok(false)` means it is no longer on the page.
    async fn reveal_lead(&self, lead_id: &str) -> Result<bool>;

    async fn mark_new(&self, lead_ids: &[String]) -> Result<()>;

    async fn clear_new_marks(&self) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, lead_id: &str) -> Result<()>;
}
