use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use tokio::io::AsyncWriteExt;

use super::{LeadSource, Notifier, PageActions};

/// Page stand-in for headless runs: there is nothing to reload or scroll, so
/// actions are logged and `reveal_lead` answers from the current snapshot.
pub struct HeadlessPage {
    source: Arc<dyn LeadSource>,
}

impl HeadlessPage {
    pub fn new(source: Arc<dyn LeadSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageActions for HeadlessPage {
    async fn refresh(&self) -> Result<()> {
        info!("Refreshing lead page");
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
            info!("Revealing lead {lead_id}");
        }
        Ok(present)
    }

    async fn mark_new(&self, lead_ids: &[String]) -> Result<()> {
        info!("Marking new: {}", lead_ids.join(", "));
        Ok(())
    }

    async fn clear_new_marks(&self) -> Result<()> {
        info!("Clearing new-lead marks");
        Ok(())
    }
}

/// Rings the terminal bell once per new lead.
#[derive(Debug, Default, Clone)]
pub struct BellNotifier;

#[async_trait]
impl Notifier for BellNotifier {
    async fn notify(&self, lead_id: &str) -> Result<()> {
        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(b"\x07")
            .await
            .context("failed to ring terminal bell")?;
        stderr.flush().await?;
        info!("New lead {lead_id}");
        Ok(())
    }
}
