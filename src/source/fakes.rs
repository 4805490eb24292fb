use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use super::{LeadSource, Notifier, PageActions};
use crate::models::Lead;

/// Serves a fixed snapshot and counts reads.
pub struct StaticSource {
    leads: Vec<Lead>,
    reads: AtomicUsize,
}

impl StaticSource {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self {
            leads,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeadSource for StaticSource {
    async fn snapshot(&self) -> Result<Vec<Lead>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.leads.clone())
    }
}

/// Accepts every action; only `L1` can be revealed.
pub struct NoopPage;

#[async_trait]
impl PageActions for NoopPage {
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn reveal_lead(&self, lead_id: &str) -> Result<bool> {
        Ok(lead_id == "L1")
    }

    async fn mark_new(&self, _lead_ids: &[String]) -> Result<()> {
        Ok(())
    }

    async fn clear_new_marks(&self) -> Result<()> {
        Ok(())
    }
}

pub struct Silent;

#[async_trait]
impl Notifier for Silent {
    async fn notify(&self, _lead_id: &str) -> Result<()> {
        Ok(())
    }
}
