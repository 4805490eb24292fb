use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use crate::models::Lead;

use super::LeadSource;

/// Reads the snapshot from a JSON array of leads, re-reading the file on
/// every call. A missing file is an empty page.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl LeadSource for JsonFileSource {
    async fn snapshot(&self) -> Result<Vec<Lead>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet; no leads", self.path.display());
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read leads from {}", self.path.display()))
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a JSON list of leads", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("leadwatch-{}-{name}.json", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_snapshot() {
        let source = JsonFileSource::new(scratch_path("missing"));
        assert!(source.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_leads_with_defaults() {
        let path = scratch_path("present");
        tokio::fs::write(
            &path,
            r#"[{"id":"L1","category":"Rental Bond Cleaning","customerName":"Sam"}]"#,
        )
        .await
        .unwrap();

        let leads = JsonFileSource::new(path.clone()).snapshot().await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].customer_name, "Sam");
        assert_eq!(leads[0].status, "Unknown");
    }

    #[tokio::test]
    async fn garbage_is_an_error() {
        let path = scratch_path("garbage");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = JsonFileSource::new(path.clone()).snapshot().await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(result.is_err());
    }
}
