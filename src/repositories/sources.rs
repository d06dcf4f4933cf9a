use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::entities::SourceConfig;
use crate::repositories::SourceProvider;

/// A fixed list of sources.
#[derive(Debug, Clone, Default)]
pub struct StaticSources(pub Vec<SourceConfig>);

#[async_trait]
impl SourceProvider for StaticSources {
    async fn list_sources(&self) -> Result<Vec<SourceConfig>> {
        Ok(self.0.clone())
    }
}

/// Sources read from a JSON array on disk, re-read on every run.
#[derive(Debug, Clone)]
pub struct JsonFileSources {
    path: PathBuf,
}

impl JsonFileSources {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceProvider for JsonFileSources {
    async fn list_sources(&self) -> Result<Vec<SourceConfig>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse sources from {}", self.path.display()))
    }
}
