pub mod memory;
pub mod postgres;
pub mod sources;

pub use memory::MemoryStore;
pub use postgres::{PgArticleStore, PgSourceRepository};
pub use sources::{JsonFileSources, StaticSources};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::entities::{Article, RunSummary, SourceConfig};

/// Where batches and run logs go.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a whole batch. Returns the number of rows written.
    async fn insert_articles(&self, articles: &[Article]) -> Result<u64>;

    /// Append the log of one run.
    async fn insert_run_summary(&self, summary: &RunSummary) -> Result<()>;

    /// The most recent run, by finish time.
    async fn latest_run_summary(&self) -> Result<Option<RunSummary>>;

    /// Which of `urls` already have a stored article.
    async fn known_source_urls(&self, urls: &[String]) -> Result<HashSet<String>>;
}

/// Supplies the active set of source configurations.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<SourceConfig>>;
}
