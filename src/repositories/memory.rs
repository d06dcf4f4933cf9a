use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::entities::{Article, RunSummary};
use crate::repositories::ArticleStore;

#[derive(Debug, Default)]
struct Inner {
    articles: Vec<Article>,
    runs: Vec<RunSummary>,
    insert_calls: usize,
}

/// In-process [`ArticleStore`], for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    reject_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose article inserts always fail. Run logs are still kept.
    pub fn rejecting_inserts() -> Self {
        Self {
            reject_inserts: true,
            ..Self::default()
        }
    }

    pub fn articles(&self) -> Vec<Article> {
        self.lock().articles.clone()
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.lock().runs.clone()
    }

    /// Number of `insert_articles` calls, failed ones included.
    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_articles(&self, articles: &[Article]) -> Result<u64> {
        let mut inner = self.lock();
        inner.insert_calls += 1;
        if self.reject_inserts {
            bail!("article inserts are disabled for this store");
        }
        inner.articles.extend_from_slice(articles);
        Ok(articles.len() as u64)
    }

    async fn insert_run_summary(&self, summary: &RunSummary) -> Result<()> {
        self.lock().runs.push(summary.clone());
        Ok(())
    }

    async fn latest_run_summary(&self) -> Result<Option<RunSummary>> {
        Ok(self
            .lock()
            .runs
            .iter()
            .max_by_key(|run| run.finished_at)
            .cloned())
    }

    async fn known_source_urls(&self, urls: &[String]) -> Result<HashSet<String>> {
        let inner = self.lock();
        Ok(inner
            .articles
            .iter()
            .filter(|a| urls.contains(&a.source_url))
            .map(|a| a.source_url.clone())
            .collect())
    }
}
