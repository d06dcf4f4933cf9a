//! Fan-out of the source scrapers and aggregation of their results.
//!
//! A run scrapes every source concurrently, waits for all of them, merges the
//! articles in source order, optionally deduplicates, then hands the batch and
//! the run summary to the [`ArticleStore`].

pub mod dedup;

pub use dedup::dedup_by_source_url;

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{self, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::entities::{Article, FailureKind, RunSummary, SourceConfig, SourceFailure};
use crate::repositories::{ArticleStore, SourceProvider};
use crate::source_scraper::{SourceError, SourceOutcome, SourceScraper};

/// `source_name` of failures that concern the whole run rather than one source.
pub const PIPELINE_SCOPE: &str = "pipeline";

/// Failures that abort a run before any source is scraped.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("could not load sources: {0:#}")]
    Sources(anyhow::Error),

    #[error("duplicate source name {0:?}")]
    DuplicateSource(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Drop articles whose `source_url` is repeated in the batch or already stored.
    pub dedup: bool,
    /// Cancel sources still running after this long.
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub batch: Vec<Article>,
    pub summary: RunSummary,
}

pub struct PipelineRunner {
    scraper: SourceScraper,
    store: Arc<dyn ArticleStore>,
    options: RunOptions,
}

impl PipelineRunner {
    pub fn new(scraper: SourceScraper, store: Arc<dyn ArticleStore>, options: RunOptions) -> Self {
        Self {
            scraper,
            store,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Start a run in the background. The outcome is delivered through the
    /// store; the handle only resolves to the summary for callers that care.
    pub fn spawn(self: &Arc<Self>, provider: Arc<dyn SourceProvider>) -> JoinHandle<RunSummary> {
        let runner = Arc::clone(self);
        tokio::spawn(
            async move { runner.run_from(provider.as_ref()).await.summary }
                .instrument(info_span!("detached_run")),
        )
    }

    /// Load the sources from `provider`, then run. A provider failure fails the run.
    pub async fn run_from(&self, provider: &dyn SourceProvider) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        match provider.list_sources().await {
            Ok(sources) => self.execute(run_id, started_at, sources).await,
            Err(err) => self.abort(run_id, started_at, AggregationError::Sources(err)).await,
        }
    }

    pub async fn run(&self, sources: Vec<SourceConfig>) -> RunReport {
        self.execute(Uuid::new_v4(), Utc::now(), sources).await
    }

    #[instrument(skip_all, fields(run_id = %run_id, sources = sources.len()))]
    async fn execute(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        sources: Vec<SourceConfig>,
    ) -> RunReport {
        if let Err(err) = check_unique_names(&sources) {
            return self.abort(run_id, started_at, err).await;
        }

        let outcomes = self.fan_out(sources).await;

        let mut batch = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            batch.extend(outcome.articles);
            errors.extend(outcome.failures);
        }

        if self.options.dedup {
            batch = self.dedup(batch).await;
        }

        let mut articles_count = batch.len() as u64;
        if !batch.is_empty()
            && let Err(err) = self.store.insert_articles(&batch).await
        {
            error!(error = %format!("{err:#}"), articles = batch.len(), "failed to persist batch");
            errors.push(SourceFailure::new(
                PIPELINE_SCOPE,
                FailureKind::Persistence,
                format!("{err:#}"),
            ));
            articles_count = 0;
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status: RunSummary::status_for(&errors),
            articles_count,
            errors,
        };
        info!(
            status = %summary.status,
            articles = summary.articles_count,
            failures = summary.errors.len(),
            "run finished"
        );

        self.record(&summary).await;
        RunReport { batch, summary }
    }

    /// One task per source; results are collected in source order.
    ///
    /// The tasks live in a `JoinSet`, so dropping the run mid-flight aborts
    /// every scraper still running.
    async fn fan_out(&self, sources: Vec<SourceConfig>) -> Vec<SourceOutcome> {
        let cancel = CancellationToken::new();
        // stops the deadline timer on return or drop
        let _stop_timer = cancel.clone().drop_guard();

        let mut tasks = JoinSet::new();
        let mut names: HashMap<task::Id, (usize, String)> = HashMap::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            let scraper = self.scraper.clone();
            let cancel = cancel.clone();
            let name = source.name.clone();
            let handle = tasks.spawn(
                async move { (index, scraper.scrape(&source, &cancel).await) }.in_current_span(),
            );
            names.insert(handle.id(), (index, name));
        }

        if let Some(deadline) = self.options.deadline {
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(deadline) => {
                            warn!(deadline_ms = deadline.as_millis() as u64, "run deadline reached, cancelling sources");
                            cancel.cancel();
                        }
                    }
                }
                .in_current_span(),
            );
        }

        let mut outcomes: Vec<(usize, SourceOutcome)> = Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, indexed)) => outcomes.push(indexed),
                Err(join_err) => {
                    let Some((index, name)) = names.remove(&join_err.id()) else {
                        error!(error = %join_err, "unknown scraper task crashed");
                        continue;
                    };
                    error!(source = %name, error = %join_err, "scraper task crashed");
                    let outcome = SourceOutcome::failed(&name, SourceError::Crashed(join_err.to_string()));
                    outcomes.push((index, outcome));
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn dedup(&self, batch: Vec<Article>) -> Vec<Article> {
        let urls: Vec<String> = batch.iter().map(|a| a.source_url.clone()).collect();
        let known = match self.store.known_source_urls(&urls).await {
            Ok(known) => known,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "stored urls unavailable, deduplicating within the batch only");
                HashSet::new()
            }
        };

        let before = batch.len();
        let kept = dedup_by_source_url(batch, &known);
        debug!(dropped = before - kept.len(), kept = kept.len(), "batch deduplicated");
        kept
    }

    async fn abort(&self, run_id: Uuid, started_at: DateTime<Utc>, err: AggregationError) -> RunReport {
        error!(run_id = %run_id, error = %err, "run aborted");

        let errors = vec![SourceFailure::new(
            PIPELINE_SCOPE,
            FailureKind::Aggregation,
            err.to_string(),
        )];
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status: RunSummary::status_for(&errors),
            articles_count: 0,
            errors,
        };

        self.record(&summary).await;
        RunReport {
            batch: Vec::new(),
            summary,
        }
    }

    async fn record(&self, summary: &RunSummary) {
        if let Err(err) = self.store.insert_run_summary(summary).await {
            error!(run_id = %summary.run_id, error = %format!("{err:#}"), "failed to record run summary");
        }
    }
}

fn check_unique_names(sources: &[SourceConfig]) -> Result<(), AggregationError> {
    let mut seen = HashSet::with_capacity(sources.len());
    for source in sources {
        if !seen.insert(source.name.as_str()) {
            return Err(AggregationError::DuplicateSource(source.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.into(),
            index_url: "https://example.com/".into(),
            article_link_selector: "a".into(),
            title_selector: "h1".into(),
            content_selector: "p".into(),
            image_selector: None,
            date_selector: None,
        }
    }

    #[test]
    fn test_unique_names() {
        assert!(check_unique_names(&[named("a"), named("b")]).is_ok());
        assert!(check_unique_names(&[]).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        match check_unique_names(&[named("a"), named("b"), named("a")]) {
            Err(AggregationError::DuplicateSource(name)) => assert_eq!(name, "a"),
            other => panic!("expected duplicate source, got {other:?}"),
        }
    }

    #[test]
    fn test_default_options_are_off() {
        let options = RunOptions::default();
        assert!(!options.dedup);
        assert_eq!(options.deadline, None);
    }
}
