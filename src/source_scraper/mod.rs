pub mod links;

pub use links::discover_links;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::entities::{
    Article, CompiledSource, FailureKind, SourceConfig, SourceConfigError, SourceFailure,
};
use crate::extractor::Extractor;
use crate::fetcher::{FetchError, Fetcher, PageResponse};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("invalid source: {0}")]
    InvalidSource(#[from] SourceConfigError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("cancelled before completion")]
    Cancelled,

    #[error("scraper task crashed: {0}")]
    Crashed(String),
}

impl SourceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidSource(_) => FailureKind::InvalidSource,
            Self::Fetch(err) => err.kind().into(),
            Self::Cancelled => FailureKind::TimedOut,
            Self::Crashed(_) => FailureKind::Crashed,
        }
    }

    pub fn into_failure(self, source_name: &str) -> SourceFailure {
        SourceFailure::new(source_name, self.kind(), self.to_string())
    }
}

/// What one source produced: its articles in discovery order plus every
/// failure met on the way.
#[derive(Debug, Clone, Default)]
pub struct SourceOutcome {
    pub source_name: String,
    pub articles: Vec<Article>,
    pub links_found: usize,
    pub abstained: usize,
    pub failures: Vec<SourceFailure>,
}

impl SourceOutcome {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn failed(source_name: &str, error: SourceError) -> Self {
        let mut outcome = Self::new(source_name);
        outcome.failures.push(error.into_failure(source_name));
        outcome
    }

    pub fn has_internal_failure(&self) -> bool {
        self.failures.iter().any(|f| f.kind.is_internal())
    }
}

enum Fetched {
    Page(PageResponse),
    Failed(FetchError),
    Cancelled,
}

/// Scrapes one source: index page, link discovery, then every article in turn.
#[derive(Clone)]
pub struct SourceScraper {
    fetcher: Fetcher,
    extractor: Extractor,
}

impl SourceScraper {
    pub fn new(fetcher: Fetcher, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Never fails: problems end up in [`SourceOutcome::failures`].
    ///
    /// A failed index fetch yields no articles. A failed article fetch drops
    /// that article only. On cancellation the articles gathered so far are kept.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn scrape(&self, source: &SourceConfig, cancel: &CancellationToken) -> SourceOutcome {
        let compiled = match source.compile() {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!(error = %err, "source configuration rejected");
                return SourceOutcome::failed(&source.name, err.into());
            }
        };

        let mut outcome = SourceOutcome::new(&source.name);

        let index = match self.fetch_or_cancel(compiled.index_url.as_str(), cancel).await {
            Fetched::Page(page) => page,
            Fetched::Failed(err) => {
                warn!(url = %compiled.index_url, error = %err, "index fetch failed, 0 articles from source");
                outcome.failures.push(
                    SourceError::from(err)
                        .into_failure(&source.name)
                        .at(compiled.index_url.as_str()),
                );
                return outcome;
            }
            Fetched::Cancelled => {
                outcome.failures.push(SourceError::Cancelled.into_failure(&source.name));
                return outcome;
            }
        };

        let links = discover_links(&index.body_utf8, &index.url_final, &compiled.article_link);
        outcome.links_found = links.len();
        debug!(links = links.len(), "index parsed");

        for link in links {
            match self.fetch_or_cancel(link.as_str(), cancel).await {
                Fetched::Page(page) => self.collect(&page, &compiled, &mut outcome),
                Fetched::Failed(err) => {
                    warn!(url = %link, error = %err, "article dropped");
                    outcome.failures.push(
                        SourceError::from(err)
                            .into_failure(&source.name)
                            .at(link.as_str()),
                    );
                }
                Fetched::Cancelled => {
                    warn!(kept = outcome.articles.len(), "cancelled, keeping partial results");
                    outcome.failures.push(SourceError::Cancelled.into_failure(&source.name));
                    break;
                }
            }
        }

        info!(
            articles = outcome.articles.len(),
            links = outcome.links_found,
            abstained = outcome.abstained,
            failures = outcome.failures.len(),
            "source scraped"
        );
        outcome
    }

    fn collect(&self, page: &PageResponse, source: &CompiledSource, outcome: &mut SourceOutcome) {
        match self.extractor.extract_page(page, source) {
            Some(article) => outcome.articles.push(article),
            None => outcome.abstained += 1,
        }
    }

    async fn fetch_or_cancel(&self, url: &str, cancel: &CancellationToken) -> Fetched {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Fetched::Cancelled,
            result = self.fetcher.fetch(url) => match result {
                Ok(page) => Fetched::Page(page),
                Err(err) => Fetched::Failed(err),
            },
        }
    }
}
