use anyhow::{Context, Result};
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, LogFormat};
use crate::extractor::{Extractor, StaticCategories};
use crate::fetcher::{Fetcher, HttpTransport};
use crate::pipeline::PipelineRunner;
use crate::repositories::{
    ArticleStore, JsonFileSources, PgArticleStore, PgSourceRepository, SourceProvider,
};
use crate::source_scraper::SourceScraper;

/// Everything a binary needs to trigger runs.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<PipelineRunner>,
    pub provider: Arc<dyn SourceProvider>,
    pub store: Arc<dyn ArticleStore>,
    pub db_pool: Pool<Postgres>,
}

impl AppState {
    /// Wire the pipeline over an already-migrated pool.
    pub fn new(config: &Config, pool: Pool<Postgres>) -> Result<Self> {
        let transport = HttpTransport::from_settings(&config.http_settings())
            .context("failed to build http client")?;
        let fetcher = Fetcher::new(Arc::new(transport), config.retry_policy());
        let extractor = Extractor::new(
            Arc::new(StaticCategories::default()),
            config.missing_date_policy(),
        );

        let store: Arc<dyn ArticleStore> = Arc::new(PgArticleStore::new(pool.clone()));
        let provider: Arc<dyn SourceProvider> = match config.sources_file() {
            Some(path) => {
                info!(path = %path.display(), "reading sources from file");
                Arc::new(JsonFileSources::new(path))
            }
            None => Arc::new(PgSourceRepository::new(pool.clone())),
        };

        let runner = PipelineRunner::new(
            SourceScraper::new(fetcher, extractor),
            Arc::clone(&store),
            config.run_options(),
        );

        Ok(Self {
            runner: Arc::new(runner),
            provider,
            store,
            db_pool: pool,
        })
    }

    /// Connect, apply pending migrations, then wire.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(config.database_url())
            .await
            .context("failed to connect to database")?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Self::new(config, pool)
    }
}

/// Install the global subscriber. `RUST_LOG` filters, defaulting to `info`.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
