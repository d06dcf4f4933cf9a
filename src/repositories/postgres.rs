use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use md5::Context as Md5;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::{Article, RunStatus, RunSummary, SourceConfig, SourceFailure};
use crate::repositories::{ArticleStore, SourceProvider};

// Postgres caps a statement at 65535 bind parameters; 9 per row.
const INSERT_CHUNK_ROWS: usize = 1000;

/// [`ArticleStore`] backed by the `articles` and `run_summaries` tables.
#[derive(Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// MD5 over title and content
    fn compute_checksum(article: &Article) -> String {
        let mut hasher = Md5::new();
        hasher.consume(article.title.as_bytes());
        hasher.consume(article.content.as_bytes());
        format!("{:x}", hasher.compute())
    }
}

#[derive(Debug, FromRow)]
struct RunSummaryRow {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: String,
    articles_count: i64,
    errors: Json<Vec<SourceFailure>>,
}

impl TryFrom<RunSummaryRow> for RunSummary {
    type Error = anyhow::Error;

    fn try_from(row: RunSummaryRow) -> Result<Self> {
        let status = RunStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("unknown run status {:?} for run {}", row.status, row.run_id))?;

        Ok(RunSummary {
            run_id: row.run_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status,
            articles_count: row.articles_count.max(0) as u64,
            errors: row.errors.0,
        })
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    /// Inserts the batch in chunks inside one transaction, so a failing
    /// chunk leaves none of the batch behind.
    async fn insert_articles(&self, articles: &[Article]) -> Result<u64> {
        let mut written = 0;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin article insert")?;

        for chunk in articles.chunks(INSERT_CHUNK_ROWS) {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO articles \
                 (title, content, summary, image_url, source_url, source_name, publication_date, categories, checksum) ",
            );
            query.push_values(chunk, |mut row, article| {
                row.push_bind(article.title.clone())
                    .push_bind(article.content.clone())
                    .push_bind(article.summary.clone())
                    .push_bind(article.image_url.clone())
                    .push_bind(article.source_url.clone())
                    .push_bind(article.source_name.clone())
                    .push_bind(article.publication_date)
                    .push_bind(article.categories.iter().cloned().collect::<Vec<String>>())
                    .push_bind(Self::compute_checksum(article));
            });

            let result = query
                .build()
                .execute(&mut *tx)
                .await
                .context("failed to insert articles")?;
            written += result.rows_affected();
        }

        tx.commit()
            .await
            .context("failed to commit article insert")?;
        Ok(written)
    }

    async fn insert_run_summary(&self, summary: &RunSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO run_summaries
                  (run_id, started_at, finished_at, status, articles_count, errors)
            VALUES ($1,     $2,         $3,          $4,     $5,             $6)
            "#,
        )
        .bind(summary.run_id)
        .bind(summary.started_at)
        .bind(summary.finished_at)
        .bind(summary.status.as_str())
        .bind(summary.articles_count as i64)
        .bind(Json(&summary.errors))
        .execute(&self.pool)
        .await
        .context("failed to insert run summary")?;

        Ok(())
    }

    async fn latest_run_summary(&self) -> Result<Option<RunSummary>> {
        let row = sqlx::query_as::<_, RunSummaryRow>(
            r#"
            SELECT run_id, started_at, finished_at, status, articles_count, errors
            FROM run_summaries
            ORDER BY finished_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(RunSummary::try_from).transpose()
    }

    async fn known_source_urls(&self, urls: &[String]) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let known = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT source_url FROM articles WHERE source_url = ANY($1)",
        )
        .bind(urls)
        .fetch_all(&self.pool)
        .await?;

        Ok(known.into_iter().collect())
    }
}

/// Source configurations stored in the `sources` table.
#[derive(Clone)]
pub struct PgSourceRepository {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct SourceRow {
    name: String,
    index_url: String,
    article_link_selector: String,
    title_selector: String,
    content_selector: String,
    image_selector: Option<String>,
    date_selector: Option<String>,
}

impl From<SourceRow> for SourceConfig {
    fn from(row: SourceRow) -> Self {
        Self {
            name: row.name,
            index_url: row.index_url,
            article_link_selector: row.article_link_selector,
            title_selector: row.title_selector,
            content_selector: row.content_selector,
            image_selector: row.image_selector,
            date_selector: row.date_selector,
        }
    }
}

impl PgSourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a source, or replace the one with the same name.
    pub async fn add_source(&self, source: &SourceConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sources
                  (name, index_url, article_link_selector, title_selector,
                   content_selector, image_selector, date_selector)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO UPDATE
              SET index_url             = EXCLUDED.index_url,
                  article_link_selector = EXCLUDED.article_link_selector,
                  title_selector        = EXCLUDED.title_selector,
                  content_selector      = EXCLUDED.content_selector,
                  image_selector        = EXCLUDED.image_selector,
                  date_selector         = EXCLUDED.date_selector
            "#,
        )
        .bind(&source.name)
        .bind(&source.index_url)
        .bind(&source.article_link_selector)
        .bind(&source.title_selector)
        .bind(&source.content_selector)
        .bind(&source.image_selector)
        .bind(&source.date_selector)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save source {:?}", source.name))?;

        Ok(())
    }

    pub async fn remove_source(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SourceProvider for PgSourceRepository {
    async fn list_sources(&self) -> Result<Vec<SourceConfig>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT name, index_url, article_link_selector, title_selector,
                   content_selector, image_selector, date_selector
            FROM sources
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load sources")?;

        Ok(rows.into_iter().map(SourceConfig::from).collect())
    }
}
