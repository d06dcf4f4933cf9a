use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repositories::ArticleStore;

/// Status label reported before the pipeline has ever completed a run.
pub const NEVER_RUN: &str = "Never run";

/// What external readers see of the most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub status: String,
    pub articles_count: u64,
}

impl ScraperStatus {
    pub fn never_run() -> Self {
        Self {
            last_run: None,
            status: NEVER_RUN.to_string(),
            articles_count: 0,
        }
    }

    pub fn has_run(&self) -> bool {
        self.last_run.is_some()
    }
}

/// Latest run, or the [`ScraperStatus::never_run`] sentinel when there is none.
pub async fn latest_status(store: &dyn ArticleStore) -> Result<ScraperStatus> {
    let status = match store.latest_run_summary().await? {
        Some(run) => ScraperStatus {
            last_run: Some(run.finished_at),
            status: run.status.to_string(),
            articles_count: run.articles_count,
        },
        None => ScraperStatus::never_run(),
    };

    Ok(status)
}
