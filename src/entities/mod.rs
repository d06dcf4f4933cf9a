pub mod source;

pub use source::{CompiledSource, SourceConfig, SourceConfigError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::fetcher::FetchErrorKind;

// --- Articles ---

/// An extracted article. Title, content and source_url are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub source_url: String, // article page, after redirects
    pub source_name: String,
    pub publication_date: DateTime<Utc>,
    pub categories: BTreeSet<String>,
}

// --- Runs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::Failure => "failure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "partial_failure" => Some(Self::PartialFailure),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Transient,
    Rejected,
    InvalidSource,
    TimedOut,
    Crashed,
    Aggregation,
    Persistence,
}

impl FailureKind {
    /// Internal failures turn a run into a partial failure. The others are
    /// absorbed and only show up as entries of the summary.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InvalidSource | Self::TimedOut | Self::Crashed)
    }

    /// Fatal failures fail the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Aggregation | Self::Persistence)
    }
}

impl From<FetchErrorKind> for FailureKind {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::NotFound => Self::NotFound,
            FetchErrorKind::Transient => Self::Transient,
            FetchErrorKind::Rejected => Self::Rejected,
        }
    }
}

/// One failure observed during a run. `url` is set for article-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source_name: String,
    pub url: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub fn new(source_name: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            url: None,
            kind,
            message: message.into(),
        }
    }

    pub fn at(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// The record of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub articles_count: u64,
    pub errors: Vec<SourceFailure>,
}

impl RunSummary {
    /// Status implied by a set of failures.
    pub fn status_for(errors: &[SourceFailure]) -> RunStatus {
        if errors.iter().any(|e| e.kind.is_fatal()) {
            RunStatus::Failure
        } else if errors.iter().any(|e| e.kind.is_internal()) {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        }
    }
}
