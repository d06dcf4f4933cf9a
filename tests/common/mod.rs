#![allow(dead_code)]

use async_trait::async_trait;
use gazette::{
    entities::SourceConfig,
    extractor::Extractor,
    fetcher::{FetchError, Fetcher, PageResponse, RetryPolicy, Transport},
    pipeline::{PipelineRunner, RunOptions},
    repositories::ArticleStore,
    source_scraper::SourceScraper,
};
use reqwest::StatusCode;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use url::Url;

/// How the fake answers one URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Html(String),
    Status(u16),
    /// Never answers.
    Hang,
    /// Fails with the status `n` times, then serves the page.
    FailTimes(u32, u16, String),
    Panic,
}

/// A [`Transport`] with scripted answers. Unknown URLs are 404s.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, Reply>>,
    hits: Mutex<HashMap<String, u32>>,
    hanging: Arc<AtomicUsize>,
}

/// Counts a pending `Hang` request until its future is dropped.
struct Hanging(Arc<AtomicUsize>);

impl Hanging {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for Hanging {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    pub fn hits(&self, url: &str) -> u32 {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> u32 {
        self.hits.lock().unwrap().values().sum()
    }

    /// `Hang` requests whose futures are still alive.
    pub fn hanging(&self) -> usize {
        self.hanging.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let hit = {
            let mut hits = self.hits.lock().unwrap();
            let count = hits.entry(url.to_string()).or_default();
            *count += 1;
            *count
        };
        let reply = self.replies.lock().unwrap().get(url.as_str()).cloned();

        match reply {
            Some(Reply::Html(body)) => Ok(PageResponse::html(url.clone(), body)),
            Some(Reply::Status(code)) => Err(FetchError::from_status(status(code))),
            Some(Reply::Hang) => {
                let _pending = Hanging::start(&self.hanging);
                std::future::pending().await
            }
            Some(Reply::FailTimes(n, code, body)) => {
                if hit <= n {
                    Err(FetchError::from_status(status(code)))
                } else {
                    Ok(PageResponse::html(url.clone(), body))
                }
            }
            Some(Reply::Panic) => panic!("transport blew up on {url}"),
            None => Err(FetchError::NotFound),
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

pub fn source(name: &str, index_url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        index_url: index_url.to_string(),
        article_link_selector: "a.story".to_string(),
        title_selector: "h1".to_string(),
        content_selector: ".content".to_string(),
        image_selector: Some("img.featured".to_string()),
        date_selector: None,
    }
}

pub fn index_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a class="story" href="{href}">story</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

pub fn article_page(title: &str) -> String {
    format!(
        r#"<html><body>
            <h1>{title}</h1>
            <img class="featured" src="/img/{title}.jpg">
            <div class="content">First sentence of {title}. Second one. Third one. Fourth one.</div>
        </body></html>"#
    )
}

pub fn runner(
    transport: Arc<FakeTransport>,
    store: Arc<dyn ArticleStore>,
    options: RunOptions,
) -> PipelineRunner {
    let fetcher = Fetcher::new(transport, RetryPolicy::new(3, Duration::from_millis(1)));
    PipelineRunner::new(SourceScraper::new(fetcher, Extractor::default()), store, options)
}
