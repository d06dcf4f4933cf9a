pub mod categories;
pub mod dates;
pub mod summary;

#[cfg(test)]
mod tests;

pub use categories::{CategoryClassifier, StaticCategories};
pub use dates::PublicationDatePolicy;
pub use summary::summarize;

use chrono::Utc;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::entities::{Article, CompiledSource};
use crate::fetcher::PageResponse;

/// Turns an article page into an [`Article`] using a source's selectors.
#[derive(Clone)]
pub struct Extractor {
    classifier: Arc<dyn CategoryClassifier>,
    date_policy: PublicationDatePolicy,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(
            Arc::new(StaticCategories::default()),
            PublicationDatePolicy::default(),
        )
    }
}

impl Extractor {
    pub fn new(classifier: Arc<dyn CategoryClassifier>, date_policy: PublicationDatePolicy) -> Self {
        Self {
            classifier,
            date_policy,
        }
    }

    pub fn extract_page(&self, page: &PageResponse, source: &CompiledSource) -> Option<Article> {
        self.extract(&page.body_utf8, &page.url_final, source)
    }

    /// Extract one article, or `None` when the page lacks a title or content.
    ///
    /// Abstaining is not an error; a page never produces a partial article.
    pub fn extract(&self, body: &str, page_url: &Url, source: &CompiledSource) -> Option<Article> {
        let document = Html::parse_document(body);

        let Some(title) = first_text(&document, &source.title) else {
            debug!(url = %page_url, source = source.name(), "no title, skipping");
            return None;
        };
        let Some(content) = first_text(&document, &source.content) else {
            debug!(url = %page_url, source = source.name(), "no content, skipping");
            return None;
        };

        let image_url = source
            .image
            .as_ref()
            .and_then(|selector| first_attr(&document, selector, "src"))
            .and_then(|src| resolve(page_url, src));

        let publication_date = match dates::find_publication_date(&document, source.date.as_ref()) {
            Some(date) => date,
            None => match self.date_policy {
                PublicationDatePolicy::ExtractionTime => Utc::now(),
                PublicationDatePolicy::Reject => {
                    debug!(url = %page_url, source = source.name(), "no publication date, skipping");
                    return None;
                }
            },
        };

        Some(Article {
            summary: summarize(&content),
            categories: self.classifier.classify(&title, &content),
            title,
            content,
            image_url,
            source_url: page_url.to_string(),
            source_name: source.name().to_string(),
            publication_date,
        })
    }
}

/// Trimmed text of the first match. Blank text counts as no match.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let element = document.select(selector).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn first_attr<'a>(document: &'a Html, selector: &Selector, attr: &str) -> Option<&'a str> {
    document
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
}

fn resolve(base: &Url, target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    base.join(target).ok().map(String::from)
}
