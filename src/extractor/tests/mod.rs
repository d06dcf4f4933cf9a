use chrono::{TimeZone, Utc};
use std::sync::Arc;
use url::Url;

use crate::entities::{CompiledSource, SourceConfig};
use crate::extractor::{Extractor, PublicationDatePolicy, StaticCategories};
use crate::fetcher::PageResponse;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Rust 2024 ships | Example Tech News</title>
  <meta property="article:published_time" content="2024-02-20T08:00:00Z">
</head>
<body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h2>  Rust 2024 ships  </h2>
    <img class="featured" src="/images/crab.png" alt="crab">
    <div class="content">
      The 2024 edition is out. It stabilises let chains. Async closures landed too. More is coming.
    </div>
  </article>
</body>
</html>"#;

fn source() -> CompiledSource {
    SourceConfig {
        name: "Example Tech News".into(),
        index_url: "https://example.com/tech".into(),
        article_link_selector: "article a".into(),
        title_selector: "h2".into(),
        content_selector: ".content".into(),
        image_selector: Some("img.featured".into()),
        date_selector: None,
    }
    .compile()
    .unwrap()
}

fn page_url() -> Url {
    Url::parse("https://example.com/tech/rust-2024").unwrap()
}

#[test]
fn test_extract_article() {
    let article = Extractor::default()
        .extract(ARTICLE, &page_url(), &source())
        .expect("article should be extracted");

    assert_eq!(article.title, "Rust 2024 ships");
    assert!(article.content.starts_with("The 2024 edition is out."));
    assert_eq!(
        article.summary,
        "The 2024 edition is out. It stabilises let chains. Async closures landed too..."
    );
    assert_eq!(
        article.image_url.as_deref(),
        Some("https://example.com/images/crab.png")
    );
    assert_eq!(article.source_url, "https://example.com/tech/rust-2024");
    assert_eq!(article.source_name, "Example Tech News");
    assert_eq!(
        article.publication_date,
        Utc.with_ymd_and_hms(2024, 2, 20, 8, 0, 0).unwrap()
    );
    assert!(article.categories.contains("technology"));
}

#[test]
fn test_extract_page_uses_final_url() {
    let page = PageResponse::html(page_url(), ARTICLE);
    let article = Extractor::default().extract_page(&page, &source()).unwrap();
    assert_eq!(article.source_url, page.url_final.as_str());
}

#[test]
fn test_missing_title_abstains() {
    let html = r#"<html><body><div class="content">Body only. No heading.</div></body></html>"#;
    assert!(Extractor::default().extract(html, &page_url(), &source()).is_none());
}

#[test]
fn test_blank_title_abstains() {
    let html = r#"<html><body><h2>   </h2><div class="content">Text.</div></body></html>"#;
    assert!(Extractor::default().extract(html, &page_url(), &source()).is_none());
}

#[test]
fn test_missing_content_abstains() {
    let html = r#"<html><body><h2>Headline</h2><p>not the content div</p></body></html>"#;
    assert!(Extractor::default().extract(html, &page_url(), &source()).is_none());
}

#[test]
fn test_missing_image_is_not_an_error() {
    let html = r#"<html><body><h2>Headline</h2><div class="content">Text.</div></body></html>"#;
    let article = Extractor::default()
        .extract(html, &page_url(), &source())
        .unwrap();
    assert_eq!(article.image_url, None);
}

#[test]
fn test_missing_date_defaults_to_extraction_time() {
    let html = r#"<html><body><h2>Headline</h2><div class="content">Text.</div></body></html>"#;
    let before = Utc::now();
    let article = Extractor::default()
        .extract(html, &page_url(), &source())
        .unwrap();
    let after = Utc::now();

    assert!(article.publication_date >= before && article.publication_date <= after);
}

#[test]
fn test_missing_date_rejected_by_policy() {
    let html = r#"<html><body><h2>Headline</h2><div class="content">Text.</div></body></html>"#;
    let extractor = Extractor::new(
        Arc::new(StaticCategories::default()),
        PublicationDatePolicy::Reject,
    );

    assert!(extractor.extract(html, &page_url(), &source()).is_none());
    assert!(extractor.extract(ARTICLE, &page_url(), &source()).is_some());
}

#[test]
fn test_custom_classifier() {
    let extractor = Extractor::new(
        Arc::new(StaticCategories::new(["world", "economy"])),
        PublicationDatePolicy::ExtractionTime,
    );
    let article = extractor.extract(ARTICLE, &page_url(), &source()).unwrap();
    assert_eq!(
        article.categories.into_iter().collect::<Vec<_>>(),
        vec!["economy", "world"]
    );
}

#[test]
fn test_malformed_html() {
    let html = "<html><head><title>Broken</title><body><h2>Unclosed<div class=\"content\">More content";
    // Should handle malformed HTML gracefully
    if let Some(article) = Extractor::default().extract(html, &page_url(), &source()) {
        assert!(!article.title.is_empty());
        assert!(article.content.contains("More content"));
    }
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_extract_never_panics(html in ".*") {
            let _ = Extractor::default().extract(&html, &page_url(), &source());
        }

        #[test]
        fn test_extracted_fields_are_never_blank(title in "[a-zA-Z ]{0,20}", body in "[a-zA-Z. ]{0,80}") {
            let html = format!(r#"<html><body><h2>{title}</h2><div class="content">{body}</div></body></html>"#);
            if let Some(article) = Extractor::default().extract(&html, &page_url(), &source()) {
                prop_assert!(!article.title.trim().is_empty());
                prop_assert!(!article.content.trim().is_empty());
            }
        }
    }
}
