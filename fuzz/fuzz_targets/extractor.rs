#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;
use url::Url;

use gazette::entities::{CompiledSource, SourceConfig};
use gazette::extractor::Extractor;
use gazette::source_scraper::discover_links;

static SOURCE: LazyLock<CompiledSource> = LazyLock::new(|| {
    SourceConfig {
        name: "fuzz".into(),
        index_url: "https://example.com/".into(),
        article_link_selector: "article a, a.story".into(),
        title_selector: "h1, .title".into(),
        content_selector: "article p, .content".into(),
        image_selector: Some("img".into()),
        date_selector: Some("time".into()),
    }
    .compile()
    .unwrap()
});

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let page_url = Url::parse("https://example.com/news/item").unwrap();

    // neither link discovery nor extraction may panic on arbitrary markup
    let _ = discover_links(&html, &page_url, &SOURCE.article_link);
    if let Some(article) = Extractor::default().extract(&html, &page_url, &SOURCE) {
        assert!(!article.title.trim().is_empty());
        assert!(!article.content.trim().is_empty());
    }
});
