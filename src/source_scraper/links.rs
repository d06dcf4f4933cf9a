use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static NESTED_ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Article URLs on an index page, in document order.
///
/// Each element matching `selector` contributes its own `href`, or the first
/// nested `a[href]` when it has none. Relative links are resolved against
/// `base`; anything that does not resolve to an http(s) URL is skipped.
pub fn discover_links(body: &str, base: &Url, selector: &Selector) -> Vec<Url> {
    let document = Html::parse_document(body);

    document
        .select(selector)
        .filter_map(|element| link_target(&element))
        .filter_map(|href| resolve_http(base, href))
        .collect()
}

fn link_target<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    element.value().attr("href").or_else(|| {
        element
            .select(&NESTED_ANCHOR)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
    })
}

fn resolve_http(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
