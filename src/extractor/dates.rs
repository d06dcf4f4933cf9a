use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static PUBLISHED_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="article:published_time"], meta[name="pubdate"]"#).unwrap()
});

static TIME_DATETIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").unwrap());

/// What to do with a page whose publication date cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicationDatePolicy {
    /// Use the extraction wall-clock time.
    #[default]
    ExtractionTime,
    /// Abstain: the page yields no article.
    Reject,
}

/// Look for a publication date: the source's own selector first, then
/// `article:published_time` metadata, then the first `<time datetime>`.
pub fn find_publication_date(document: &Html, selector: Option<&Selector>) -> Option<DateTime<Utc>> {
    if let Some(selector) = selector
        && let Some(date) = document.select(selector).find_map(|el| date_from_element(&el))
    {
        return Some(date);
    }

    document
        .select(&PUBLISHED_META)
        .filter_map(|el| el.value().attr("content"))
        .chain(
            document
                .select(&TIME_DATETIME)
                .filter_map(|el| el.value().attr("datetime")),
        )
        .find_map(parse_date)
}

fn date_from_element(element: &ElementRef<'_>) -> Option<DateTime<Utc>> {
    let value = element.value();
    if let Some(date) = value.attr("datetime").and_then(parse_date) {
        return Some(date);
    }
    if let Some(date) = value.attr("content").and_then(parse_date) {
        return Some(date);
    }
    parse_date(&element.text().collect::<String>())
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
