use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// How to locate and parse the articles of one external site.
///
/// `name` is the identity of a source and must be unique within the active set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(alias = "url")]
    pub index_url: String,
    #[serde(alias = "article_selector")]
    pub article_link_selector: String,
    pub title_selector: String,
    pub content_selector: String,
    #[serde(default)]
    pub image_selector: Option<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
}

#[derive(Error, Debug)]
pub enum SourceConfigError {
    #[error("invalid index url {url:?}: {source}")]
    InvalidIndexUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid {field} {selector:?}: {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },
}

/// A [`SourceConfig`] with its URL and selectors parsed once, up front.
#[derive(Debug, Clone)]
pub struct CompiledSource {
    pub config: SourceConfig,
    pub index_url: Url,
    pub article_link: Selector,
    pub title: Selector,
    pub content: Selector,
    pub image: Option<Selector>,
    pub date: Option<Selector>,
}

impl SourceConfig {
    pub fn compile(&self) -> Result<CompiledSource, SourceConfigError> {
        let index_url =
            Url::parse(&self.index_url).map_err(|source| SourceConfigError::InvalidIndexUrl {
                url: self.index_url.clone(),
                source,
            })?;

        Ok(CompiledSource {
            config: self.clone(),
            index_url,
            article_link: parse_selector("article_link_selector", &self.article_link_selector)?,
            title: parse_selector("title_selector", &self.title_selector)?,
            content: parse_selector("content_selector", &self.content_selector)?,
            image: parse_optional("image_selector", self.image_selector.as_deref())?,
            date: parse_optional("date_selector", self.date_selector.as_deref())?,
        })
    }
}

impl CompiledSource {
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

fn parse_selector(field: &'static str, selector: &str) -> Result<Selector, SourceConfigError> {
    Selector::parse(selector).map_err(|e| SourceConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Blank optional selectors count as absent.
fn parse_optional(
    field: &'static str,
    selector: Option<&str>,
) -> Result<Option<Selector>, SourceConfigError> {
    match selector.map(str::trim) {
        Some(s) if !s.is_empty() => parse_selector(field, s).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech_news() -> SourceConfig {
        SourceConfig {
            name: "Example Tech News".into(),
            index_url: "https://example.com/tech".into(),
            article_link_selector: "article a".into(),
            title_selector: "h2".into(),
            content_selector: ".content".into(),
            image_selector: Some("img.featured".into()),
            date_selector: None,
        }
    }

    #[test]
    fn test_compile_valid_source() {
        let compiled = tech_news().compile().unwrap();
        assert_eq!(compiled.name(), "Example Tech News");
        assert_eq!(compiled.index_url.as_str(), "https://example.com/tech");
        assert!(compiled.image.is_some());
        assert!(compiled.date.is_none());
    }

    #[test]
    fn test_blank_image_selector_is_absent() {
        let mut source = tech_news();
        source.image_selector = Some("   ".into());
        assert!(source.compile().unwrap().image.is_none());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let mut source = tech_news();
        source.title_selector = "h2[".into();

        match source.compile() {
            Err(SourceConfigError::InvalidSelector { field, .. }) => {
                assert_eq!(field, "title_selector")
            }
            other => panic!("expected invalid selector, got {other:?}"),
        }
    }

    #[test]
    fn test_relative_index_url_is_rejected() {
        let mut source = tech_news();
        source.index_url = "/tech".into();
        assert!(matches!(
            source.compile(),
            Err(SourceConfigError::InvalidIndexUrl { .. })
        ));
    }

    #[test]
    fn test_deserializes_short_field_names() {
        let json = r#"{
            "name": "Example Tech News",
            "url": "https://example.com/tech",
            "article_selector": "article",
            "title_selector": "h2",
            "content_selector": ".content",
            "image_selector": "img.featured"
        }"#;

        let source: SourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(source.index_url, "https://example.com/tech");
        assert_eq!(source.article_link_selector, "article");
        assert_eq!(source.image_selector.as_deref(), Some("img.featured"));
        assert_eq!(source.date_selector, None);
    }
}
