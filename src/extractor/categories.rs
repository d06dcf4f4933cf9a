use std::collections::BTreeSet;

/// Assigns categories to an extracted article.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, title: &str, content: &str) -> BTreeSet<String>;
}

/// Gives every article the same fixed set of categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCategories {
    categories: BTreeSet<String>,
}

impl StaticCategories {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticCategories {
    fn default() -> Self {
        Self::new(["technology"])
    }
}

impl CategoryClassifier for StaticCategories {
    fn classify(&self, _title: &str, _content: &str) -> BTreeSet<String> {
        self.categories.clone()
    }
}
