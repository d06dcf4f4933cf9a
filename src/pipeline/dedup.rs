use std::collections::HashSet;

use crate::entities::Article;

/// Drop articles whose `source_url` was already seen, either earlier in the
/// batch or in `known`. First occurrence wins; order is otherwise preserved.
pub fn dedup_by_source_url(batch: Vec<Article>, known: &HashSet<String>) -> Vec<Article> {
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());

    batch
        .into_iter()
        .filter(|article| {
            !known.contains(&article.source_url) && seen.insert(article.source_url.clone())
        })
        .collect()
}
