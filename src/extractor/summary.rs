const SENTENCE_BOUNDARY: &str = ". ";
const SUMMARY_SENTENCES: usize = 3;
const ELLIPSIS: &str = "...";

/// First three `". "`-separated segments of `content`, rejoined, plus an ellipsis.
///
/// This is a fixed transform, not a summarizer: `"A. B. C. D."` gives `"A. B. C..."`.
pub fn summarize(content: &str) -> String {
    let mut summary = content
        .split(SENTENCE_BOUNDARY)
        .take(SUMMARY_SENTENCES)
        .collect::<Vec<_>>()
        .join(SENTENCE_BOUNDARY);
    summary.push_str(ELLIPSIS);
    summary
}


#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_summary_is_a_prefix_plus_ellipsis(content in ".*") {
            let summary = summarize(&content);
            let body = summary.strip_suffix(ELLIPSIS).unwrap();
            prop_assert!(content.starts_with(body));
            prop_assert!(body.matches(SENTENCE_BOUNDARY).count() < SUMMARY_SENTENCES);
        }
    }
}
