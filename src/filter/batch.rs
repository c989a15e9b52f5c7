use regex::Regex;

use crate::core::{FilterError, TagSpec};

/// Removes complete `open … close` spans from fully materialized text.
///
/// Matching is non-greedy and spans may cross lines. An open tag with no
/// close tag after it is left in place along with everything that follows.
#[derive(Debug, Clone)]
pub struct BatchFilter {
    pattern: Regex,
}

impl BatchFilter {
    pub fn new(spec: &TagSpec) -> Result<Self, FilterError> {
        let pattern = Regex::new(&format!(
            r"(?s){}.*?{}",
            regex::escape(spec.open_tag()),
            regex::escape(spec.close_tag())
        ))?;
        log::debug!("compiled batch filter for {:?}..{:?}", spec.open_tag(), spec.close_tag());
        Ok(Self { pattern })
    }

    pub fn contains_span(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }

    pub fn apply(&self, content: &str) -> String {
        self.pattern.replace_all(content, "").into_owned()
    }
}

/// One-shot form of [`BatchFilter::apply`].
pub fn strip_tags(content: &str, spec: &TagSpec) -> Result<String, FilterError> {
    Ok(BatchFilter::new(spec)?.apply(content))
}
