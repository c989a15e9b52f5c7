use serde::Deserialize;

use crate::core::FilterError;

pub const DEFAULT_OPEN_TAG: &str = "<contemplate>";
pub const DEFAULT_CLOSE_TAG: &str = "</contemplate>";

/// Open/close delimiter pair whose enclosed text gets removed.
///
/// Tags are matched literally. A `TagSpec` can only be built through
/// [`TagSpec::new`], [`TagSpec::for_element`] or `Default`, so every value in
/// circulation has two distinct, non-empty delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    open_tag: String,
    close_tag: String,
}

impl TagSpec {
    pub fn new(open_tag: impl Into<String>, close_tag: impl Into<String>) -> Result<Self, FilterError> {
        let open_tag = open_tag.into();
        let close_tag = close_tag.into();

        if open_tag.is_empty() {
            return Err(FilterError::Configuration("open tag must not be empty".to_string()));
        }
        if close_tag.is_empty() {
            return Err(FilterError::Configuration("close tag must not be empty".to_string()));
        }
        if open_tag == close_tag {
            return Err(FilterError::Configuration(format!(
                "open and close tags must differ (both are {:?})",
                open_tag
            )));
        }

        Ok(Self { open_tag, close_tag })
    }

    /// `for_element("think")` gives `<think>` / `</think>`.
    pub fn for_element(name: &str) -> Result<Self, FilterError> {
        if name.is_empty() {
            return Err(FilterError::Configuration("element name must not be empty".to_string()));
        }
        Self::new(format!("<{}>", name), format!("</{}>", name))
    }

    pub fn open_tag(&self) -> &str {
        &self.open_tag
    }

    pub fn close_tag(&self) -> &str {
        &self.close_tag
    }

    /// Upper bound on how many bytes the streaming filter may hold back.
    pub fn max_holdback(&self) -> usize {
        self.open_tag.len().max(self.close_tag.len()) - 1
    }
}

impl Default for TagSpec {
    fn default() -> Self {
        Self {
            open_tag: DEFAULT_OPEN_TAG.to_string(),
            close_tag: DEFAULT_CLOSE_TAG.to_string(),
        }
    }
}

/// Deserializable form of a [`TagSpec`], for callers loading the tag pair
/// from their own configuration.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    #[serde(default = "default_open_tag")]
    pub open_tag: String,
    #[serde(default = "default_close_tag")]
    pub close_tag: String,
}

fn default_open_tag() -> String {
    DEFAULT_OPEN_TAG.to_string()
}

fn default_close_tag() -> String {
    DEFAULT_CLOSE_TAG.to_string()
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
        }
    }
}

impl FilterOptions {
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_tag_spec(self) -> Result<TagSpec, FilterError> {
        TagSpec::try_from(self)
    }
}

impl TryFrom<FilterOptions> for TagSpec {
    type Error = FilterError;

    fn try_from(options: FilterOptions) -> Result<Self, Self::Error> {
        TagSpec::new(options.open_tag, options.close_tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatStreamItem {
    pub content: String,
    pub done: bool,
}

impl ChatStreamItem {
    pub fn chunk(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: true,
        }
    }
}
