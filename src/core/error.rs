use std::fmt;

#[derive(Debug)]
pub enum FilterError {
    Configuration(String),
    Pattern(regex::Error),
    Json(serde_json::Error),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            FilterError::Pattern(e) => write!(f, "Pattern error: {}", e),
            FilterError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::Configuration(_) => None,
            FilterError::Pattern(e) => Some(e),
            FilterError::Json(e) => Some(e),
        }
    }
}

impl From<regex::Error> for FilterError {
    fn from(err: regex::Error) -> Self {
        FilterError::Pattern(err)
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::Json(err)
    }
}
