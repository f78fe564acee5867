use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while turning an MPD into a manifest.
///
/// None of these are recoverable: the tool produces test fixtures, so any
/// deviation from the expected MPD shape aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    /// A query that must match exactly one node matched zero or several
    #[error("XPath {expr:?} should have returned 1 result, got {count}")]
    Cardinality { expr: String, count: usize },

    /// A duration, integer or byte range string did not have the expected shape
    #[error("Invalid {what}: {value:?}")]
    Format { what: &'static str, value: String },

    #[error("Invalid path expression {expr:?}: {reason}")]
    Query { expr: String, reason: String },

    #[error("Malformed XML document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML document: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn format(what: &'static str, value: impl Into<String>) -> Self {
        Self::Format {
            what,
            value: value.into(),
        }
    }

    pub fn query(expr: &str, reason: impl Into<String>) -> Self {
        Self::Query {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
