//! Error types for MiniWAF

use std::path::PathBuf;

/// Result type alias using MiniWAF's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for MiniWAF operations.
///
/// Every variant is a load-time failure: a rule set that produces one of
/// these is never installed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rule source could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed
    #[error("malformed rule document: {0}")]
    Parse(String),

    /// The document has no `rules` collection
    #[error("rule document has no `rules` collection")]
    MissingRules,

    /// A rule entry lacks a required field
    #[error("rule #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// A rule has an empty target list
    #[error("rule `{id}`: target list is empty")]
    EmptyTarget { id: String },

    /// A rule targets a facet the extractor does not produce
    #[error("rule `{id}`: unknown target facet `{facet}`")]
    UnknownFacet { id: String, facet: String },

    /// A rule action is neither `block` nor `log`
    #[error("rule `{id}`: unknown action `{action}`")]
    UnknownAction { id: String, action: String },

    /// A rule pattern does not compile
    #[error("rule `{id}`: invalid pattern: {message}")]
    InvalidPattern { id: String, message: String },

    /// Two rules share an id
    #[error("duplicate rule id `{0}`")]
    DuplicateRuleId(String),
}

impl Error {
    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

