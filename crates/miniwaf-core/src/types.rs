//! Core types for MiniWAF

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// What a rule does when it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Reject the request
    Block,
    /// Record the match and let the request continue
    Log,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Block => "block",
            Action::Log => "log",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Action::Block)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Action::Block),
            "log" => Ok(Action::Log),
            _ => Err(()),
        }
    }
}

/// Names of the request facets the extractor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetName {
    Url,
    QueryParams,
    Headers,
    PostBody,
}

impl FacetName {
    /// Every facet, in extraction order
    pub const ALL: [FacetName; 4] = [
        FacetName::Url,
        FacetName::QueryParams,
        FacetName::Headers,
        FacetName::PostBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetName::Url => "url",
            FacetName::QueryParams => "query_params",
            FacetName::Headers => "headers",
            FacetName::PostBody => "post_body",
        }
    }
}

impl fmt::Display for FacetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FacetName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or(())
    }
}

/// A single extracted piece of request data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    /// Flat text (url, body)
    Scalar(String),
    /// Ordered key/value pairs (headers, query parameters)
    Mapping(Vec<(String, String)>),
}

impl Facet {
    /// Searchable text for this facet.
    ///
    /// Mappings flatten to `k1=v1&k2=v2` in their stored order.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Facet::Scalar(text) => Cow::Borrowed(text),
            Facet::Mapping(pairs) => {
                let mut out = String::new();
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push('&');
                    }
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Cow::Owned(out)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Facet::Scalar(text) => text.is_empty(),
            Facet::Mapping(pairs) => pairs.is_empty(),
        }
    }
}

impl Default for Facet {
    fn default() -> Self {
        Facet::Scalar(String::new())
    }
}

/// The full set of facets extracted from one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetMap {
    pub url: Facet,
    pub query_params: Facet,
    pub headers: Facet,
    pub post_body: Facet,
}

impl FacetMap {
    pub fn get(&self, name: FacetName) -> &Facet {
        match name {
            FacetName::Url => &self.url,
            FacetName::QueryParams => &self.query_params,
            FacetName::Headers => &self.headers,
            FacetName::PostBody => &self.post_body,
        }
    }
}
