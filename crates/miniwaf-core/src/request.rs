//! The request capability the inspection engine consumes

use serde::{Deserialize, Serialize};

/// Anything that can be inspected: URL, method, origin address, headers,
/// query parameters and body text.
///
/// Implementations must not fail. Missing data is reported as empty values.
pub trait InspectableRequest {
    /// The full request URL, as received
    fn url(&self) -> &str;

    /// The HTTP method
    fn method(&self) -> &str;

    /// The client's address, if the hosting layer knows it
    fn remote_addr(&self) -> Option<&str>;

    /// Header name/value pairs in arrival order
    fn headers(&self) -> Vec<(String, String)>;

    /// Query parameters, first value per key, in order of first appearance
    fn query_params(&self) -> Vec<(String, String)>;

    /// The body as text, or `None` if it is not valid UTF-8
    fn body_text(&self) -> Option<&str>;
}

/// A buffered HTTP request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    /// Header pairs; names are stored lower-case
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new request for the given method and URL
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Create a POST request with a body
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    /// Set the client address
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Append a header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup; repeated headers are joined with `, `
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// The raw query string, without the leading `?`
    pub fn query_string(&self) -> &str {
        let without_fragment = self.url.split('#').next().unwrap_or_default();
        without_fragment
            .split_once('?')
            .map(|(_, query)| query)
            .unwrap_or_default()
    }
}

impl InspectableRequest for HttpRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            match merged.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, joined)) => {
                    joined.push_str(", ");
                    joined.push_str(value);
                }
                None => merged.push((name, value.clone())),
            }
        }
        merged
    }

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(self.query_string().as_bytes()) {
            if !params.iter().any(|(existing, _)| *existing == key) {
                params.push((key.into_owned(), value.into_owned()));
            }
        }
        params
    }

    fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_first_value_wins() {
        let req = HttpRequest::get("http://localhost/search?q=one&page=2&q=two");
        assert_eq!(
            req.query_params(),
            vec![
                ("q".to_string(), "one".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_are_form_decoded() {
        let req = HttpRequest::get("http://localhost/?id=1+UNION%20SELECT");
        assert_eq!(
            req.query_params(),
            vec![("id".to_string(), "1 UNION SELECT".to_string())]
        );
    }

    #[test]
    fn test_query_string_ignores_fragment() {
        let req = HttpRequest::get("http://localhost/page?a=1#section");
        assert_eq!(req.query_string(), "a=1");
        assert_eq!(HttpRequest::get("http://localhost/").query_string(), "");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HttpRequest::get("http://localhost/")
            .with_header("User-Agent", "curl/8.0")
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json");

        assert_eq!(req.header("user-agent").as_deref(), Some("curl/8.0"));
        assert_eq!(
            req.header("ACCEPT").as_deref(),
            Some("text/html, application/json")
        );
        assert_eq!(req.header("cookie"), None);
    }

    #[test]
    fn test_headers_merge_repeated_names() {
        let req = HttpRequest::get("http://localhost/")
            .with_header("X-Forwarded-For", "10.0.0.1")
            .with_header("Host", "localhost")
            .with_header("x-forwarded-for", "10.0.0.2");

        assert_eq!(
            req.headers(),
            vec![
                ("x-forwarded-for".to_string(), "10.0.0.1, 10.0.0.2".to_string()),
                ("host".to_string(), "localhost".to_string()),
            ]
        );
    }

    #[test]
    fn test_binary_body_has_no_text() {
        let req = HttpRequest::post("http://localhost/upload", vec![0xff, 0xfe, 0x00]);
        assert_eq!(req.body_text(), None);

        let req = HttpRequest::post("http://localhost/form", "name=test");
        assert_eq!(req.body_text(), Some("name=test"));
    }
}
