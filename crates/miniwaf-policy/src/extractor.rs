//! Request facet extraction

use miniwaf_core::{Facet, FacetMap, InspectableRequest};

/// Extract the comparable facets of a request.
///
/// Never fails: a body that is not UTF-8 becomes an empty `post_body`.
pub fn extract<R: InspectableRequest + ?Sized>(request: &R) -> FacetMap {
    FacetMap {
        url: Facet::Scalar(request.url().to_string()),
        query_params: Facet::Mapping(request.query_params()),
        headers: Facet::Mapping(request.headers()),
        post_body: Facet::Scalar(request.body_text().unwrap_or_default().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniwaf_core::{FacetName, HttpRequest};

    #[test]
    fn test_extracts_all_facets() {
        let req = HttpRequest::post("http://localhost/login?next=/home", "user=admin")
            .with_header("Host", "localhost")
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        let facets = extract(&req);

        assert_eq!(
            facets.get(FacetName::Url).as_text(),
            "http://localhost/login?next=/home"
        );
        assert_eq!(facets.get(FacetName::QueryParams).as_text(), "next=/home");
        assert_eq!(
            facets.get(FacetName::Headers).as_text(),
            "host=localhost&content-type=application/x-www-form-urlencoded"
        );
        assert_eq!(facets.get(FacetName::PostBody).as_text(), "user=admin");
    }

    #[test]
    fn test_missing_data_yields_empty_facets() {
        let facets = extract(&HttpRequest::get("http://localhost/"));

        assert!(facets.query_params.is_empty());
        assert!(facets.headers.is_empty());
        assert!(facets.post_body.is_empty());
    }

    #[test]
    fn test_binary_body_yields_empty_text() {
        let req = HttpRequest::post("http://localhost/upload", vec![0xc3, 0x28, 0xff]);
        assert_eq!(extract(&req).post_body, Facet::Scalar(String::new()));
    }
}
