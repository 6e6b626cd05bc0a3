//! Locator handling: scheme checks and the `#<index>` table selector.

use url::Url;

/// Schemes the HTML table adapter accepts.
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Lowercased scheme of `uri`, or `None` when it is not a URL.
pub fn scheme_of(uri: &str) -> Option<String> {
    Url::parse(uri).ok().map(|u| u.scheme().to_string())
}

pub fn has_supported_scheme(uri: &str) -> bool {
    scheme_of(uri).is_some_and(|s| SUPPORTED_SCHEMES.contains(&s.as_str()))
}

/// `uri` without its fragment. Everything else is left untouched.
pub fn strip_fragment(uri: &str) -> &str {
    uri.split_once('#').map(|(base, _)| base).unwrap_or(uri)
}

/// Split a locator into the document URI and the table index carried in
/// its fragment.
///
/// Never fails: a missing, empty, negative or non-numeric fragment selects
/// table 0.
pub fn parse_uri(uri: &str) -> (String, usize) {
    let index = uri
        .split_once('#')
        .and_then(|(_, fragment)| fragment.parse::<usize>().ok())
        .unwrap_or(0);
    (strip_fragment(uri).to_string(), index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_numeric_fragment() {
        assert_eq!(parse_uri("http://x/y#2"), ("http://x/y".to_string(), 2));
    }

    #[test]
    fn test_parse_uri_non_numeric_fragment() {
        assert_eq!(parse_uri("http://x/y#abc"), ("http://x/y".to_string(), 0));
    }

    #[test]
    fn test_parse_uri_no_fragment() {
        assert_eq!(parse_uri("http://x/y"), ("http://x/y".to_string(), 0));
    }

    #[test]
    fn test_parse_uri_empty_and_negative_fragment() {
        assert_eq!(parse_uri("http://x/y#"), ("http://x/y".to_string(), 0));
        assert_eq!(parse_uri("http://x/y#-1"), ("http://x/y".to_string(), 0));
    }

    #[test]
    fn test_parse_uri_keeps_query_and_trailing_text() {
        assert_eq!(
            parse_uri("https://example.com/wiki?page=Rust#10"),
            ("https://example.com/wiki?page=Rust".to_string(), 10)
        );
        // No normalization: a bare host keeps its missing slash.
        assert_eq!(parse_uri("http://x#1"), ("http://x".to_string(), 1));
    }

    #[test]
    fn test_parse_uri_not_a_url() {
        assert_eq!(parse_uri("not a uri#3"), ("not a uri".to_string(), 3));
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("HTTPS://example.com"), Some("https".to_string()));
        assert_eq!(scheme_of("file:///tmp/a.html"), Some("file".to_string()));
        assert_eq!(scheme_of("no scheme here"), None);
    }

    #[test]
    fn test_has_supported_scheme() {
        for uri in [
            "http://a/b",
            "https://a/b",
            "ftp://a/b",
            "file:///a/b",
        ] {
            assert!(has_supported_scheme(uri), "{}", uri);
        }
        for uri in ["s3://bucket/key", "postgres://h/db", "mailto:a@b.c", "relative/path"] {
            assert!(!has_supported_scheme(uri), "{}", uri);
        }
    }
}
