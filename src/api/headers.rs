//! Header parsing utilities for content negotiation.

use axum::http::{header, HeaderMap};

/// Extension trait for convenient header parsing.
pub trait HeaderMapExt {
    /// Get a header value as a string, returning None if missing.
    fn get_str(&self, name: impl header::AsHeaderName) -> Option<&str>;

    /// Get a header value parsed as a type, returning None if missing or invalid.
    fn get_parsed<T: std::str::FromStr>(&self, name: impl header::AsHeaderName) -> Option<T>;

    /// Declared body length, if the client sent a usable `Content-Length`.
    fn content_length(&self) -> Option<u64>;

    /// Whether the `Accept` header admits a JSON response.
    ///
    /// A missing or empty header is treated as `*/*`.
    fn accepts_json(&self) -> bool;

    /// Whether `Content-Type` declares a JSON body.
    fn has_json_content_type(&self) -> bool;
}

impl HeaderMapExt for HeaderMap {
    fn get_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    fn get_parsed<T: std::str::FromStr>(&self, name: impl header::AsHeaderName) -> Option<T> {
        self.get_str(name).and_then(|v| v.trim().parse().ok())
    }

    fn content_length(&self) -> Option<u64> {
        self.get_parsed(header::CONTENT_LENGTH)
    }

    fn accepts_json(&self) -> bool {
        let values: Vec<&str> = self
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if values.iter().all(|v| v.trim().is_empty()) {
            return true;
        }

        values
            .iter()
            .flat_map(|v| v.split(','))
            .filter_map(media_range)
            .any(|(range, q)| q > 0.0 && admits_json(&range))
    }

    fn has_json_content_type(&self) -> bool {
        self.get_str(header::CONTENT_TYPE)
            .map(|v| v.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }
}

/// Split one `Accept` entry into its lowercase media range and quality
fn media_range(entry: &str) -> Option<(String, f32)> {
    let mut parts = entry.split(';');
    let range = parts.next()?.trim().to_ascii_lowercase();
    if range.is_empty() {
        return None;
    }
    let q = parts
        .filter_map(|p| p.trim().strip_prefix("q="))
        .find_map(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0);
    Some((range, q))
}

fn admits_json(range: &str) -> bool {
    matches!(range, "*/*" | "application/*" | "application/json") || range.ends_with("+json")
}
