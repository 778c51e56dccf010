use std::time::Duration;

use bytes::Bytes;

/// Response from HTTP request
///
/// The payload is kept as received; [`Response::text`] and
/// [`Response::pretty_text`] are derived views.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty for unregistered codes
    pub status_text: String,
    /// Header pairs in the order received
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub content_length: u64,
    /// From just before the request was sent until the body was fully read
    pub elapsed: Duration,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// First header value matching `name`, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values for `name`, ignoring case
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as UTF-8, `None` when it has no text representation
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Body text, re-indented when it parses as JSON
    pub fn pretty_text(&self) -> Option<String> {
        let text = self.text()?;
        let formatted = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| text.to_string()),
            Err(_) => text.to_string(),
        };
        Some(formatted)
    }

    /// `"200 OK"` style status line
    pub fn status_line(&self) -> String {
        if self.status_text.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.status_text)
        }
    }
}
