//! Transport-boundary types.
//!
//! The core does not define wire framing. The hosting HTTP engine builds a
//! [`RequestHead`] from whatever it parsed, and reads the
//! [`ResponseHandle`] back out once dispatch returns.

use chrono::{DateTime, Utc};
use http::{HeaderMap, Method, StatusCode};

/// Inbound request data as provided by the transport.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: String,
    headers: HeaderMap,
}

impl RequestHead {
    /// Create a head from the request line.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Attach the inbound header map.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw, undecoded request URI string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A response body: bytes plus their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    body: Vec<u8>,
    content_type: String,
}

impl Entity {
    pub fn new(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
        }
    }

    /// An HTML entity (`text/html; charset=utf-8`).
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body.into().into_bytes(), "text/html; charset=utf-8")
    }

    /// A plain-text entity (`text/plain; charset=utf-8`).
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(body.into().into_bytes(), "text/plain; charset=utf-8")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Outbound response state owned by the request.
///
/// The transport reads status, headers and entity from here after dispatch
/// completes.
#[derive(Debug, Default)]
pub struct ResponseHandle {
    status: Option<StatusCode>,
    headers: HeaderMap,
    entity: Option<Entity>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status code, if any step set one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn set_entity(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    pub fn take_entity(&mut self) -> Option<Entity> {
        self.entity.take()
    }

    /// The single source of truth for "is this response still open":
    /// no status code other than 200, and no entity attached.
    pub fn is_ok(&self) -> bool {
        self.status.map_or(true, |s| s == StatusCode::OK) && self.entity.is_none()
    }
}

/// Format an instant as an RFC 7231 HTTP-date, e.g.
/// `Tue, 29 Mar 2016 12:27:11 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // === Entity Tests ===

    #[test]
    fn test_entity_html() {
        let entity = Entity::html("<p>hi</p>");
        assert_eq!(entity.body(), b"<p>hi</p>");
        assert_eq!(entity.content_type(), "text/html; charset=utf-8");
        assert_eq!(entity.len(), 9);
    }

    #[test]
    fn test_entity_text_lossy() {
        let entity = Entity::new(vec![0xff, 0xfe], "application/octet-stream");
        assert_eq!(entity.text_lossy(), "\u{fffd}\u{fffd}");
    }

    // === ResponseHandle Tests ===

    #[test]
    fn test_is_ok_when_untouched() {
        let resp = ResponseHandle::new();
        assert!(resp.is_ok());
    }

    #[test]
    fn test_is_ok_with_explicit_200() {
        let mut resp = ResponseHandle::new();
        resp.set_status(StatusCode::OK);
        assert!(resp.is_ok());
    }

    #[test]
    fn test_not_ok_with_error_status() {
        let mut resp = ResponseHandle::new();
        resp.set_status(StatusCode::NOT_FOUND);
        assert!(!resp.is_ok());
    }

    #[test]
    fn test_not_ok_with_entity() {
        let mut resp = ResponseHandle::new();
        resp.set_entity(Entity::text("done"));
        assert!(!resp.is_ok());
    }

    // === http_date Tests ===

    #[test]
    fn test_http_date_format() {
        let at = Utc.with_ymd_and_hms(2016, 3, 29, 12, 27, 11).unwrap();
        assert_eq!(http_date(at), "Tue, 29 Mar 2016 12:27:11 GMT");
    }
}
