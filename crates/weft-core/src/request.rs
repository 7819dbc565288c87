//! Per-request state: attributes, response, markup, and lazy decoding.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use url::form_urlencoded;

use crate::{
    http_date, Action, AttrError, AttributeStore, Flow, MarkupWriter, RequestHead, ResponseHandle,
    Value, WeftError,
};

/// Decoded view of the request URI, computed once.
#[derive(Debug)]
struct DecodedUri {
    uri: Uri,
    params: HashMap<String, String>,
}

/// One in-flight request/response cycle.
///
/// A request owns its attribute store, its outbound response state, and a
/// lazily-created markup writer. It lives on a single transport worker for
/// exactly one cycle and is never shared: all access goes through `&mut`.
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    response: ResponseHandle,
    attrs: AttributeStore,
    markup: Option<MarkupWriter>,
    decoded: Option<DecodedUri>,
    segments: Option<Vec<String>>,
}

impl Request {
    /// Wrap an inbound message. Called by the transport once per cycle.
    pub fn new(head: RequestHead) -> Self {
        Self {
            head,
            response: ResponseHandle::new(),
            attrs: AttributeStore::new(),
            markup: None,
            decoded: None,
            segments: None,
        }
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    /// The raw, undecoded URI string from the request line.
    pub fn raw_uri(&self) -> &str {
        self.head.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseHandle {
        &mut self.response
    }

    /// True while no terminal response exists; see [`ResponseHandle::is_ok`].
    pub fn is_ok(&self) -> bool {
        self.response.is_ok()
    }

    // --- Markup writer ---

    /// The markup writer, created on first use.
    pub fn markup(&mut self) -> &mut MarkupWriter {
        self.markup.get_or_insert_with(MarkupWriter::new)
    }

    /// True once any step has touched the markup writer.
    pub fn has_markup(&self) -> bool {
        self.markup.is_some()
    }

    /// Run a nested action against a fresh, isolated frame stack.
    ///
    /// The current tag is forced into BODY, the open frames are set aside,
    /// and the nested action writes into the same buffer starting from an
    /// empty stack. Whatever the nested action leaves open is closed, and
    /// the caller's frames are restored, on the error path as well as the
    /// success path - an aborted nested action cannot leak unclosed tags
    /// into the surrounding document.
    pub fn exec(&mut self, action: &dyn Action) -> Result<Flow, WeftError> {
        self.markup().start_body();
        let saved = self.markup().take_stack();

        let outcome = action.apply(self);

        // Both exit paths run through here before the result propagates.
        let markup = self.markup();
        markup.end_all();
        markup.restore_stack(saved);
        outcome
    }

    // --- Lazy URI decoding ---

    fn decoded(&mut self) -> Result<&DecodedUri, WeftError> {
        if self.decoded.is_none() {
            let uri: Uri = self.head.uri().parse()?;
            let params = match uri.query() {
                None | Some("") => HashMap::new(),
                Some(q) => form_urlencoded::parse(q.as_bytes()).into_owned().collect(),
            };
            self.decoded = Some(DecodedUri { uri, params });
        }
        Ok(self.decoded.as_ref().expect("cache filled above"))
    }

    /// The parsed request URI. Decoded once, memoized.
    pub fn uri(&mut self) -> Result<&Uri, WeftError> {
        Ok(&self.decoded()?.uri)
    }

    /// A decoded query parameter. Pairs split on the first `=`; a name
    /// with no `=` carries an empty value.
    pub fn param(&mut self, name: &str) -> Result<Option<&str>, WeftError> {
        Ok(self.decoded()?.params.get(name).map(String::as_str))
    }

    /// The full decoded query parameter map.
    pub fn params(&mut self) -> Result<&HashMap<String, String>, WeftError> {
        Ok(&self.decoded()?.params)
    }

    /// Names of all decoded query parameters.
    pub fn param_names(&mut self) -> Result<impl Iterator<Item = &str> + '_, WeftError> {
        Ok(self.decoded()?.params.keys().map(String::as_str))
    }

    /// A query parameter as an integer; missing defaults to 0.
    pub fn param_i64(&mut self, name: &str) -> Result<i64, WeftError> {
        match self.param(name)? {
            None => Ok(0),
            Some(s) => s
                .parse()
                .map_err(|_| AttrError::coerce(name, "i64").into()),
        }
    }

    // --- Lazy path segmentation ---

    fn segments(&mut self) -> Result<&[String], WeftError> {
        if self.segments.is_none() {
            let path = self.decoded()?.uri.path().to_string();
            let mut segments: Vec<String> = path.split('/').map(String::from).collect();
            // Trailing empty segments are dropped, so "/" has length 0.
            while segments.last().is_some_and(String::is_empty) {
                segments.pop();
            }
            self.segments = Some(segments);
        }
        Ok(self.segments.as_deref().expect("cache filled above"))
    }

    /// The i-th path segment, or `None` when out of range.
    ///
    /// Paths begin with `/`, so segment 0 is always the empty string:
    /// `/test/ldb/MDE` segments as `["", "test", "ldb", "MDE"]`.
    pub fn path_segment(&mut self, idx: usize) -> Result<Option<&str>, WeftError> {
        Ok(self.segments()?.get(idx).map(String::as_str))
    }

    /// Number of path segments, counting the leading empty one.
    pub fn path_len(&mut self) -> Result<usize, WeftError> {
        Ok(self.segments()?.len())
    }

    // --- Attributes ---

    pub fn attrs(&self) -> &AttributeStore {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttributeStore {
        &mut self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_present(&self, name: &str) -> bool {
        self.attrs.contains(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attrs.set(name, value);
        self
    }

    /// Set or remove: `None` removes the attribute.
    pub fn set_attr_opt(
        &mut self,
        name: impl Into<String>,
        value: Option<impl Into<Value>>,
    ) -> &mut Self {
        self.attrs.set_opt(name, value);
        self
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    /// Read an attribute, computing and storing it on first access.
    ///
    /// The mapping function may return `None`, in which case nothing is
    /// stored and `None` is returned.
    pub fn attr_or_insert_with<F>(&mut self, name: &str, f: F) -> Result<Option<&Value>, WeftError>
    where
        F: FnOnce(&mut Request) -> Result<Option<Value>, WeftError>,
    {
        if !self.attrs.contains(name) {
            if let Some(value) = f(self)? {
                self.attrs.set(name, value);
            }
        }
        Ok(self.attrs.get(name))
    }

    pub fn attr_i64(&self, name: &str) -> Result<i64, AttrError> {
        self.attrs.get_i64(name)
    }

    pub fn attr_f64(&self, name: &str) -> Result<f64, AttrError> {
        self.attrs.get_f64(name)
    }

    pub fn attr_bool(&self, name: &str) -> Result<bool, AttrError> {
        self.attrs.get_bool(name)
    }

    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attrs.get_string(name)
    }

    // --- Response header conveniences ---

    /// Append a response header, validating name and value.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self, WeftError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.response.headers_mut().append(name, value);
        Ok(self)
    }

    /// Set `Expires` to an absolute instant.
    pub fn expires(&mut self, at: DateTime<Utc>) -> Result<&mut Self, WeftError> {
        let date = http_date(at);
        self.add_header("expires", &date)
    }

    /// Set `Expires` relative to now.
    pub fn expires_in(&mut self, d: Duration) -> Result<&mut Self, WeftError> {
        self.expires(Utc::now() + TimeDelta::seconds(d.as_secs() as i64))
    }

    /// Set `Last-Modified`.
    pub fn last_modified(&mut self, at: DateTime<Utc>) -> Result<&mut Self, WeftError> {
        let date = http_date(at);
        self.add_header("last-modified", &date)
    }

    /// Set a public `Cache-Control` allowing caches to hold the response
    /// for the given duration.
    pub fn max_age(&mut self, d: Duration) -> Result<&mut Self, WeftError> {
        let max = d.as_secs();
        let value = format!(
            "public, max-age={}, s-maxage={}, no-transform",
            max, max
        );
        self.add_header("cache-control", &value)
    }
}
