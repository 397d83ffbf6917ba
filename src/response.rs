//! Outgoing response type and the [`IntoResponse`] conversion trait.
//!
//! Decorators receive the inner callable's [`Response`] by value and may
//! replace or rewrite it on the way out. veneer itself never inspects the
//! bytes — it moves them.

use bytes::Bytes;
use http::StatusCode;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use veneer::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use veneer::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::from(body.into()),
        }
    }

    /// `200 OK` with an `application/json` body. Takes bytes — serialize with
    /// whatever you like; veneer does not care how you build them.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.into(),
        }
    }

    /// Status-only response, empty body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: Vec::new() }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Adds a header to an already-built response. Decorators use this to
    /// annotate responses on the way out.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Builder returned by [`Response::builder`].
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Finishes with an `application/json` body.
    pub fn json(mut self, body: impl Into<Bytes>) -> Response {
        self.headers.push(("content-type".into(), "application/json".into()));
        Response { status: self.status, headers: self.headers, body: body.into() }
    }

    /// Finishes with a `text/plain` body.
    pub fn text(mut self, body: impl Into<String>) -> Response {
        self.headers.push(("content-type".into(), "text/plain; charset=utf-8".into()));
        Response { status: self.status, headers: self.headers, body: Bytes::from(body.into()) }
    }

    /// Finishes with an empty body.
    pub fn empty(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }
}

// ── IntoResponse ─────────────────────────────────────────────────────────────

/// Conversion into a [`Response`], so views can return the natural thing:
/// a full `Response`, a bare `StatusCode`, or a string.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}
