//! Incoming HTTP request type.

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};

/// An incoming HTTP request with its body already collected.
///
/// The hyper adapter builds one per request; tests and hosts that do their own
/// I/O can build one from any `http::Request<Bytes>`:
///
/// ```rust
/// use braid::Request;
///
/// let req = Request::from(http::Request::get("/users/42").body(bytes::Bytes::new()).unwrap());
/// assert_eq!(req.path(), "/users/42");
/// ```
#[derive(Debug)]
pub struct Request {
    parts: Parts,
    body: Bytes,
}

impl Request {
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Host-specific values attached by the surrounding server (peer address,
    /// TLS info...). Middleware-to-middleware values belong in
    /// [`Context`](crate::Context) instead.
    pub fn extensions(&self) -> &Extensions { &self.parts.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.parts.extensions }

    /// Header lookup; `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    pub fn into_parts(self) -> (Parts, Bytes) {
        (self.parts, self.body)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
