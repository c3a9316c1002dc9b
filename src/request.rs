//! Incoming HTTP request type.

/// An incoming HTTP request.
///
/// Only the method and the request target are kept: every route this server
/// answers is a bodyless `GET` matched on its exact target.
pub struct Request {
    method: http::Method,
    target: String,
}

impl Request {
    pub(crate) fn new(method: http::Method, target: String) -> Self {
        Self { method, target }
    }

    /// Keeps the origin-form target (`/path?query`). Absolute-form URIs are
    /// reduced to the same shape.
    pub(crate) fn from_parts<B>(req: &http::Request<B>) -> Self {
        let target = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path(), |pq| pq.as_str());
        Self::new(req.method().clone(), target.to_owned())
    }

    pub fn method(&self) -> &http::Method { &self.method }

    /// Path plus query string, as sent.
    pub fn target(&self) -> &str { &self.target }
}
