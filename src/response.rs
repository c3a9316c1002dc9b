//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Route functions build a [`Response`] (or anything that converts into one).
//! JSON payloads go through [`Json`], which pretty-prints the body and marks
//! it readable from any origin.

use bytes::Bytes;
use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use tracing::error;

use crate::status::Status;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: HeaderMap,
    pub(crate) status: StatusCode,
}

impl Response {
    /// Response with no body.
    pub(crate) fn status(code: Status) -> Self {
        Self { body: Vec::new(), headers: HeaderMap::new(), status: code.into() }
    }

    /// Defaults to `Status::Ok` (200).
    pub(crate) fn builder() -> ResponseBuilder {
        ResponseBuilder { status: Status::Ok }
    }

    /// Converts into the hyper-facing response.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }

    #[cfg(test)]
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

pub(crate) struct ResponseBuilder {
    status: Status,
}

impl ResponseBuilder {
    pub(crate) fn status(mut self, code: Status) -> Self {
        self.status = code;
        self
    }

    /// Terminate with a JSON body, readable from any origin.
    pub(crate) fn json(self, body: Vec<u8>) -> Response {
        let mut res = self.finish(APPLICATION_JSON, body);
        res.headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        res
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub(crate) fn text(self, body: &str) -> Response {
        self.finish(TEXT_PLAIN, body.as_bytes().to_vec())
    }

    fn finish(self, content_type: &'static str, body: Vec<u8>) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { body, headers, status: self.status.into() }
    }
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// Serialises `T` as an indented JSON body with `access-control-allow-origin: *`.
///
/// Serialisation failure turns into an empty `500`.
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(bytes) => Response::builder().json(bytes),
            Err(e) => {
                error!("json serialisation failed: {e}");
                Response::status(Status::InternalServerError)
            }
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

/// Overrides the status of any response: `(Status::ServiceUnavailable, Json(report))`.
///
/// A `500` produced by the inner conversion is kept as is.
impl<R: IntoResponse> IntoResponse for (Status, R) {
    fn into_response(self) -> Response {
        let mut res = self.1.into_response();
        if res.status != StatusCode::INTERNAL_SERVER_ERROR {
            res.status = self.0.into();
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Serialize)]
    struct Report {
        status: &'static str,
    }

    #[test]
    fn json_wrapper_is_pretty_and_cors_enabled() {
        let res = Json(Report { status: "healthy" }).into_response();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("Content-Type"), Some("application/json"));
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            std::str::from_utf8(&res.body).unwrap(),
            "{\n  \"status\": \"healthy\"\n}"
        );
    }

    #[test]
    fn status_tuple_overrides_status() {
        let res = (Status::ServiceUnavailable, Json(Report { status: "unhealthy" })).into_response();
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[test]
    fn status_tuple_keeps_serialisation_failure() {
        // Non-string map keys cannot be serialised as JSON.
        let bad: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let res = (Status::ServiceUnavailable, Json(bad)).into_response();
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body.is_empty());
    }

    #[test]
    fn text_has_no_cors_header() {
        let res = Response::builder().status(Status::NotFound).text("Not Found").into_inner();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
        assert!(res.headers().get("access-control-allow-origin").is_none());
        assert_eq!(res.headers().len(), 1);
    }
}
