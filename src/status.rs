//! HTTP status codes this server produces.

use http::StatusCode;

/// The status codes the health server can answer with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                  // 200
    NotFound,            // 404
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl From<Status> for StatusCode {
    fn from(s: Status) -> StatusCode {
        match s {
            Status::Ok                  => StatusCode::OK,
            Status::NotFound            => StatusCode::NOT_FOUND,
            Status::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Status::ServiceUnavailable  => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
