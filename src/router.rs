//! Exact-match request router.
//!
//! The server answers two routes, both `GET`. The request target is compared
//! verbatim, query string included: `/health/`, `/HEALTH` and `/health?x=1`
//! are not `/health`. Anything else, including any other method, gets a
//! plain-text `404 Not Found`.

use std::sync::Arc;

use crate::health::{self, HealthService};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// A route this server answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Route {
    /// `GET /health`
    Health,
    /// `GET /`
    Info,
}

impl Route {
    pub(crate) fn resolve(method: &http::Method, target: &str) -> Option<Self> {
        if *method != http::Method::GET {
            return None;
        }
        match target {
            "/health" => Some(Self::Health),
            "/" => Some(Self::Info),
            _ => None,
        }
    }
}

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
pub struct Router {
    service: Arc<HealthService>,
}

impl Router {
    pub fn new(service: Arc<HealthService>) -> Self {
        Self { service }
    }

    /// Routes one request and produces its response.
    pub async fn handle(&self, req: &Request) -> Response {
        match Route::resolve(req.method(), req.target()) {
            Some(Route::Health) => health::health(Arc::clone(&self.service)).await,
            Some(Route::Info) => health::info().await.into_response(),
            None => not_found(),
        }
    }
}

fn not_found() -> Response {
    Response::builder().status(Status::NotFound).text("Not Found")
}
