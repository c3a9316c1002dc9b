//! The health check and the two endpoints built on it.
//!
//! | Path | Answer |
//! |---|---|
//! | `GET /health` | `200` + [`HealthReport`], or `503` + [`ErrorReport`] |
//! | `GET /` | `200` + [`InfoReport`] |
//!
//! Only one thing makes the service unhealthy: its entry point cannot be
//! resolved. Missing dependencies and an unreadable uptime are reported as
//! data inside a `200`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thakii_health::{Config, HealthService, Router, Server};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let service = Arc::new(HealthService::from_config(&config));
//! Server::bind(&config.bind_addr()).await?.serve(Router::new(service)).await?;
//! # Ok(()) }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::entry_point::{DEFAULT_MODULE, DEFAULT_SYMBOL, EntryPoint, ModuleLocator, Unresolved};
use crate::probe::DependencyProbe;
use crate::report::{ErrorReport, HealthReport, InfoReport};
use crate::response::{IntoResponse, Json, Response};
use crate::status::Status;
use crate::uptime::{ProcUptime, UptimeSource};

/// Why the health check could not produce a [`HealthReport`].
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("cannot resolve application entry point: {0}")]
    EntryPoint(#[from] Unresolved),
}

/// Everything the health check consults, wired once at startup.
pub struct HealthService {
    entry_point: EntryPoint,
    dependencies: DependencyProbe,
    uptime: Box<dyn UptimeSource>,
}

impl HealthService {
    pub fn new(
        entry_point: EntryPoint,
        dependencies: DependencyProbe,
        uptime: impl UptimeSource + 'static,
    ) -> Self {
        Self { entry_point, dependencies, uptime: Box::new(uptime) }
    }

    /// Production wiring: `src.main:CommandLineArgRunner` under the configured
    /// application roots, the opencv/fpdf2/numpy probe over the configured
    /// search path, and `/proc/uptime`.
    pub fn from_config(config: &Config) -> Self {
        let locator = |root: PathBuf| ModuleLocator::new(root, DEFAULT_MODULE, DEFAULT_SYMBOL);

        let mut entry_point = EntryPoint::new(locator(config.roots.primary.clone()));
        if let Some(fallback) = &config.roots.fallback {
            entry_point = entry_point.with_fallback(locator(fallback.clone()));
        }

        Self::new(
            entry_point,
            DependencyProbe::conversion_stack(config.search_path()),
            ProcUptime::default(),
        )
    }

    pub fn dependencies(&self) -> &DependencyProbe { &self.dependencies }

    /// Runs the health check.
    ///
    /// Fails only when the entry point cannot be resolved; every other
    /// sub-check is folded into the report whatever its outcome.
    pub fn check(&self) -> Result<HealthReport, Fault> {
        self.entry_point.resolve()?;

        let uptime = self.uptime.uptime();
        let dependencies = self.dependencies.run();
        Ok(HealthReport::healthy(uptime, dependencies))
    }
}

/// `GET /health`.
///
/// The check touches the filesystem, so it runs on the blocking pool.
pub async fn health(service: Arc<HealthService>) -> Response {
    match tokio::task::spawn_blocking(move || service.check()).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(fault)) => {
            warn!("health check failed: {fault}");
            unhealthy(fault.to_string())
        }
        Err(e) => {
            warn!("health check aborted: {e}");
            unhealthy(format!("health check aborted: {e}"))
        }
    }
}

fn unhealthy(error: String) -> Response {
    (Status::ServiceUnavailable, Json(ErrorReport::new(error))).into_response()
}

/// `GET /`.
pub async fn info() -> Json<InfoReport> {
    Json(InfoReport::new())
}
