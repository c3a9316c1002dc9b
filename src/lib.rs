//! # thakii-health
//!
//! Liveness and diagnostic HTTP server for the Thakii PDF engine, the
//! video-to-PDF conversion service. Load balancers, schedulers and deploy
//! probes ask it two things:
//!
//! - `GET /health`: can this instance run its workload? The conversion
//!   service's entry point must resolve; the image, PDF and numeric
//!   dependencies are reported with their versions, or `"missing"`.
//! - `GET /`: what is this instance?
//!
//! The conversion code itself is never run. Everything else is a plain-text
//! `404 Not Found`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thakii_health::{Config, HealthService, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let service = Arc::new(HealthService::from_config(&config));
//!
//!     Server::bind(&config.bind_addr())
//!         .await?
//!         .serve(Router::new(service))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! No TLS, no authentication, no per-request logging: those belong to the
//! proxy or orchestrator in front of it.

mod error;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod config;
pub mod entry_point;
pub mod health;
pub mod probe;
pub mod report;
pub mod uptime;

pub use config::Config;
pub use error::{ConfigError, Error};
pub use health::{Fault, HealthService};
pub use request::Request;
pub use response::{IntoResponse, Json, Response};
pub use router::Router;
pub use server::Server;
