//! Infrastructure error types.
//!
//! A failed health check is not an `Error`: it is a [`Fault`](crate::Fault)
//! turned into a `503` response. These types cover the process itself:
//! reading configuration and binding the listening socket.

use std::io;

/// The error type returned by the server's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not resolve bind address `{addr}`")]
    Resolve { addr: String },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a port number between 0 and 65535, got `{value}`")]
    InvalidPort { var: &'static str, value: String },
}
