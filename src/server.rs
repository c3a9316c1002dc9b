//! HTTP server and graceful shutdown.
//!
//! One tokio task per accepted connection, no worker pool and no connection
//! cap. On SIGINT or SIGTERM the server:
//! 1. stops calling `listener.accept()` and drops the listening socket,
//! 2. asks every open connection to close once its current response is
//!    written, and waits for them,
//! 3. returns from [`Server::serve`].
//!
//! Per-request access lines are never logged.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::request::Request;
use crate::router::Router;

/// A bound HTTP server, ready to serve.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Resolves `addr` (`host:port`; host names allowed) and binds the first
    /// address it resolves to.
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), thakii_health::Error> {
    /// let server = thakii_health::Server::bind("0.0.0.0:8080").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let resolved = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| Error::Resolve { addr: addr.to_owned() })?;
        let listener = TcpListener::bind(resolved).await?;
        Ok(Self { listener })
    }

    /// The address actually bound; differs from the requested one for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `router` until SIGINT or SIGTERM, then drains in-flight
    /// connections and returns.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves.
    pub async fn serve_with_shutdown<S>(self, router: Router, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let Self { listener } = self;
        let router = Arc::new(router);
        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown wins over queued connections.
                biased;

                () = &mut signal => {
                    info!("shutting down health server");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(&router, req).await }
                    });

                    // Idle keep-alive connections are closed on shutdown;
                    // busy ones finish their current response first.
                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), svc).into_owned());

                    tokio::spawn(async move {
                        // Client hang-ups mid-response land here.
                        if let Err(e) = conn.await {
                            debug!(%peer, "connection error: {e}");
                        }
                    });
                }
            }
        }

        drop(listener);
        graceful.shutdown().await;

        info!("health server stopped");
        Ok(())
    }
}

async fn dispatch(
    router: &Router,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let response = router.handle(&Request::from_parts(&req)).await;
    Ok(response.into_inner())
}

/// Resolves on the first SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// If a handler cannot be installed, that signal is logged and ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;
    use crate::entry_point::{DEFAULT_MODULE, DEFAULT_SYMBOL, EntryPoint, ModuleLocator};
    use crate::health::HealthService;
    use crate::probe::DependencyProbe;
    use crate::uptime::ProcUptime;

    fn router(root: &std::path::Path) -> Router {
        let service = HealthService::new(
            EntryPoint::new(ModuleLocator::new(root, DEFAULT_MODULE, DEFAULT_SYMBOL)),
            DependencyProbe::new(),
            ProcUptime::default(),
        );
        Router::new(Arc::new(service))
    }

    #[tokio::test]
    async fn serves_until_signalled_and_releases_socket() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let root = tempfile::tempdir().unwrap();
        let router = router(root.path());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(router, async {
            let _ = rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.contains("\"service\": \"Thakii PDF Engine\""), "{raw}");

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        // The port is free again once serve returns.
        TcpListener::bind(addr).await.unwrap();
    }

    #[tokio::test]
    async fn bind_rejects_unresolvable_address() {
        assert!(Server::bind("not an address").await.is_err());
    }
}
