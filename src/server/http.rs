//! Plain HTTP listener hosting the liveness endpoint
//!
//! Accept loop adapted for hyper http1 with TokioIo. Every connection runs
//! in its own task inside a JoinSet owned by the accept task, so aborting
//! that task force-closes every open connection.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::ListenerExit;

/// Pause before accepting again after a listener-level error such as EMFILE
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Router for the liveness endpoint. Only `GET /health` is recognized.
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// A running HTTP listener
pub struct HttpListener {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HttpListener {
    /// Spawn the accept loop on an already bound listener.
    pub fn start(
        listener: TcpListener,
        local_addr: SocketAddr,
        app: Router,
        exit_tx: Option<mpsc::UnboundedSender<ListenerExit>>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            accept_loop(listener, app, shutdown_rx).await;
            if let Some(tx) = exit_tx {
                let _ = tx.send(ListenerExit {
                    listener: "http",
                    reason: "accept loop ended".to_string(),
                });
            }
        });

        info!("listen HTTP: {}", local_addr);
        Self {
            local_addr,
            shutdown_tx,
            task,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let in-flight requests finish within `grace`, then
    /// force-close whatever is still open.
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), String> {
        let _ = self.shutdown_tx.send(true);

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => {
                debug!("HTTP listener drained");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("http listener task failed: {}", e)),
            Err(_) => {
                self.task.abort();
                let _ = (&mut self.task).await;
                warn!("HTTP drain exceeded {:?}, connections force-closed", grace);
                Err(format!(
                    "http graceful stop exceeded {:?}, connections force-closed",
                    grace
                ))
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, app: Router, mut shutdown_rx: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let service = TowerToHyperService::new(app.clone());
                        let mut conn_shutdown = shutdown_rx.clone();
                        connections.spawn(async move {
                            let conn = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service);
                            tokio::pin!(conn);

                            let result = tokio::select! {
                                res = conn.as_mut() => res,
                                _ = conn_shutdown.changed() => {
                                    conn.as_mut().graceful_shutdown();
                                    conn.await
                                }
                            };
                            if let Err(err) = result {
                                debug!("Error serving connection from {}: {:?}", addr, err);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {:?}", e);
                        if let Some(pause) = accept_backoff(&e) {
                            tokio::time::sleep(pause).await;
                        }
                    }
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    // Refuse new connections while the open ones drain
    drop(listener);
    debug!("HTTP draining {} connection(s)", connections.len());
    while connections.join_next().await.is_some() {}
}

/// Errors tied to a single peer retry at once; anything else backs off.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}
