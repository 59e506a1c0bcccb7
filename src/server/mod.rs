//! Server lifecycle: one plain HTTP listener for liveness probes and one
//! gRPC listener for the file API.
//!
//! ```text
//! Created -> Starting -> Running -> ShuttingDown -> Stopped
//! ```
//!
//! Both listeners are bound before the server reports `Running`, so a bind
//! or TLS failure is returned from [`Server::start`] instead of leaving the
//! process up with one dead listener. While running, each listener is a
//! supervised task: if one exits, [`Server::wait`] returns early.
//!
//! Shutdown runs three steps in order and always runs all of them:
//! 1. HTTP graceful stop, bounded by `shutdown_grace` (force-close at the deadline)
//! 2. gRPC stop, immediate; open connections are cut
//! 3. gRPC socket close

pub mod grpc;
pub mod http;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::types::{RelayError, Result};
use grpc::GrpcListener;
use http::HttpListener;

pub const DEFAULT_SERVICE_NAME: &str = "filerelay";
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Certificate and key used for transport encryption on the gRPC listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsConfig {
    /// Transport encryption is only enabled when both paths are present.
    pub fn from_paths(cert: Option<PathBuf>, key: Option<PathBuf>) -> Option<Self> {
        let non_empty = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());
        match (non_empty(cert), non_empty(key)) {
            (Some(cert_path), Some(key_path)) => Some(Self {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            (cert, key) => {
                warn!(
                    cert = ?cert,
                    key = ?key,
                    "only one of certificate/key supplied, gRPC will serve in cleartext"
                );
                None
            }
        }
    }
}

/// Immutable server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_address: SocketAddr,
    pub grpc_address: SocketAddr,
    pub tls: Option<TlsConfig>,
    /// Name reported as SERVING by the gRPC health check
    pub service_name: String,
    /// Budget for the HTTP graceful stop
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn new(http_address: SocketAddr, grpc_address: SocketAddr) -> Self {
        Self {
            http_address,
            grpc_address,
            tls: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_tls(mut self, tls: Option<TlsConfig>) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Reported by a listener task when it stops on its own
#[derive(Debug)]
pub struct ListenerExit {
    pub listener: &'static str,
    pub reason: String,
}

struct ListenerSet {
    http: HttpListener,
    grpc: GrpcListener,
    exits: mpsc::UnboundedReceiver<ListenerExit>,
}

pub struct Server {
    config: ServerConfig,
    http_app: Router,
    state: ServerState,
    listeners: Option<ListenerSet>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            http_app: http::router(),
            state: ServerState::Created,
            listeners: None,
        }
    }

    /// Serve `app` on the HTTP listener in place of [`http::router`].
    pub fn with_http_router(mut self, app: Router) -> Self {
        self.http_app = app;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Bound HTTP address, available once running
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.listeners.as_ref().map(|l| l.http.local_addr())
    }

    /// Bound gRPC address, available once running
    pub fn grpc_addr(&self) -> Option<SocketAddr> {
        self.listeners.as_ref().map(|l| l.grpc.local_addr())
    }

    /// Bind both listeners and start serving in the background.
    pub async fn start(&mut self) -> Result<()> {
        self.expect_state(ServerState::Created)?;
        self.state = ServerState::Starting;

        match self.start_listeners().await {
            Ok(listeners) => {
                self.listeners = Some(listeners);
                self.state = ServerState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = ServerState::Stopped;
                Err(e)
            }
        }
    }

    async fn start_listeners(&self) -> Result<ListenerSet> {
        let tls = match &self.config.tls {
            Some(tls) => Some(grpc::load_tls(tls)?),
            None => None,
        };

        let (http_listener, http_addr) = bind("http", self.config.http_address).await?;
        let (grpc_listener, grpc_addr) = bind("grpc", self.config.grpc_address).await?;

        let (exit_tx, exits) = mpsc::unbounded_channel();
        let grpc = GrpcListener::start(
            grpc_listener,
            grpc_addr,
            &self.config.service_name,
            tls,
            Some(exit_tx.clone()),
        )?;
        let http = HttpListener::start(
            http_listener,
            http_addr,
            self.http_app.clone(),
            Some(exit_tx),
        );

        Ok(ListenerSet { http, grpc, exits })
    }

    /// Block until `shutdown` resolves or a listener dies.
    pub async fn wait<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.expect_state(ServerState::Running)?;
        let listeners = self
            .listeners
            .as_mut()
            .ok_or(RelayError::InvalidState {
                expected: ServerState::Running,
                actual: self.state,
            })?;

        tokio::select! {
            _ = shutdown => Ok(()),
            Some(exit) = listeners.exits.recv() => {
                error!(listener = exit.listener, reason = %exit.reason, "listener exited");
                Err(RelayError::ListenerExited {
                    listener: exit.listener,
                    reason: exit.reason,
                })
            }
        }
    }

    /// Tear both listeners down. Every step runs even if an earlier one failed.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.expect_state(ServerState::Running)?;
        self.state = ServerState::ShuttingDown;
        info!("stopping server...");

        let mut failures = Vec::new();
        if let Some(listeners) = self.listeners.take() {
            let ListenerSet { http, grpc, .. } = listeners;

            if let Err(e) = http.shutdown(self.config.shutdown_grace).await {
                error!("failed to shutdown http server: {}", e);
                failures.push(e);
            }

            grpc.stop();
            if let Err(e) = grpc.close().await {
                error!("{}", e);
                failures.push(e);
            }
        }

        self.state = ServerState::Stopped;
        if failures.is_empty() {
            info!("server stopped");
            Ok(())
        } else {
            Err(RelayError::ShutdownFailure(failures))
        }
    }

    /// Start, serve until SIGINT/SIGTERM, then shut down.
    pub async fn run(mut self) -> Result<()> {
        self.start().await?;
        let waited = self.wait(shutdown_signal()).await;
        let stopped = self.shutdown().await;
        waited.and(stopped)
    }

    fn expect_state(&self, expected: ServerState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RelayError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

async fn bind(listener: &'static str, address: SocketAddr) -> Result<(TcpListener, SocketAddr)> {
    let bind_failure = |source| RelayError::BindFailure {
        listener,
        address,
        source,
    };
    let tcp = TcpListener::bind(address).await.map_err(bind_failure)?;
    let local = tcp.local_addr().map_err(bind_failure)?;
    Ok((tcp, local))
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received interrupt"),
        _ = terminate => info!("received termination request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_requires_both_paths() {
        assert!(TlsConfig::from_paths(None, None).is_none());
        assert!(TlsConfig::from_paths(Some("a.crt".into()), None).is_none());
        assert!(TlsConfig::from_paths(None, Some("a.key".into())).is_none());
        assert!(TlsConfig::from_paths(Some("".into()), Some("a.key".into())).is_none());

        let tls = TlsConfig::from_paths(Some("a.crt".into()), Some("a.key".into())).unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("a.crt"));
        assert_eq!(tls.key_path, PathBuf::from("a.key"));
    }

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::new(
            "127.0.0.1:8080".parse().unwrap(),
            "127.0.0.1:8081".parse().unwrap(),
        );
        assert_eq!(config.service_name, "filerelay");
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert!(config.tls.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_rejected() {
        let mut server = Server::new(ServerConfig::new(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:0".parse().unwrap(),
        ));
        assert!(matches!(
            server.shutdown().await,
            Err(RelayError::InvalidState {
                expected: ServerState::Running,
                actual: ServerState::Created,
            })
        ));
        assert_eq!(server.state(), ServerState::Created);
    }
}
