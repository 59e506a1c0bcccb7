//! gRPC listener hosting the file API and the health service
//!
//! tonic spawns every accepted connection on its own detached task, so
//! aborting the serve task alone leaves open connections serving. Each
//! accepted socket is wrapped in a [`StoppableStream`] that fails all I/O
//! once the listener's stop token fires, which makes hyper drop it.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tonic::transport::server::{Connected, TcpConnectInfo};
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tonic_health::pb::health_server::HealthServer;
use tracing::{debug, info};

use super::{ListenerExit, TlsConfig};
use crate::api::{ApiServer, FileService, HealthService};
use crate::types::{RelayError, Result};

/// Build the rustls server config from PEM certificate and key files.
pub fn load_tls(tls: &TlsConfig) -> Result<ServerTlsConfig> {
    let cert = std::fs::read(&tls.cert_path)
        .map_err(|e| RelayError::Tls(format!("{}: {}", tls.cert_path.display(), e)))?;
    let key = std::fs::read(&tls.key_path)
        .map_err(|e| RelayError::Tls(format!("{}: {}", tls.key_path.display(), e)))?;
    Ok(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
}

/// Accepted connection that errors on every read and write after `stop`
struct StoppableStream {
    inner: TcpStream,
    token: CancellationToken,
    stopped: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl StoppableStream {
    fn new(inner: TcpStream, token: CancellationToken) -> Self {
        let stopped = Box::pin(token.clone().cancelled_owned());
        Self {
            inner,
            token,
            stopped,
        }
    }

    /// Registers the waker on the stop token so a connection parked on a
    /// read is woken and torn down as soon as the listener stops.
    fn poll_stopped(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        if self.token.is_cancelled() || self.stopped.as_mut().poll(cx).is_ready() {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "gRPC listener stopped",
            ));
        }
        Ok(())
    }
}

impl AsyncRead for StoppableStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Err(e) = self.poll_stopped(cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for StoppableStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Err(e) = self.poll_stopped(cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        if let Err(e) = self.poll_stopped(cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if let Err(e) = self.poll_stopped(cx) {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Connected for StoppableStream {
    type ConnectInfo = TcpConnectInfo;

    fn connect_info(&self) -> Self::ConnectInfo {
        self.inner.connect_info()
    }
}

/// A running gRPC listener
pub struct GrpcListener {
    local_addr: SocketAddr,
    stop_token: CancellationToken,
    task: JoinHandle<()>,
}

impl GrpcListener {
    /// Spawn the gRPC server on an already bound listener.
    ///
    /// TLS setup happens here, before anything is spawned, so a bad
    /// certificate is reported to the caller instead of killing the task.
    pub fn start(
        listener: TcpListener,
        local_addr: SocketAddr,
        service_name: &str,
        tls: Option<ServerTlsConfig>,
        exit_tx: Option<mpsc::UnboundedSender<ListenerExit>>,
    ) -> Result<Self> {
        let encrypted = tls.is_some();
        let mut builder = Server::builder();
        if let Some(tls) = tls {
            builder = builder
                .tls_config(tls)
                .map_err(|e| RelayError::Tls(format!("{:?}", e)))?;
        }

        let router = builder
            .add_service(HealthServer::new(HealthService::new(service_name)))
            .add_service(ApiServer::new(FileService::new()));
        let stop_token = CancellationToken::new();
        let conn_token = stop_token.clone();
        let incoming = TcpListenerStream::new(listener)
            .map(move |accepted| accepted.map(|tcp| StoppableStream::new(tcp, conn_token.clone())));

        let task = tokio::spawn(async move {
            let reason = match router.serve_with_incoming(incoming).await {
                Ok(()) => "server returned".to_string(),
                Err(e) => e.to_string(),
            };
            if let Some(tx) = exit_tx {
                let _ = tx.send(ListenerExit {
                    listener: "grpc",
                    reason,
                });
            }
        });

        info!(
            "listen gRPC: {} ({})",
            local_addr,
            if encrypted { "tls" } else { "cleartext" }
        );
        Ok(Self {
            local_addr,
            stop_token,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop immediately. Open connections fail their next I/O, so in-flight
    /// calls are cut; there is no grace period.
    pub fn stop(&self) {
        self.stop_token.cancel();
        self.task.abort();
    }

    /// Wait for the serve task to unwind, which drops the TCP listener.
    pub async fn close(self) -> std::result::Result<(), String> {
        match self.task.await {
            Err(e) if !e.is_cancelled() => Err(format!("failed to close gRPC listener: {}", e)),
            _ => {
                debug!("gRPC listener closed");
                Ok(())
            }
        }
    }
}
