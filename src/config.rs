//! Configuration for the file-relay server
//!
//! CLI arguments and environment variables via clap, with an optional TOML
//! file underneath. Values given on the command line (or through the
//! environment) win over the file, the file wins over built-in defaults.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::server::{ServerConfig, TlsConfig, DEFAULT_SERVICE_NAME, DEFAULT_SHUTDOWN_GRACE};
use crate::types::{RelayError, Result};

pub const DEFAULT_HTTP_ADDRESS: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080));
pub const DEFAULT_GRPC_ADDRESS: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8081));

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// file-relay server: gRPC file API plus an HTTP liveness endpoint
#[derive(Parser, Debug, Clone)]
#[command(name = "file-relay")]
#[command(version)]
pub struct ServerArgs {
    /// Optional TOML configuration file
    #[arg(short, long, env = "FILE_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP address to listen on
    #[arg(long, env = "FILE_RELAY_HTTP_ADDRESS")]
    pub http_listen_address: Option<SocketAddr>,

    /// gRPC address to listen on
    #[arg(long, env = "FILE_RELAY_GRPC_ADDRESS")]
    pub grpc_listen_address: Option<SocketAddr>,

    /// Path to signed certificate file
    #[arg(long, env = "FILE_RELAY_TLS_CERT")]
    pub tls_path_cert: Option<PathBuf>,

    /// Path to certificate key file
    #[arg(long, env = "FILE_RELAY_TLS_KEY")]
    pub tls_path_key: Option<PathBuf>,

    /// Service name reported as SERVING by the gRPC health check
    #[arg(long, env = "FILE_RELAY_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FILE_RELAY_LOG_LEVEL", default_value = "info", value_parser = clap::builder::PossibleValuesParser::new(LOG_LEVELS))]
    pub log_level: String,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub http_address: Option<SocketAddr>,
    pub grpc_address: Option<SocketAddr>,
    pub service_name: Option<String>,
    pub shutdown_grace_secs: Option<u64>,
    #[serde(default)]
    pub tls: FileTlsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileTlsConfig {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content).map_err(|e| match e {
            RelayError::Config(msg) => RelayError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RelayError::Config(e.to_string()))
    }
}

impl ServerArgs {
    /// Merge CLI values over the optional config file.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(self.merge(file))
    }

    fn merge(&self, file: FileConfig) -> ServerConfig {
        let http_address = self
            .http_listen_address
            .or(file.http_address)
            .unwrap_or(DEFAULT_HTTP_ADDRESS);
        let grpc_address = self
            .grpc_listen_address
            .or(file.grpc_address)
            .unwrap_or(DEFAULT_GRPC_ADDRESS);

        let tls = TlsConfig::from_paths(
            self.tls_path_cert.clone().or(file.tls.cert_path),
            self.tls_path_key.clone().or(file.tls.key_path),
        );

        let grace = file
            .shutdown_grace_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE);

        ServerConfig::new(http_address, grpc_address)
            .with_tls(tls)
            .with_service_name(
                self.service_name
                    .clone()
                    .or(file.service_name)
                    .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            )
            .with_shutdown_grace(grace)
    }
}
