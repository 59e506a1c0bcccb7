//! Transfer client
//!
//! Wraps one gRPC channel. Every step of a push short-circuits: locator,
//! content type, local read, then a single `SetFile` call. Nothing is sent
//! unless all local checks pass.

use std::fmt;
use std::path::{Path, PathBuf};

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, info};

use crate::api::pb::{File, GetFileRequest, SetFileRequest};
use crate::api::{ApiClient, FileObject};
use crate::content_type;
use crate::locator::Locator;
use crate::types::{RelayError, Result};

/// Outcome of a successful push
#[derive(Debug, Clone)]
pub struct PushReceipt {
    pub source: PathBuf,
    pub locator: Locator,
    /// File description echoed back by the server
    pub acknowledged: FileObject,
}

impl fmt::Display for PushReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has been pushed to {}", self.source.display(), self.locator)
    }
}

#[derive(Debug, Clone)]
pub struct TransferClient {
    api: ApiClient<Channel>,
}

impl TransferClient {
    pub fn new(api: ApiClient<Channel>) -> Self {
        Self { api }
    }

    /// Build a client whose channel connects on first use.
    ///
    /// `address` may omit the scheme. With `ca_cert` the connection uses
    /// TLS and trusts that certificate.
    pub fn connect_lazy(address: &str, ca_cert: Option<&Path>) -> Result<Self> {
        let uri = endpoint_uri(address, ca_cert.is_some());
        let connect_err = |reason: String| RelayError::Connect {
            address: uri.clone(),
            reason,
        };

        let mut endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|e| connect_err(e.to_string()))?;

        if let Some(ca_path) = ca_cert {
            let pem = std::fs::read(ca_path)
                .map_err(|e| connect_err(format!("{}: {}", ca_path.display(), e)))?;
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))
                .map_err(|e| connect_err(e.to_string()))?;
        }

        debug!(uri = %uri, tls = ca_cert.is_some(), "api channel configured");
        Ok(Self::new(ApiClient::new(endpoint.connect_lazy())))
    }

    /// Push a local file to `destination` (`namespace:path.suffix`).
    pub async fn push(&self, source: &Path, destination: &str) -> Result<PushReceipt> {
        let locator = Locator::parse(destination)?;
        let content_type = content_type::resolve(source, locator.path())?;

        let content = tokio::fs::read(source)
            .await
            .map_err(|e| RelayError::SourceUnreadable {
                path: source.to_path_buf(),
                source: e,
            })?;

        let request = SetFileRequest {
            namespace: locator.namespace().to_string(),
            file_path: locator.path().to_string(),
            file_content: Some(File {
                name: locator.file_name().to_string(),
                content_type: content_type.as_str().to_string(),
                content,
            }),
        };

        let ack = self.api.clone().set_file(request).await?.into_inner();
        info!(
            locator = %locator,
            content_type = %content_type,
            "file pushed"
        );
        Ok(PushReceipt {
            source: source.to_path_buf(),
            locator,
            acknowledged: ack,
        })
    }

    /// Fetch a remote file object. The server side has no storage backing
    /// yet and answers with a placeholder.
    pub async fn fetch(&self, locator: &Locator) -> Result<FileObject> {
        let request = GetFileRequest {
            namespace: locator.namespace().to_string(),
            file_path: locator.path().to_string(),
        };
        Ok(self.api.clone().get_file(request).await?.into_inner())
    }
}

fn endpoint_uri(address: &str, tls: bool) -> String {
    if address.contains("://") {
        address.to_string()
    } else if tls {
        format!("https://{}", address)
    } else {
        format!("http://{}", address)
    }
}
