//! Server-side handler for `filerelay.v1.Api`
//!
//! SetFile only acknowledges: the payload is validated, logged and echoed
//! back, but nothing is persisted. GetFile answers with a placeholder object.

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::pb::{File, GetFileRequest, SetFileRequest};
use super::Api;
use crate::content_type::ContentType;
use crate::types::RelayError;

#[derive(Debug, Default, Clone)]
pub struct FileService;

impl FileService {
    pub fn new() -> Self {
        Self
    }
}

#[tonic::async_trait]
impl Api for FileService {
    async fn set_file(&self, request: Request<SetFileRequest>) -> Result<Response<File>, Status> {
        let req = request.into_inner();

        let file = match req.file_content {
            Some(file) if !file.content.is_empty() => file,
            _ => {
                warn!(
                    namespace = %req.namespace,
                    path = %req.file_path,
                    "rejected SetFile without payload"
                );
                return Err(RelayError::EmptyFile.into());
            }
        };

        info!(
            namespace = %req.namespace,
            path = %req.file_path,
            name = %file.name,
            content_type = %file.content_type,
            bytes = file.content.len(),
            "file received"
        );

        Ok(Response::new(file))
    }

    async fn get_file(&self, request: Request<GetFileRequest>) -> Result<Response<File>, Status> {
        let req = request.into_inner();
        warn!(
            namespace = %req.namespace,
            path = %req.file_path,
            "GetFile has no storage backing yet, returning placeholder"
        );

        let name = req
            .file_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Response::new(File {
            name,
            content_type: ContentType::Text.as_str().to_string(),
            content: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_request(file: Option<File>) -> Request<SetFileRequest> {
        Request::new(SetFileRequest {
            namespace: "prod".into(),
            file_path: "certs/web.crt".into(),
            file_content: file,
        })
    }

    #[tokio::test]
    async fn test_set_file_without_payload() {
        let status = FileService::new().set_file(set_request(None)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "empty file");
    }

    #[tokio::test]
    async fn test_set_file_with_empty_content() {
        let file = File {
            name: "web.crt".into(),
            content_type: "plain/text".into(),
            content: Vec::new(),
        };
        let status = FileService::new()
            .set_file(set_request(Some(file)))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_set_file_echoes_payload() {
        let file = File {
            name: "web.crt".into(),
            content_type: "plain/text".into(),
            content: b"-----BEGIN CERTIFICATE-----".to_vec(),
        };
        let echoed = FileService::new()
            .set_file(set_request(Some(file.clone())))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(echoed.name, file.name);
        assert_eq!(echoed.content_type, file.content_type);
    }

    #[tokio::test]
    async fn test_get_file_placeholder() {
        let file = FileService::new()
            .get_file(Request::new(GetFileRequest {
                namespace: "prod".into(),
                file_path: "conf/app.yml".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(file.name, "app.yml");
        assert_eq!(file.content_type, "plain/text");
    }
}
