//! API layer - gRPC interfaces hosted by the server
//!
//! Provides:
//! - `filerelay.v1.Api` for pushing and fetching file objects
//! - `grpc.health.v1.Health` for API-level liveness checks

pub mod health;
pub mod pb;
pub mod service;

pub use health::HealthService;
pub use pb::api_client::ApiClient;
pub use pb::api_server::{Api, ApiServer};
pub use service::FileService;

/// Wire representation of a file object
pub type FileObject = pb::File;
