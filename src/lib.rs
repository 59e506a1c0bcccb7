//! file-relay - push and fetch named files on a remote store
//!
//! A file object is addressed as `namespace:path.suffix`. The client side
//! validates the locator, infers a content type from the suffix (checking
//! certificates and keys structurally) and sends the bytes in one gRPC
//! call. The server side hosts that API next to a plain HTTP liveness
//! endpoint and shuts both down cleanly on SIGINT/SIGTERM.
//!
//! ## Modules
//!
//! - **locator**: `namespace:path` grammar
//! - **content_type**: suffix to content-type table
//! - **client**: transfer client (push / fetch)
//! - **api**: gRPC messages, file service, health service
//! - **server**: dual-listener lifecycle

pub mod api;
pub mod client;
pub mod config;
pub mod content_type;
pub mod locator;
pub mod logging;
pub mod server;
pub mod types;

pub use client::{PushReceipt, TransferClient};
pub use config::ServerArgs;
pub use content_type::ContentType;
pub use locator::Locator;
pub use server::{Server, ServerConfig, ServerState};
pub use types::{RelayError, Result};
