//! Wire messages for `filerelay.v1.Api` plus the generated client/server glue.

#[derive(Clone, PartialEq, prost::Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub content_type: String,
    #[prost(bytes = "vec", tag = "3")]
    pub content: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetFileRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub file_path: String,
    #[prost(message, optional, tag = "3")]
    pub file_content: Option<File>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetFileRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub file_path: String,
}

include!(concat!(env!("OUT_DIR"), "/filerelay.v1.Api.rs"));
