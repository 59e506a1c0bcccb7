//! Generates the gRPC client and server glue for `filerelay.v1.Api`.
//!
//! Messages are declared by hand in `src/api/pb.rs` with prost derives, so
//! the manual builder is used and no protoc install is required.

fn main() {
    let set_file = tonic_build::manual::Method::builder()
        .name("set_file")
        .route_name("SetFile")
        .input_type("crate::api::pb::SetFileRequest")
        .output_type("crate::api::pb::File")
        .codec_path("tonic::codec::ProstCodec")
        .build();

    let get_file = tonic_build::manual::Method::builder()
        .name("get_file")
        .route_name("GetFile")
        .input_type("crate::api::pb::GetFileRequest")
        .output_type("crate::api::pb::File")
        .codec_path("tonic::codec::ProstCodec")
        .build();

    let api = tonic_build::manual::Service::builder()
        .name("Api")
        .package("filerelay.v1")
        .method(set_file)
        .method(get_file)
        .build();

    tonic_build::manual::Builder::new().compile(&[api]);

    println!("cargo:rerun-if-changed=build.rs");
}
