use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC)
        .build()
}

fn server_streaming(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC)
        .server_streaming()
        .build()
}

// The wire messages are declared by hand in src/rpc/proto.rs (see proto/bluewand.proto),
// only the service glue is generated here, so no protoc is needed.
fn main() {
    let service = Service::builder()
        .name("BlueWand")
        .package("bluewand")
        .method(unary(
            "on_connect",
            "OnConnect",
            "crate::rpc::proto::EmptyMessage",
            "crate::rpc::proto::Identifier",
        ))
        .method(server_streaming(
            "on_button",
            "OnButton",
            "crate::rpc::proto::Identifier",
            "crate::rpc::proto::ButtonMessage",
        ))
        .method(server_streaming(
            "on_motion",
            "OnMotion",
            "crate::rpc::proto::Identifier",
            "crate::rpc::proto::MotionMessage",
        ))
        .build();

    println!("cargo:rerun-if-changed=build.rs");
    Builder::new().compile(&[service]);
}
