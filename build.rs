fn main() {
    println!("cargo:rerun-if-changed=proto/logs.proto");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/logs.proto"], &["proto"])
        .expect("failed to compile proto/logs.proto");
}
