fn main() -> std::io::Result<()> {
    // SAFETY: build scripts are single-threaded at this point.
    unsafe {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().expect("vendored protoc"));
    }
    prost_build::compile_protos(&["proto/kinetic.proto"], &["proto/"])
}
