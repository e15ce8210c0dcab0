use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=runtime/tl_rt.c");

    let objects = cc::Build::new()
        .file("runtime/tl_rt.c")
        .pic(true)
        .opt_level(2)
        .warnings(true)
        .compile_intermediates();

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let object = objects.first().expect("runtime compiles to one object");
    fs::copy(object, out_dir.join("tl_rt.o")).expect("copy runtime object into OUT_DIR");
}
