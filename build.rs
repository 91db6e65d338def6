use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // The SIMD kernels are written with `std::arch` intrinsics, so no
    // external assembler is needed. Only expose the cfg when they can be used.
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if arch == "x86_64" && env::var_os("CARGO_FEATURE_ASM").is_some() {
        println!("cargo:rustc-cfg=asm_x86_64");
    }
}
