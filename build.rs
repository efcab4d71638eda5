//! Build script for cfgd
//!
//! Shared-library plugins call back into `cfgd_*` host functions, so with
//! `dynamic` enabled the binary exports its symbols to the libraries it opens.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_DYNAMIC").is_none() {
        return;
    }

    match std::env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("linux") => println!("cargo:rustc-link-arg-bins=-rdynamic"),
        Ok("macos") => println!("cargo:rustc-link-arg-bins=-Wl,-export_dynamic"),
        _ => {}
    }
}
