//! Script de build: aplica o linker script apenas no alvo bare-metal.
//!
//! Em builds de host (testes unitários) o binário é vazio e o linker
//! padrão da plataforma é usado.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=linker.ld");
    println!("cargo:rerun-if-changed=build.rs");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "none" {
        let dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| String::from("."));
        println!("cargo:rustc-link-arg-bins=-T{}/linker.ld", dir);
        println!("cargo:rustc-link-arg-bins=-no-pie");
    }
}
