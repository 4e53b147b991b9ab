use anyhow::Result;

use thunkgen::codegen::{Generator, RtldMode};
use thunkgen::model::Interface;

#[allow(dead_code)]
pub fn build(src: &str) -> Result<Interface> {
    thunkgen::build_interface(src, None)
}

#[allow(dead_code)]
pub fn guest_for(src: &str, lib: &str) -> Result<String> {
    let interface = build(src)?;
    Ok(Generator::new(&interface, lib, None).emit_guest())
}

#[allow(dead_code)]
pub fn host_for(src: &str, lib: &str) -> Result<String> {
    let interface = build(src)?;
    Ok(Generator::new(&interface, lib, None).emit_host())
}

#[allow(dead_code)]
pub fn host_for_with_rtld(src: &str, lib: &str, rtld: RtldMode) -> Result<String> {
    let interface = build(src)?;
    Ok(Generator::new(&interface, lib, Some(rtld)).emit_host())
}

/// SHA-256 of `input` rendered the way the guest emitter renders
/// digests: `0x12, 0x34, ...`.
#[allow(dead_code)]
pub fn sha256_byte_list(input: &str) -> String {
    sha256(input)
        .iter()
        .map(|b| format!("0x{:02x}", b))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SHA-256 of `input` rendered the way the host emitter renders
/// digests: `\x12\x34...`.
#[allow(dead_code)]
pub fn sha256_string_literal(input: &str) -> String {
    let mut out = String::new();
    for b in sha256(input) {
        out.push_str(&format!("\\x{:02x}", b));
    }
    out
}

#[allow(dead_code)]
fn sha256(input: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().into()
}
