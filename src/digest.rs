//! Symbol naming and SHA-256 digest derivation.
//!
//! Digests are the only identifiers shared between independently
//! compiled guest and host code, so both sides must derive the same 32
//! bytes from the same canonical string. Function digests hash
//! `"<libname>:<function>"`; callback digests hash the canonical
//! signature spelling prefixed with `"fexcallback_"`.

use sha2::{Digest, Sha256};

/// Derive the C identifier prefix from the library filename: every `-`
/// becomes `_`.
pub fn sanitize_libname(libfilename: &str) -> String {
    libfilename.replace('-', "_")
}

/// 32-byte digest identifying one thunked function of one library.
pub fn function_digest(libname: &str, function_name: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(libname.as_bytes());
    hasher.update(b":");
    hasher.update(function_name.as_bytes());
    hasher.finalize().into()
}

/// 32-byte digest identifying one canonical callback signature. Takes
/// the rendered signature, e.g. `void (int, char)`.
pub fn callback_digest(signature: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fexcallback_");
    hasher.update(signature.as_bytes());
    hasher.finalize().into()
}

/// Digest bytes as a guest-side literal list: `0x12, 0x34, ...`.
pub fn hex_byte_list(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| format!("0x{:02x}", b))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Digest bytes as a host-side string literal body: `\x12\x34...`.
pub fn hex_string_literal(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 4);
    for b in digest {
        out.push_str(&format!("\\x{:02x}", b));
    }
    out
}

/// Name of the generated per-parameter callback symbol for a function,
/// e.g. `setcbCBFN0`.
pub fn callback_name(function_name: &str, param_index: usize) -> String {
    format!("{}CBFN{}", function_name, param_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_dashes() {
        assert_eq!(sanitize_libname("libavcodec-x86"), "libavcodec_x86");
        assert_eq!(sanitize_libname("libGL"), "libGL");
    }

    #[test]
    fn function_digest_matches_reference_hash() {
        // SHA-256 of the exact UTF-8 bytes of "libGL:glFlush"
        let expect: [u8; 32] = {
            let mut h = Sha256::new();
            h.update(b"libGL:glFlush");
            h.finalize().into()
        };
        assert_eq!(function_digest("libGL", "glFlush"), expect);
    }

    #[test]
    fn hex_renderings() {
        let bytes = [0x00u8, 0xab, 0x7f];
        assert_eq!(hex_byte_list(&bytes), "0x00, 0xab, 0x7f");
        assert_eq!(hex_string_literal(&bytes), "\\x00\\xab\\x7f");
    }

    #[test]
    fn callback_names_carry_the_parameter_index() {
        assert_eq!(callback_name("setcb", 0), "setcbCBFN0");
        assert_eq!(callback_name("setcb", 2), "setcbCBFN2");
    }
}
