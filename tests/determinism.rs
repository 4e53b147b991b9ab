//! Output stability: the same input must produce byte-identical files,
//! and the symbol-enumeration macros must cover the public API exactly
//! once.

mod common;

use anyhow::Result;
use common::{build, guest_for, host_for};
use std::collections::BTreeSet;
use thunkgen::codegen::Generator;

const INTERFACE: &str = r#"
typedef unsigned int GLenum;
typedef void (*DebugCb)(GLenum, const void*);

config {
  version = 2;
}

namespace gl {
  config {
    generate_guest_symtable;
    indirect_guest_calls;
    load_host_endpoint_via = "glsym";
  }

  void glFlush();
  void glBindTexture(GLenum target, GLenum texture);
}

[[callback_stub]]
void setDebugCallback(DebugCb cb, const void* user);

[[uniform_va_type(int)]]
int emitlog(const char* fmt, ...);

gen_type void (*)(int, int);
"#;

#[test]
fn repeated_runs_are_byte_identical() -> Result<()> {
    let first_guest = guest_for(INTERFACE, "libGL")?;
    let second_guest = guest_for(INTERFACE, "libGL")?;
    assert_eq!(first_guest, second_guest);

    let first_host = host_for(INTERFACE, "libGL")?;
    let second_host = host_for(INTERFACE, "libGL")?;
    assert_eq!(first_host, second_host);
    Ok(())
}

#[test]
fn symbol_macros_enumerate_the_public_api_exactly_once() -> Result<()> {
    let interface = build(INTERFACE)?;
    let generator = Generator::new(&interface, "libGL", None);
    let symbol_list = generator.emit_symbol_list();

    let mut listed = Vec::new();
    for line in symbol_list.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("EXPAND(") {
            let name = rest.split(',').next().unwrap();
            listed.push(name.to_string());
        }
    }

    let expected: BTreeSet<String> = interface
        .thunked_api
        .iter()
        .map(|api| api.function_name.clone())
        .collect();
    let listed_set: BTreeSet<String> = listed.iter().cloned().collect();

    assert_eq!(listed.len(), listed_set.len(), "duplicate symbol listed");
    assert_eq!(listed_set, expected);
    // public names only, never the internal forms
    assert!(!listed_set.iter().any(|name| name.ends_with("_internal")));
    Ok(())
}

#[test]
fn guest_and_host_agree_on_every_digest() -> Result<()> {
    let interface = build(INTERFACE)?;
    let generator = Generator::new(&interface, "libGL", None);
    let guest = generator.emit_guest();
    let host = generator.emit_host();

    // every guest-side digest byte list must appear, re-encoded, in the
    // host-side export table
    for thunk in &interface.thunks {
        let digest = thunkgen::digest::function_digest("libGL", &thunk.function_name);
        assert!(guest.contains(&thunkgen::digest::hex_byte_list(&digest)));
        assert!(host.contains(&thunkgen::digest::hex_string_literal(&digest)));
    }
    for sig in interface.funcptr_types.iter() {
        let digest = thunkgen::digest::callback_digest(&sig.render());
        assert!(guest.contains(&thunkgen::digest::hex_byte_list(&digest)));
        assert!(host.contains(&thunkgen::digest::hex_string_literal(&digest)));
    }
    Ok(())
}

#[test]
fn legacy_outputs_match_the_unified_sections() -> Result<()> {
    let interface = build(INTERFACE)?;
    let generator = Generator::new(&interface, "libGL", None);

    let guest = generator.emit_guest();
    assert!(guest.contains(&generator.emit_thunks()));
    assert!(guest.contains(&generator.emit_function_packs()));
    assert!(guest.contains(&generator.emit_function_packs_public()));
    assert!(guest.contains(&generator.emit_symbol_list()));

    let host = generator.emit_host();
    assert!(host.contains(&generator.emit_ldr_ptrs()));
    assert!(host.contains(&generator.emit_exports()));
    Ok(())
}
