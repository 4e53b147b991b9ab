//! Thunk-library code generator.
//!
//! Reads a declarative interface description for a native shared
//! library and emits the C++ source fragments implementing the
//! guest/host call-marshalling layer of a cross-architecture emulator:
//! guest-side packing stubs and public aliases, host-side unpacking
//! dispatchers, a SHA-256-keyed export table, and a library loader.

pub mod analyze;
pub mod codegen;
pub mod diagnostics;
pub mod digest;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod types;

use anyhow::Result;

/// Parse and validate an interface description. Any diagnostic is
/// rendered against `source` (with `file` in the header when given)
/// before being returned as an error.
pub fn build_interface(source: &str, file: Option<&str>) -> Result<model::Interface> {
    let run = || -> Result<model::Interface, diagnostics::Diagnostic> {
        let ast = parser::parse_interface(source)?;
        analyze::analyze(&ast)
    };
    run().map_err(|diag| diagnostics::emit(&diag, file, source))
}
