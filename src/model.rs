//! In-memory representation of a parsed interface description.
//!
//! Populated by the analysis pass, frozen afterwards, and consumed by
//! the code emitter. All collections preserve insertion order so the
//! same input always produces byte-identical output.

use crate::types::{FuncPtrTypeSet, QualType};
use std::collections::BTreeMap;

/// Per-namespace configuration, including the global namespace
/// (represented with an empty name). The position in
/// `Interface::namespaces` is the namespace index.
#[derive(Debug, Clone)]
pub struct NamespaceInfo {
    pub name: String,
    /// Symbol used to resolve native host functions; `dlsym_default`
    /// when not configured.
    pub host_loader: Option<String>,
    pub generate_guest_symtable: bool,
    pub indirect_guest_calls: bool,
}

pub const DEFAULT_HOST_LOADER: &str = "dlsym_default";

impl NamespaceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        NamespaceInfo {
            name: name.into(),
            host_loader: None,
            generate_guest_symtable: false,
            indirect_guest_calls: false,
        }
    }

    pub fn resolved_host_loader(&self) -> &str {
        self.host_loader.as_deref().unwrap_or(DEFAULT_HOST_LOADER)
    }
}

/// How a function-pointer parameter is treated at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStrategy {
    /// Guest pointers are wrapped in host-callable trampolines.
    Default,
    /// Replaced by a stub that aborts when invoked on the host.
    Stub,
    /// Passed through as a guest pointer; never called on the host.
    Guest,
}

/// A function-pointer-typed parameter of a thunked function.
#[derive(Debug, Clone)]
pub struct ThunkedCallback {
    pub return_type: QualType,
    pub params: Vec<QualType>,
    pub strategy: CallbackStrategy,
    pub is_variadic: bool,
}

/// Guest-to-host transition point for one thunked symbol.
#[derive(Debug, Clone)]
pub struct ThunkedFunction {
    /// Carries the `_internal` suffix once a variadic signature has
    /// been rewritten.
    pub function_name: String,
    pub return_type: QualType,
    pub params: Vec<QualType>,
    /// If true, `params` already ends with the count/value-array pair
    /// appended for marshalling through the internal form.
    pub is_variadic: bool,
    /// The unpacking function calls a hand-written `fexfn_impl`
    /// function instead of the loaded host symbol.
    pub custom_host_impl: bool,
    /// Parameter index to callback descriptor. Ordered so stub
    /// emission is deterministic.
    pub callbacks: BTreeMap<usize, ThunkedCallback>,
}

/// A function that is part of the public API of the thunked library.
///
/// For each of these there is a publicly visible guest entry point
/// (usually auto-generated), a host pointer loaded through the
/// namespace's loader symbol, and a `ThunkedFunction` with the same
/// name (possibly suffixed `_internal`).
#[derive(Debug, Clone)]
pub struct ThunkedApiFunction {
    pub function_name: String,
    pub return_type: QualType,
    pub params: Vec<QualType>,
    pub is_variadic: bool,
    /// No guest-side entry point is auto-generated.
    pub custom_guest_impl: bool,
    pub host_loader: String,
    /// Namespace this export was declared in; groups the
    /// symbol-enumeration macros.
    pub namespace_index: usize,
    /// Set when the namespace generates a guest symbol table; the
    /// export is then entered into `<ns>_symtable[]`.
    pub symtable_namespace: Option<usize>,
}

/// Everything the emitter needs, in insertion order.
#[derive(Debug, Default)]
pub struct Interface {
    pub namespaces: Vec<NamespaceInfo>,
    pub thunks: Vec<ThunkedFunction>,
    pub thunked_api: Vec<ThunkedApiFunction>,
    pub funcptr_types: FuncPtrTypeSet,
    pub lib_version: Option<u64>,
}
