//! Host-side sections: loader pointer declarations, unpacking
//! dispatchers, the digest-keyed export table, and the library loader.

use super::helpers::{format_call_args, format_function_params, format_struct_members};
use super::{Generator, RtldMode};
use crate::digest::{callback_digest, callback_name, function_digest, hex_string_literal};
use crate::model::CallbackStrategy;
use crate::types::{render_declaration, render_type};

impl Generator<'_> {
    /// Per-export loader typedef and pointer:
    /// `using fexldr_type_<lib>_<fn> = auto (...) -> ret;`.
    pub fn emit_ldr_ptrs(&self) -> String {
        let mut out = String::new();
        for api in &self.interface.thunked_api {
            out.push_str(&format!(
                "using fexldr_type_{}_{} = auto ({}) -> {};\n",
                self.libname,
                api.function_name,
                format_function_params(&api.params, api.is_variadic),
                render_type(&api.return_type)
            ));
            out.push_str(&format!(
                "static fexldr_type_{}_{} *fexldr_ptr_{}_{};\n",
                self.libname, api.function_name, self.libname, api.function_name
            ));
        }
        out
    }

    /// Stub callbacks, custom-impl forward declarations, packed-args
    /// structs and the unpacking dispatchers. The legacy
    /// `function_unpacks` output omits the forward declarations.
    pub fn emit_function_unpacks(&self, with_custom_impl_decls: bool) -> String {
        let mut out = String::new();
        out.push_str("extern \"C\" {\n");
        for thunk in &self.interface.thunks {
            let name = &thunk.function_name;

            for (&cb_idx, cb) in &thunk.callbacks {
                if cb.strategy != CallbackStrategy::Stub {
                    continue;
                }
                let stub_name = format!("fexfn_unpack_{}_stub", callback_name(name, cb_idx));
                let ellipsis = if cb.is_variadic { ", ..." } else { "" };
                out.push_str(&format!(
                    "[[noreturn]] static {} {}({}{}) {{\n",
                    render_type(&cb.return_type),
                    stub_name,
                    format_function_params(&cb.params, false),
                    ellipsis
                ));
                out.push_str(&format!(
                    "  fprintf(stderr, \"FATAL: Attempted to invoke callback stub for {}\\n\");\n",
                    name
                ));
                out.push_str("  std::abort();\n");
                out.push_str("}\n");
            }

            if with_custom_impl_decls && thunk.custom_host_impl {
                let params = format_call_args(thunk.params.len(), |idx| {
                    let is_guest = matches!(
                        thunk.callbacks.get(&idx).map(|cb| cb.strategy),
                        Some(CallbackStrategy::Guest)
                    );
                    if is_guest {
                        // Guest function pointers never become host
                        // callables; the impl receives them boxed
                        format!("fex_guest_function_ptr a_{}", idx)
                    } else {
                        render_declaration(&thunk.params[idx], &format!("a_{}", idx))
                    }
                });
                out.push_str(&format!(
                    "auto fexfn_impl_{}_{}({}) -> {};\n",
                    self.libname,
                    name,
                    params,
                    render_type(&thunk.return_type)
                ));
            }

            let struct_name = format!("fexfn_packed_args_{}_{}", self.libname, name);
            out.push_str(&format!("struct {} {{\n", struct_name));
            out.push_str(&format_struct_members(&thunk.params, "  "));
            if !thunk.return_type.is_void() {
                out.push_str(&format!(
                    "  {};\n",
                    render_declaration(&thunk.return_type, "rv")
                ));
            } else if thunk.params.is_empty() {
                out.push_str("  char force_nonempty;\n");
            }
            out.push_str("};\n");

            let target = if thunk.custom_host_impl {
                format!("fexfn_impl_{}_{}", self.libname, name)
            } else {
                format!("fexldr_ptr_{}_{}", self.libname, name)
            };
            out.push_str(&format!(
                "static void fexfn_unpack_{}_{}({}* args) {{\n",
                self.libname, name, struct_name
            ));
            let call_args = format_call_args(thunk.params.len(), |idx| {
                match thunk.callbacks.get(&idx).map(|cb| cb.strategy) {
                    Some(CallbackStrategy::Stub) => {
                        format!("fexfn_unpack_{}_stub", callback_name(name, idx))
                    }
                    Some(CallbackStrategy::Guest) => {
                        format!("fex_guest_function_ptr{{args->a_{}}}", idx)
                    }
                    // Comma operator injects the trampoline fixup
                    // before the argument is handed over
                    Some(CallbackStrategy::Default) => format!(
                        "(FinalizeHostTrampolineForGuestFunction(args->a_{}), args->a_{})",
                        idx, idx
                    ),
                    None => format!("args->a_{}", idx),
                }
            });
            let store = if thunk.return_type.is_void() {
                "  "
            } else {
                "  args->rv = "
            };
            out.push_str(&format!("{}{}({});\n", store, target, call_args));
            out.push_str("}\n");
        }
        out.push_str("}\n");
        out
    }

    /// Entries of the digest-keyed export table, in thunk order then
    /// funcptr-set order. The entry text and an optional trailing
    /// comment are kept separate for the two table renderings.
    fn export_entries(&self) -> Vec<(String, Option<String>)> {
        let mut entries = Vec::new();
        for thunk in &self.interface.thunks {
            let digest = function_digest(&self.libname, &thunk.function_name);
            entries.push((
                format!(
                    "{{(uint8_t*)\"{}\", (void(*)(void *))&fexfn_unpack_{}_{}}}",
                    hex_string_literal(&digest),
                    self.libname,
                    thunk.function_name
                ),
                Some(format!("{}:{}", self.libname, thunk.function_name)),
            ));
        }
        for sig in self.interface.funcptr_types.iter() {
            let signature = sig.render();
            let digest = callback_digest(&signature);
            entries.push((
                format!(
                    "{{(uint8_t*)\"{}\", (void(*)(void *))&CallbackUnpack<{}>::ForIndirectCall}}",
                    hex_string_literal(&digest),
                    signature
                ),
                None,
            ));
        }
        entries
    }

    /// Legacy raw table body, meant to be spliced into an array literal.
    pub fn emit_tab_function_unpacks(&self) -> String {
        let mut out = String::new();
        for (entry, comment) in self.export_entries() {
            match comment {
                Some(c) => out.push_str(&format!("{}, // {}\n", entry, c)),
                None => out.push_str(&format!("{},\n", entry)),
            }
        }
        out
    }

    /// The unified export table, terminated by a null entry.
    pub fn emit_exports(&self) -> String {
        let mut out = String::new();
        out.push_str("static ExportEntry exports[] = {\n");
        for (entry, comment) in self.export_entries() {
            match comment {
                Some(c) => out.push_str(&format!("  {}, // {}\n", entry, c)),
                None => out.push_str(&format!("  {},\n", entry)),
            }
        }
        out.push_str("  {nullptr, nullptr},\n");
        out.push_str("};\n");
        out
    }

    /// The library loader: dlopen plus one symbol resolution per API
    /// export through the namespace's configured loader.
    pub fn emit_ldr(&self, default_mode: RtldMode) -> String {
        let mode = self.rtld.unwrap_or(default_mode);
        let mut out = String::new();
        out.push_str(&format!("static void* fexldr_ptr_{}_so;\n", self.libname));
        out.push_str(&format!(
            "extern \"C\" bool fexldr_init_{}() {{\n",
            self.libname
        ));
        let version_suffix = self
            .interface
            .lib_version
            .map(|v| format!(".{}", v))
            .unwrap_or_default();
        out.push_str(&format!(
            "  fexldr_ptr_{}_so = dlopen(\"{}.so{}\", {} | RTLD_LAZY);\n",
            self.libname,
            self.libfilename,
            version_suffix,
            mode.spelling()
        ));
        out.push_str(&format!(
            "  if (!fexldr_ptr_{}_so) {{ return false; }}\n\n",
            self.libname
        ));
        for api in &self.interface.thunked_api {
            out.push_str(&format!(
                "  (void*&)fexldr_ptr_{}_{} = {}(fexldr_ptr_{}_so, \"{}\");\n",
                self.libname,
                api.function_name,
                api.host_loader,
                self.libname,
                api.function_name
            ));
        }
        out.push_str("  return true;\n");
        out.push_str("}\n");
        out
    }
}
