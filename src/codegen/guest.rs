//! Guest-side sections: transition thunks, packing functions, public
//! aliases, symbol tables and the symbol-enumeration macros.

use super::Generator;
use super::helpers::{format_function_params, format_struct_members};
use crate::digest::{callback_digest, function_digest, hex_byte_list};
use crate::model::CallbackStrategy;
use crate::types::{render_declaration, render_type};

impl Generator<'_> {
    /// `MAKE_THUNK` declarations for every thunked function, followed
    /// by one `MAKE_CALLBACK_THUNK` per canonical callback signature.
    pub fn emit_thunks(&self) -> String {
        let mut out = String::new();
        out.push_str("extern \"C\" {\n");
        for thunk in &self.interface.thunks {
            let digest = function_digest(&self.libname, &thunk.function_name);
            out.push_str(&format!(
                "MAKE_THUNK({}, {}, \"{}\")\n",
                self.libname,
                thunk.function_name,
                hex_byte_list(&digest)
            ));
        }
        out.push_str("}\n");

        for (idx, sig) in self.interface.funcptr_types.iter().enumerate() {
            let signature = sig.render();
            let digest = callback_digest(&signature);
            // Thunk used for guest-side calls to host function pointers
            out.push_str(&format!("  // {}\n", signature));
            out.push_str(&format!(
                "  MAKE_CALLBACK_THUNK(callback_{}, {}, \"{}\");\n",
                idx,
                signature,
                hex_byte_list(&digest)
            ));
        }
        out
    }

    /// One packing wrapper per thunked function: bundle the arguments
    /// into a struct and invoke the cross-architecture transition.
    pub fn emit_function_packs(&self) -> String {
        let mut out = String::new();
        out.push_str("extern \"C\" {\n");
        for thunk in &self.interface.thunks {
            let name = &thunk.function_name;
            let is_void = thunk.return_type.is_void();

            // Trailing return type keeps function pointer returns simple
            out.push_str(&format!(
                "FEX_PACKFN_LINKAGE auto fexfn_pack_{}({}) -> {} {{\n",
                name,
                format_function_params(&thunk.params, false),
                render_type(&thunk.return_type)
            ));
            out.push_str("  struct {\n");
            out.push_str(&format_struct_members(&thunk.params, "    "));
            if !is_void {
                out.push_str(&format!(
                    "    {};\n",
                    render_declaration(&thunk.return_type, "rv")
                ));
            } else if thunk.params.is_empty() {
                // Avoid "empty struct has size 0 in C, size 1 in C++"
                out.push_str("    char force_nonempty;\n");
            }
            out.push_str("  } args;\n");

            for idx in 0..thunk.params.len() {
                let is_default_callback = matches!(
                    thunk.callbacks.get(&idx).map(|cb| cb.strategy),
                    Some(CallbackStrategy::Default)
                );
                if is_default_callback {
                    // Guest function pointers must be wrapped in a
                    // host-callable trampoline before crossing over
                    out.push_str(&format!(
                        "  args.a_{} = AllocateHostTrampolineForGuestFunction(a_{});\n",
                        idx, idx
                    ));
                } else {
                    out.push_str(&format!("  args.a_{} = a_{};\n", idx, idx));
                }
            }
            out.push_str(&format!("  fexthunks_{}_{}(&args);\n", self.libname, name));
            if !is_void {
                out.push_str("  return args.rv;\n");
            }
            out.push_str("}\n");
        }
        out.push_str("}\n");
        out
    }

    /// Public ELF aliases for every auto-generated guest entry point,
    /// plus the per-namespace symbol tables.
    pub fn emit_function_packs_public(&self) -> String {
        let mut out = String::new();
        out.push_str("extern \"C\" {\n");
        for api in &self.interface.thunked_api {
            if api.custom_guest_impl {
                continue;
            }
            out.push_str(&format!(
                "__attribute__((alias(\"fexfn_pack_{}\"))) auto {}({}) -> {};\n",
                api.function_name,
                api.function_name,
                format_function_params(&api.params, false),
                render_type(&api.return_type)
            ));
        }

        for (ns_idx, ns) in self.interface.namespaces.iter().enumerate() {
            let members: Vec<_> = self
                .interface
                .thunked_api
                .iter()
                .filter(|api| api.symtable_namespace == Some(ns_idx))
                .collect();
            if members.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "static struct {{ const char* name; void (*fn)(); }} {}_symtable[] = {{\n",
                ns.name
            ));
            for api in members {
                out.push_str(&format!(
                    "  {{ \"{}\", (void(*)())&{} }},\n",
                    api.function_name, api.function_name
                ));
            }
            out.push_str("  { nullptr, nullptr }\n");
            out.push_str("};\n");
        }
        out.push_str("}\n");
        out
    }

    /// X-macro enumerating each namespace's public symbols.
    pub fn emit_symbol_list(&self) -> String {
        let mut out = String::new();
        for (ns_idx, ns) in self.interface.namespaces.iter().enumerate() {
            let members: Vec<_> = self
                .interface
                .thunked_api
                .iter()
                .filter(|api| api.namespace_index == ns_idx)
                .collect();
            if members.is_empty() {
                continue;
            }
            let prefix = if ns.name.is_empty() {
                String::new()
            } else {
                format!("{}_", ns.name)
            };
            out.push_str(&format!("#define FOREACH_{}SYMBOL(EXPAND) \\\n", prefix));
            for api in members {
                out.push_str(&format!("  EXPAND({}, \"TODO\") \\\n", api.function_name));
            }
            out.push('\n');
        }
        out
    }
}
