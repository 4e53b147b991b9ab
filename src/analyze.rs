//! Analysis pass: AST to interface model, with validation.
//!
//! Two passes over the parsed items. The first enumerates namespace
//! descriptors (in order of first appearance) and applies their config
//! blocks. The second walks each namespace's declarations in file order
//! and populates the thunked-function, API-export and
//! function-pointer-type collections, enforcing the structural rules.
//! The first violation aborts the run with a located diagnostic.

use crate::diagnostics::Diagnostic;
use crate::model::{
    CallbackStrategy, Interface, NamespaceInfo, ThunkedApiFunction, ThunkedCallback,
    ThunkedFunction,
};
use crate::parser::{
    Annotation, ConfigBlock, ConfigValue, FunctionDecl, GenTypeDecl, InterfaceAst, Item,
};
use crate::types::{CType, FunctionSig, QualType};
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn analyze(ast: &InterfaceAst) -> Result<Interface, Diagnostic> {
    let mut interface = Interface::default();
    let mut ns_index: HashMap<String, usize> = HashMap::new();
    let mut config_seen: HashSet<String> = HashSet::new();

    // Pass 1: namespace descriptors, in order of first appearance.
    collect_namespaces(
        &ast.items,
        "",
        &mut interface,
        &mut ns_index,
        &mut config_seen,
    )?;

    // Pass 2: per namespace, process declarations in file order.
    for ns_idx in 0..interface.namespaces.len() {
        let ns = interface.namespaces[ns_idx].clone();
        if ns.name.is_empty() {
            process_scope_items(&ast.items, &ns, ns_idx, &mut interface)?;
        } else {
            for item in &ast.items {
                if let Item::Namespace(block) = item {
                    if block.name == ns.name {
                        process_scope_items(&block.items, &ns, ns_idx, &mut interface)?;
                    }
                }
            }
        }
    }

    Ok(interface)
}

/// Create descriptors for every scope that declares anything, and fold
/// config blocks into them. `scope` is the namespace name, empty for
/// the global scope.
fn collect_namespaces(
    items: &[Item],
    scope: &str,
    interface: &mut Interface,
    ns_index: &mut HashMap<String, usize>,
    config_seen: &mut HashSet<String>,
) -> Result<(), Diagnostic> {
    for item in items {
        match item {
            Item::Config(block) => {
                let idx = ensure_namespace(scope, interface, ns_index);
                if !config_seen.insert(scope.to_string()) {
                    return Err(Diagnostic::new(
                        "duplicate config block for this scope",
                        block.loc,
                    ));
                }
                apply_config(block, scope, idx, interface)?;
            }
            Item::Function(_) | Item::GenType(_) => {
                ensure_namespace(scope, interface, ns_index);
            }
            Item::Namespace(block) => {
                collect_namespaces(&block.items, &block.name, interface, ns_index, config_seen)?;
            }
        }
    }
    Ok(())
}

fn ensure_namespace(
    scope: &str,
    interface: &mut Interface,
    ns_index: &mut HashMap<String, usize>,
) -> usize {
    if let Some(&idx) = ns_index.get(scope) {
        return idx;
    }
    let idx = interface.namespaces.len();
    interface.namespaces.push(NamespaceInfo::new(scope));
    ns_index.insert(scope.to_string(), idx);
    idx
}

fn apply_config(
    block: &ConfigBlock,
    scope: &str,
    ns_idx: usize,
    interface: &mut Interface,
) -> Result<(), Diagnostic> {
    for entry in &block.entries {
        match entry.name.as_str() {
            "generate_guest_symtable" => {
                expect_flag(entry.name.as_str(), &entry.value, entry.loc)?;
                interface.namespaces[ns_idx].generate_guest_symtable = true;
            }
            "indirect_guest_calls" => {
                expect_flag(entry.name.as_str(), &entry.value, entry.loc)?;
                interface.namespaces[ns_idx].indirect_guest_calls = true;
            }
            "load_host_endpoint_via" => match &entry.value {
                ConfigValue::Str(symbol) => {
                    interface.namespaces[ns_idx].host_loader = Some(symbol.clone());
                }
                _ => {
                    return Err(Diagnostic::new(
                        "load_host_endpoint_via must be initialised with a string literal",
                        entry.loc,
                    ));
                }
            },
            "version" => {
                let version = match &entry.value {
                    ConfigValue::Int(v) => *v,
                    _ => {
                        return Err(Diagnostic::new(
                            "version must be initialised with an integer literal",
                            entry.loc,
                        ));
                    }
                };
                if !scope.is_empty() {
                    return Err(Diagnostic::new(
                        "library version must be defined in the global namespace",
                        entry.loc,
                    ));
                }
                interface.lib_version = Some(version);
            }
            other => {
                return Err(Diagnostic::new(
                    format!("unknown namespace annotation `{}`", other),
                    entry.loc,
                ));
            }
        }
    }
    Ok(())
}

fn expect_flag(name: &str, value: &ConfigValue, loc: usize) -> Result<(), Diagnostic> {
    match value {
        ConfigValue::Flag => Ok(()),
        _ => Err(Diagnostic::new(
            format!("`{}` does not take a value", name),
            loc,
        )),
    }
}

fn process_scope_items(
    items: &[Item],
    ns: &NamespaceInfo,
    ns_idx: usize,
    interface: &mut Interface,
) -> Result<(), Diagnostic> {
    for item in items {
        match item {
            Item::GenType(decl) => process_gen_type(decl, interface)?,
            Item::Function(decl) => process_function(decl, ns, ns_idx, interface)?,
            Item::Config(_) => {}
            // the parser rejects nested namespaces
            Item::Namespace(_) => {}
        }
    }
    Ok(())
}

fn process_gen_type(decl: &GenTypeDecl, interface: &mut Interface) -> Result<(), Diagnostic> {
    let sig = match &decl.ty.ty {
        CType::Function(sig) => sig.as_ref(),
        CType::Pointer(inner) => match &inner.ty {
            CType::Function(sig) => sig.as_ref(),
            _ => {
                return Err(Diagnostic::new(
                    "gen_type requires a function type",
                    decl.loc,
                ));
            }
        },
        _ => {
            return Err(Diagnostic::new(
                "gen_type requires a function type",
                decl.loc,
            ));
        }
    };
    interface.funcptr_types.insert(sig);
    Ok(())
}

/// Recognised per-function configuration, read off the annotation list.
#[derive(Default)]
struct Annotations {
    custom_host_impl: bool,
    custom_guest_entrypoint: bool,
    returns_guest_pointer: bool,
    uniform_va_type: Option<QualType>,
    strategy: Option<CallbackStrategy>,
}

fn read_annotations(annotations: &[Annotation]) -> Result<Annotations, Diagnostic> {
    let mut out = Annotations::default();
    for a in annotations {
        if a.arg.is_some() && a.name != "uniform_va_type" {
            return Err(Diagnostic::new(
                format!("`{}` does not take a type argument", a.name),
                a.loc,
            ));
        }
        match a.name.as_str() {
            "returns_guest_pointer" => out.returns_guest_pointer = true,
            "custom_host_impl" => out.custom_host_impl = true,
            "custom_guest_entrypoint" => out.custom_guest_entrypoint = true,
            "callback_stub" => out.strategy = Some(CallbackStrategy::Stub),
            "callback_guest" => out.strategy = Some(CallbackStrategy::Guest),
            "uniform_va_type" => match &a.arg {
                Some(ty) => out.uniform_va_type = Some(ty.clone()),
                None => {
                    return Err(Diagnostic::new(
                        "uniform_va_type requires a type argument",
                        a.loc,
                    ));
                }
            },
            other => {
                return Err(Diagnostic::new(
                    format!("unknown annotation `{}`", other),
                    a.loc,
                ));
            }
        }
    }
    Ok(out)
}

fn process_function(
    decl: &FunctionDecl,
    ns: &NamespaceInfo,
    ns_idx: usize,
    interface: &mut Interface,
) -> Result<(), Diagnostic> {
    let annotations = read_annotations(&decl.annotations)?;

    if decl.return_type.function_pointee().is_some() && !annotations.returns_guest_pointer {
        return Err(Diagnostic::new(
            "function pointer return types require explicit annotation",
            decl.loc,
        ));
    }

    let mut function_name = decl.name.clone();
    let mut params = decl.params.clone();
    let mut custom_host_impl = annotations.custom_host_impl;
    let mut callbacks: BTreeMap<usize, ThunkedCallback> = BTreeMap::new();

    for (idx, param) in decl.params.iter().enumerate() {
        let Some(sig) = param.function_pointee() else {
            continue;
        };
        let strategy = annotations.strategy.unwrap_or(CallbackStrategy::Default);
        if strategy == CallbackStrategy::Guest && !custom_host_impl {
            return Err(Diagnostic::new(
                "callback_guest can only be used with custom_host_impl",
                decl.loc,
            ));
        }
        if !callbacks.is_empty() {
            return Err(Diagnostic::new(
                "only one callback parameter is supported per function",
                decl.loc,
            ));
        }
        if sig.variadic && strategy != CallbackStrategy::Stub {
            return Err(Diagnostic::new(
                "variadic callbacks are only supported as stubs",
                decl.loc,
            ));
        }
        if strategy == CallbackStrategy::Default {
            interface.funcptr_types.insert(sig);
        }
        callbacks.insert(
            idx,
            ThunkedCallback {
                return_type: sig.return_type.clone(),
                params: sig.params.clone(),
                strategy,
                is_variadic: sig.variadic,
            },
        );
    }

    // The API export is derived before any variadic rewriting so it
    // matches the native library's signature.
    interface.thunked_api.push(ThunkedApiFunction {
        function_name: decl.name.clone(),
        return_type: decl.return_type.clone(),
        params: decl.params.clone(),
        is_variadic: decl.variadic,
        custom_guest_impl: decl.variadic || annotations.custom_guest_entrypoint,
        host_loader: ns.resolved_host_loader().to_string(),
        namespace_index: ns_idx,
        symtable_namespace: ns.generate_guest_symtable.then_some(ns_idx),
    });

    if decl.variadic {
        let Some(va_type) = &annotations.uniform_va_type else {
            return Err(Diagnostic::new(
                "variadic functions must be annotated with uniform_va_type",
                decl.loc,
            ));
        };
        // Marshal the variadic tail as a count plus a uniform value array
        params.push(QualType::unqualified(CType::ULong)); // canonical size_t
        params.push(QualType::pointer_to(va_type.clone()));
        function_name.push_str("_internal");
        if custom_host_impl {
            return Err(Diagnostic::new(
                "custom_host_impl is implied for variadic functions",
                decl.loc,
            ));
        }
        custom_host_impl = true;
    }

    if ns.indirect_guest_calls {
        interface.funcptr_types.insert(&FunctionSig {
            return_type: decl.return_type.clone(),
            params: decl.params.clone(),
            variadic: decl.variadic,
        });
    }

    interface.thunks.push(ThunkedFunction {
        function_name,
        return_type: decl.return_type.clone(),
        params,
        is_variadic: decl.variadic,
        custom_host_impl,
        callbacks,
    });

    Ok(())
}
