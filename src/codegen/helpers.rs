//! Shared formatting helpers for the section emitters.

use crate::types::{QualType, render_declaration};

/// Parameter list with positional names: `int a_0, const char *a_1`,
/// plus a trailing `...` for variadic signatures.
pub(crate) fn format_function_params(params: &[QualType], variadic: bool) -> String {
    let mut parts: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(idx, ty)| render_declaration(ty, &format!("a_{}", idx)))
        .collect();
    if variadic {
        parts.push("...".to_string());
    }
    parts.join(", ")
}

/// Packed-args struct members, one per parameter, with top-level
/// qualifiers stripped so the struct fields stay assignable.
pub(crate) fn format_struct_members(params: &[QualType], indent: &str) -> String {
    let mut out = String::new();
    for (idx, ty) in params.iter().enumerate() {
        out.push_str(indent);
        out.push_str(&render_declaration(
            &ty.strip_qualifiers(),
            &format!("a_{}", idx),
        ));
        out.push_str(";\n");
    }
    out
}

/// Comma-joined call arguments, one formatted entry per parameter.
pub(crate) fn format_call_args(count: usize, format_arg: impl Fn(usize) -> String) -> String {
    (0..count).map(format_arg).collect::<Vec<_>>().join(", ")
}
