mod common;

use anyhow::Result;
use common::{guest_for, sha256_byte_list};

#[test]
fn minimal_function_emits_thunk_pack_and_alias() -> Result<()> {
    let guest = guest_for("int foo(int);", "libtest")?;

    let digest = sha256_byte_list("libtest:foo");
    assert!(
        guest.contains(&format!("MAKE_THUNK(libtest, foo, \"{}\")", digest)),
        "missing transition thunk with the expected digest: {}",
        guest
    );
    assert!(guest.contains("FEX_PACKFN_LINKAGE auto fexfn_pack_foo(int a_0) -> int {"));
    assert!(guest.contains("    int a_0;"));
    assert!(guest.contains("    int rv;"));
    assert!(guest.contains("  args.a_0 = a_0;"));
    assert!(guest.contains("  fexthunks_libtest_foo(&args);"));
    assert!(guest.contains("  return args.rv;"));
    assert!(
        guest.contains("__attribute__((alias(\"fexfn_pack_foo\"))) auto foo(int a_0) -> int;")
    );
    Ok(())
}

#[test]
fn dashed_library_names_are_sanitized_for_identifiers() -> Result<()> {
    let guest = guest_for("void f();", "lib-dashed")?;
    assert!(guest.contains("MAKE_THUNK(lib_dashed, f,"));
    assert!(guest.contains("fexthunks_lib_dashed_f(&args);"));
    // digests hash the sanitised name
    assert!(guest.contains(&sha256_byte_list("lib_dashed:f")));
    Ok(())
}

#[test]
fn parameterless_void_function_gets_sentinel_member() -> Result<()> {
    let guest = guest_for("void flush(void);", "libtest")?;
    assert!(guest.contains("    char force_nonempty;"));
    assert!(!guest.contains("rv;"));
    Ok(())
}

#[test]
fn variadic_function_packs_through_internal_form() -> Result<()> {
    let src = "[[uniform_va_type(int)]]\nint printf(const char* fmt, ...);";
    let guest = guest_for(src, "libtest")?;

    // the thunk targets the rewritten internal symbol
    assert!(guest.contains("MAKE_THUNK(libtest, printf_internal,"));
    assert!(guest.contains(&sha256_byte_list("libtest:printf_internal")));

    // marshalled as count + uniform value array
    assert!(guest.contains("fexfn_pack_printf_internal(const char *a_0, unsigned long a_1, int *a_2) -> int {"));
    assert!(guest.contains("    const char *a_0;"));
    assert!(guest.contains("    unsigned long a_1;"));
    assert!(guest.contains("    int *a_2;"));

    // the public entry point is hand-written, so no alias is generated
    assert!(!guest.contains("__attribute__((alias"));
    // but the symbol list still names the public form
    assert!(guest.contains("EXPAND(printf, \"TODO\")"));
    assert!(!guest.contains("EXPAND(printf_internal"));
    Ok(())
}

#[test]
fn default_callback_is_wrapped_in_a_trampoline() -> Result<()> {
    let guest = guest_for("void setcb(void (*cb)(int));", "libtest")?;

    assert!(guest.contains("  args.a_0 = AllocateHostTrampolineForGuestFunction(a_0);"));

    // the callback signature gets its own guest-side thunk, digest over
    // the canonical spelling
    let digest = sha256_byte_list("fexcallback_void (int)");
    assert!(guest.contains(&format!(
        "MAKE_CALLBACK_THUNK(callback_0, void (int), \"{}\");",
        digest
    )));
    assert!(guest.contains("  // void (int)"));
    Ok(())
}

#[test]
fn stub_and_guest_callbacks_bypass_the_trampoline() -> Result<()> {
    let stub = guest_for("[[callback_stub]]\nvoid setcb(void (*cb)(int));", "libtest")?;
    assert!(stub.contains("  args.a_0 = a_0;"));
    assert!(!stub.contains("AllocateHostTrampolineForGuestFunction"));
    assert!(!stub.contains("MAKE_CALLBACK_THUNK"));

    let guest = guest_for(
        "[[custom_host_impl, callback_guest]]\nvoid setcb(void (*cb)(int));",
        "libtest",
    )?;
    assert!(guest.contains("  args.a_0 = a_0;"));
    assert!(!guest.contains("AllocateHostTrampolineForGuestFunction"));
    Ok(())
}

#[test]
fn typedef_chains_share_one_callback_thunk() -> Result<()> {
    let src = "typedef void (*CbA)(int);\ntypedef void (*CbB)(int);\nvoid f(CbA a);\nvoid g(CbB b);";
    let guest = guest_for(src, "libtest")?;
    assert_eq!(guest.matches("MAKE_CALLBACK_THUNK").count(), 1);
    assert!(guest.contains("MAKE_CALLBACK_THUNK(callback_0, void (int),"));
    Ok(())
}

#[test]
fn indirect_namespace_registers_every_signature() -> Result<()> {
    let src = "namespace x { config { indirect_guest_calls; }\nvoid a(int);\nint b(); }";
    let guest = guest_for(src, "libtest")?;
    assert!(guest.contains("MAKE_CALLBACK_THUNK(callback_0, void (int),"));
    assert!(guest.contains("MAKE_CALLBACK_THUNK(callback_1, int (),"));
    Ok(())
}

#[test]
fn function_pointer_return_uses_trailing_return_type() -> Result<()> {
    let src = "[[returns_guest_pointer]]\nvoid (*gethandler(int))(char);";
    let guest = guest_for(src, "libtest")?;
    assert!(guest.contains("auto fexfn_pack_gethandler(int a_0) -> void (*)(char) {"));
    assert!(guest.contains("    void (*rv)(char);"));
    Ok(())
}

#[test]
fn custom_guest_entrypoint_suppresses_the_alias() -> Result<()> {
    let guest = guest_for("[[custom_guest_entrypoint]]\nvoid f(int);", "libtest")?;
    assert!(!guest.contains("__attribute__((alias"));
    // the packing function itself is still generated
    assert!(guest.contains("fexfn_pack_f(int a_0)"));
    Ok(())
}

#[test]
fn symtable_namespace_emits_table_and_scoped_macro() -> Result<()> {
    let src = "namespace foo { config { generate_guest_symtable; }\nvoid a(); }\nvoid b();";
    let guest = guest_for(src, "libtest")?;

    assert!(guest.contains(
        "static struct { const char* name; void (*fn)(); } foo_symtable[] = {"
    ));
    assert!(guest.contains("  { \"a\", (void(*)())&a },"));
    assert!(guest.contains("  { nullptr, nullptr }"));

    // the macro for foo lists a only; b lands in the global macro
    let foo_macro = guest
        .split("#define FOREACH_foo_SYMBOL(EXPAND)")
        .nth(1)
        .and_then(|rest| rest.split("\n\n").next())
        .expect("missing FOREACH_foo_SYMBOL");
    assert!(foo_macro.contains("EXPAND(a, \"TODO\")"));
    assert!(!foo_macro.contains("EXPAND(b,"));

    let global_macro = guest
        .split("#define FOREACH_SYMBOL(EXPAND)")
        .nth(1)
        .and_then(|rest| rest.split("\n\n").next())
        .expect("missing FOREACH_SYMBOL");
    assert!(global_macro.contains("EXPAND(b, \"TODO\")"));
    Ok(())
}
