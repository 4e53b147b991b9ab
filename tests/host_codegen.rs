mod common;

use anyhow::Result;
use common::{host_for, host_for_with_rtld, sha256_string_literal};
use thunkgen::codegen::RtldMode;

#[test]
fn minimal_function_emits_loader_unpack_and_export() -> Result<()> {
    let host = host_for("int foo(int);", "libtest")?;

    assert!(host.contains("using fexldr_type_libtest_foo = auto (int a_0) -> int;"));
    assert!(host.contains("static fexldr_type_libtest_foo *fexldr_ptr_libtest_foo;"));

    assert!(host.contains("struct fexfn_packed_args_libtest_foo {"));
    assert!(host.contains("  int a_0;"));
    assert!(host.contains("  int rv;"));
    assert!(host.contains(
        "static void fexfn_unpack_libtest_foo(fexfn_packed_args_libtest_foo* args) {"
    ));
    assert!(host.contains("  args->rv = fexldr_ptr_libtest_foo(args->a_0);"));

    let digest = sha256_string_literal("libtest:foo");
    assert!(host.contains(&format!(
        "{{(uint8_t*)\"{}\", (void(*)(void *))&fexfn_unpack_libtest_foo}}, // libtest:foo",
        digest
    )));
    assert!(host.contains("static ExportEntry exports[] = {"));
    assert!(host.contains("  {nullptr, nullptr},"));

    assert!(host.contains("static void* fexldr_ptr_libtest_so;"));
    assert!(host.contains("extern \"C\" bool fexldr_init_libtest() {"));
    assert!(host.contains(
        "  fexldr_ptr_libtest_so = dlopen(\"libtest.so\", RTLD_GLOBAL | RTLD_LAZY);"
    ));
    assert!(host.contains("  if (!fexldr_ptr_libtest_so) { return false; }"));
    assert!(host.contains(
        "  (void*&)fexldr_ptr_libtest_foo = dlsym_default(fexldr_ptr_libtest_so, \"foo\");"
    ));
    assert!(host.contains("  return true;"));
    Ok(())
}

#[test]
fn library_version_suffixes_the_shared_object_name() -> Result<()> {
    let host = host_for("config { version = 5; }\nvoid f();", "libtest")?;
    assert!(host.contains("dlopen(\"libtest.so.5\","));
    Ok(())
}

#[test]
fn dashed_library_keeps_raw_filename_for_dlopen() -> Result<()> {
    let host = host_for("void f();", "lib-dashed")?;
    assert!(host.contains("dlopen(\"lib-dashed.so\","));
    assert!(host.contains("fexldr_init_lib_dashed()"));
    Ok(())
}

#[test]
fn rtld_override_switches_the_dlopen_scope() -> Result<()> {
    let host = host_for_with_rtld("void f();", "libtest", RtldMode::Local)?;
    assert!(host.contains("RTLD_LOCAL | RTLD_LAZY"));
    assert!(!host.contains("RTLD_GLOBAL"));
    Ok(())
}

#[test]
fn legacy_ldr_defaults_to_rtld_local() -> Result<()> {
    let interface = common::build("void f();")?;
    let generator = thunkgen::codegen::Generator::new(&interface, "libtest", None);
    let ldr = generator.emit_ldr(RtldMode::Local);
    assert!(ldr.contains("RTLD_LOCAL | RTLD_LAZY"));
    Ok(())
}

#[test]
fn custom_host_loader_resolves_the_symbols() -> Result<()> {
    let src = "namespace gl { config { load_host_endpoint_via = \"glsym\"; }\nvoid glFlush(); }";
    let host = host_for(src, "libGL")?;
    assert!(host.contains("  (void*&)fexldr_ptr_libGL_glFlush = glsym(fexldr_ptr_libGL_so, \"glFlush\");"));
    Ok(())
}

#[test]
fn stub_callback_gets_an_aborting_stub() -> Result<()> {
    let host = host_for("[[callback_stub]]\nvoid setcb(void (*cb)(int));", "libtest")?;

    assert!(host.contains("[[noreturn]] static void fexfn_unpack_setcbCBFN0_stub(int a_0) {"));
    assert!(host.contains(
        "  fprintf(stderr, \"FATAL: Attempted to invoke callback stub for setcb\\n\");"
    ));
    assert!(host.contains("  std::abort();"));

    // the dispatcher passes the stub in the callback's position
    assert!(host.contains("  fexldr_ptr_libtest_setcb(fexfn_unpack_setcbCBFN0_stub);"));
    // stub callbacks never join the indirect-call table
    assert!(!host.contains("CallbackUnpack"));
    Ok(())
}

#[test]
fn variadic_stub_callback_keeps_the_ellipsis() -> Result<()> {
    let host = host_for(
        "[[callback_stub]]\nvoid setlog(void (*log)(const char*, ...));",
        "libtest",
    )?;
    assert!(host.contains(
        "[[noreturn]] static void fexfn_unpack_setlogCBFN0_stub(const char *a_0, ...) {"
    ));
    Ok(())
}

#[test]
fn guest_callback_is_boxed_for_the_custom_impl() -> Result<()> {
    let src = "[[custom_host_impl, callback_guest]]\nvoid setcb(void (*cb)(int));";
    let host = host_for(src, "libtest")?;

    assert!(host.contains("auto fexfn_impl_libtest_setcb(fex_guest_function_ptr a_0) -> void;"));
    assert!(host.contains("  fexfn_impl_libtest_setcb(fex_guest_function_ptr{args->a_0});"));
    // neither trampoline hook appears for guest callbacks
    assert!(!host.contains("FinalizeHostTrampolineForGuestFunction"));
    assert!(!host.contains("AllocateHostTrampolineForGuestFunction"));
    Ok(())
}

#[test]
fn default_callback_is_finalized_before_the_call() -> Result<()> {
    let host = host_for("void setcb(void (*cb)(int));", "libtest")?;

    assert!(host.contains(
        "  fexldr_ptr_libtest_setcb((FinalizeHostTrampolineForGuestFunction(args->a_0), args->a_0));"
    ));

    // the callback signature is dispatchable through the export table
    let digest = sha256_string_literal("fexcallback_void (int)");
    assert!(host.contains(&format!(
        "{{(uint8_t*)\"{}\", (void(*)(void *))&CallbackUnpack<void (int)>::ForIndirectCall}},",
        digest
    )));
    Ok(())
}

#[test]
fn variadic_function_forward_declares_the_internal_impl() -> Result<()> {
    let src = "[[uniform_va_type(int)]]\nint printf(const char* fmt, ...);";
    let host = host_for(src, "libtest")?;

    assert!(host.contains(
        "auto fexfn_impl_libtest_printf_internal(const char *a_0, unsigned long a_1, int *a_2) -> int;"
    ));
    assert!(host.contains("  args->rv = fexfn_impl_libtest_printf_internal("));

    // the loader still resolves the public symbol with its native
    // variadic signature
    assert!(host.contains(
        "using fexldr_type_libtest_printf = auto (const char *a_0, ...) -> int;"
    ));
    assert!(host.contains("  (void*&)fexldr_ptr_libtest_printf = dlsym_default(fexldr_ptr_libtest_so, \"printf\");"));
    Ok(())
}

#[test]
fn custom_host_impl_dispatches_to_the_impl_function() -> Result<()> {
    let host = host_for("[[custom_host_impl]]\nint get_fd();", "libtest")?;
    assert!(host.contains("auto fexfn_impl_libtest_get_fd() -> int;"));
    assert!(host.contains("  args->rv = fexfn_impl_libtest_get_fd();"));
    assert!(!host.contains("args->rv = fexldr_ptr_libtest_get_fd"));
    Ok(())
}

#[test]
fn legacy_function_unpacks_omit_the_impl_declarations() -> Result<()> {
    let interface = common::build("[[custom_host_impl]]\nint get_fd();")?;
    let generator = thunkgen::codegen::Generator::new(&interface, "libtest", None);
    let unpacks = generator.emit_function_unpacks(false);
    assert!(!unpacks.contains("auto fexfn_impl_libtest_get_fd() -> int;"));
    // the dispatcher still calls it
    assert!(unpacks.contains("fexfn_impl_libtest_get_fd()"));
    Ok(())
}

#[test]
fn export_table_covers_thunks_then_callback_signatures() -> Result<()> {
    let src = "void setcb(void (*cb)(int));\nvoid other();";
    let host = host_for(src, "libtest")?;

    let exports_at = host.find("static ExportEntry exports[] = {").unwrap();
    let setcb_at = host[exports_at..].find("&fexfn_unpack_libtest_setcb").unwrap();
    let other_at = host[exports_at..].find("&fexfn_unpack_libtest_other").unwrap();
    let callback_at = host[exports_at..].find("CallbackUnpack").unwrap();
    let terminator_at = host[exports_at..].find("{nullptr, nullptr},").unwrap();
    assert!(setcb_at < other_at);
    assert!(other_at < callback_at);
    assert!(callback_at < terminator_at);
    Ok(())
}
