//! Code emission from the frozen interface model.
//!
//! The generator owns the library naming (raw filename for `dlopen`,
//! sanitised name for C identifiers) and writes each selected output
//! file in one sequential pass. Section emitters live in `guest.rs` and
//! `host.rs`; the unified guest/host files are concatenations of the
//! same sections the legacy multi-file variant writes individually.

pub mod guest;
mod helpers;
pub mod host;

use crate::digest;
use crate::model::Interface;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `dlopen` scope used by the generated loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtldMode {
    Global,
    Local,
}

impl RtldMode {
    pub(crate) fn spelling(self) -> &'static str {
        match self {
            RtldMode::Global => "RTLD_GLOBAL",
            RtldMode::Local => "RTLD_LOCAL",
        }
    }
}

/// Output selection: only non-empty paths are written.
#[derive(Debug, Default)]
pub struct OutputFilenames {
    pub guest: Option<PathBuf>,
    pub host: Option<PathBuf>,
    pub thunks: Option<PathBuf>,
    pub function_packs: Option<PathBuf>,
    pub function_packs_public: Option<PathBuf>,
    pub function_unpacks: Option<PathBuf>,
    pub tab_function_unpacks: Option<PathBuf>,
    pub ldr: Option<PathBuf>,
    pub ldr_ptrs: Option<PathBuf>,
    pub symbol_list: Option<PathBuf>,
}

pub struct Generator<'a> {
    pub(crate) interface: &'a Interface,
    /// Raw library filename, used for `dlopen`.
    pub(crate) libfilename: String,
    /// Sanitised C identifier prefix.
    pub(crate) libname: String,
    /// User override of the dlopen scope; each output kind has its own
    /// default otherwise.
    pub(crate) rtld: Option<RtldMode>,
}

impl<'a> Generator<'a> {
    pub fn new(
        interface: &'a Interface,
        libfilename: impl Into<String>,
        rtld: Option<RtldMode>,
    ) -> Self {
        let libfilename = libfilename.into();
        let libname = digest::sanitize_libname(&libfilename);
        Generator {
            interface,
            libfilename,
            libname,
            rtld,
        }
    }

    /// The unified guest translation unit: transition thunks, callback
    /// thunks, packing functions, public aliases and symbol tables, and
    /// the symbol-enumeration macros.
    pub fn emit_guest(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.emit_thunks());
        out.push('\n');
        out.push_str(&self.emit_function_packs());
        out.push('\n');
        out.push_str(&self.emit_function_packs_public());
        let symbols = self.emit_symbol_list();
        if !symbols.is_empty() {
            out.push('\n');
            out.push_str(&symbols);
        }
        out
    }

    /// The unified host translation unit: loader pointer declarations,
    /// unpacking dispatchers, the digest-keyed export table, and the
    /// library loader.
    pub fn emit_host(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.emit_ldr_ptrs());
        out.push('\n');
        out.push_str(&self.emit_function_unpacks(true));
        out.push('\n');
        out.push_str(&self.emit_exports());
        out.push('\n');
        out.push_str(&self.emit_ldr(RtldMode::Global));
        out
    }

    /// Write every selected output. Any failure to create a file is
    /// fatal; earlier outputs may already be on disk.
    pub fn write_outputs(&self, outputs: &OutputFilenames) -> Result<()> {
        self.write_one(&outputs.guest, "guest", Self::emit_guest)?;
        self.write_one(&outputs.host, "host", Self::emit_host)?;
        self.write_one(&outputs.thunks, "thunks", Self::emit_thunks)?;
        self.write_one(&outputs.function_packs, "function_packs", Self::emit_function_packs)?;
        self.write_one(
            &outputs.function_packs_public,
            "function_packs_public",
            Self::emit_function_packs_public,
        )?;
        self.write_one(&outputs.function_unpacks, "function_unpacks", |g| {
            g.emit_function_unpacks(false)
        })?;
        self.write_one(
            &outputs.tab_function_unpacks,
            "tab_function_unpacks",
            Self::emit_tab_function_unpacks,
        )?;
        self.write_one(&outputs.ldr, "ldr", |g| g.emit_ldr(RtldMode::Local))?;
        self.write_one(&outputs.ldr_ptrs, "ldr_ptrs", Self::emit_ldr_ptrs)?;
        self.write_one(&outputs.symbol_list, "symbol_list", Self::emit_symbol_list)?;
        Ok(())
    }

    fn write_one(
        &self,
        path: &Option<PathBuf>,
        what: &str,
        emit: impl Fn(&Self) -> String,
    ) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        fs::write(path, emit(self))
            .with_context(|| format!("failed to write {} output to {}", what, path.display()))?;
        log::info!("wrote {} output to {}", what, path.display());
        Ok(())
    }
}
