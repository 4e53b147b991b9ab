use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use thunkgen::codegen::{Generator, OutputFilenames, RtldMode};

/// `dlopen` scope override; each output kind has a variant-faithful
/// default (unified host: global, legacy ldr: local).
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum RtldArg {
    Global,
    Local,
}

#[derive(Parser)]
#[command(
    name = "thunkgen",
    about = "Generates guest/host call-marshalling code for thunked native libraries",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Interface description file
    input: PathBuf,

    /// Library filename the generated loader dlopens (e.g. libGL);
    /// also derives the C identifier prefix
    #[arg(long)]
    libname: String,

    /// Unified guest translation unit
    #[arg(long)]
    guest: Option<PathBuf>,
    /// Unified host translation unit
    #[arg(long)]
    host: Option<PathBuf>,

    // Legacy multi-file outputs, individually selectable
    #[arg(long)]
    thunks: Option<PathBuf>,
    #[arg(long)]
    function_packs: Option<PathBuf>,
    #[arg(long)]
    function_packs_public: Option<PathBuf>,
    #[arg(long)]
    function_unpacks: Option<PathBuf>,
    #[arg(long)]
    tab_function_unpacks: Option<PathBuf>,
    #[arg(long)]
    ldr: Option<PathBuf>,
    #[arg(long)]
    ldr_ptrs: Option<PathBuf>,
    #[arg(long)]
    symbol_list: Option<PathBuf>,

    /// Override the dlopen scope of the generated loader
    #[arg(long, value_enum)]
    rtld: Option<RtldArg>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let input_name = cli.input.display().to_string();

    let interface = thunkgen::build_interface(&source, Some(&input_name))?;
    log::debug!(
        "parsed {}: {} namespaces, {} thunks, {} exports, {} callback signatures",
        input_name,
        interface.namespaces.len(),
        interface.thunks.len(),
        interface.thunked_api.len(),
        interface.funcptr_types.len()
    );

    let rtld = cli.rtld.map(|mode| match mode {
        RtldArg::Global => RtldMode::Global,
        RtldArg::Local => RtldMode::Local,
    });
    let generator = Generator::new(&interface, cli.libname, rtld);
    generator.write_outputs(&OutputFilenames {
        guest: cli.guest,
        host: cli.host,
        thunks: cli.thunks,
        function_packs: cli.function_packs,
        function_packs_public: cli.function_packs_public,
        function_unpacks: cli.function_unpacks,
        tab_function_unpacks: cli.tab_function_unpacks,
        ldr: cli.ldr,
        ldr_ptrs: cli.ldr_ptrs,
        symbol_list: cli.symbol_list,
    })?;

    Ok(())
}
