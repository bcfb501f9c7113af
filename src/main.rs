//! tpc CLI
//!
//! Command-line interface for compiling `.pas` programs to ARM64 macOS
//! executables.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

use tpc::CompilerConfig;

#[derive(ClapParser)]
#[command(name = "tpc")]
#[command(about = "A single-pass Pascal-subset compiler targeting ARM64 macOS assembly", long_about = None)]
struct Cli {
    /// Input .pas source file
    input: PathBuf,

    /// Output file name (executable, or assembly when -S is given)
    #[arg(short = 'o', long, default_value = "a.out")]
    output: PathBuf,

    /// Emit assembly only; don't invoke the assembler/linker
    #[arg(short = 'S', long = "asm-only")]
    asm_only: bool,

    /// Keep the intermediate assembly file when producing an executable
    #[arg(long)]
    keep_asm: bool,

    /// Maximum `{$I}` include nesting depth
    #[arg(long)]
    max_include_depth: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = CompilerConfig::new();
    if let Some(depth) = cli.max_include_depth {
        config = config.with_max_include_depth(depth);
    }

    match tpc::compile_file(&cli.input, &cli.output, cli.asm_only, cli.keep_asm, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", cli.input.display(), cli.output.display());
            if cli.keep_asm && !cli.asm_only {
                let asm_path = cli.output.with_extension("s");
                println!("Assembly saved to {}", asm_path.display());
            }
        }
        Err(e) => {
            eprintln!("Compilation failed: {e}");
            process::exit(1);
        }
    }
}
