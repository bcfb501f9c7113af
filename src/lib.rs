//! A single-pass compiler for a Pascal subset, targeting ARM64 macOS
//! assembly.
//!
//! The pipeline is: [`preprocessor::expand_includes`] splices in `{$I
//! file}` directives ahead of time, then [`parser::Parser`] lexes, parses,
//! and emits assembly in one pass — there is no intermediate AST. The
//! generated `.s` text is handed to an external assembler/linker
//! (`clang` by default) by [`compile_file`].

pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod preprocessor;
pub mod symtab;
pub mod token;
pub mod types;

pub use config::CompilerConfig;
pub use error::CompileError;
pub use parser::Parser;

use std::fs;
use std::path::Path;
use std::process::Command;

/// Compile Pascal source text already read into memory, expanding includes
/// relative to `filename`, and return the generated assembly text.
pub fn compile_source_to_asm(
    source: &str,
    filename: &str,
    config: &CompilerConfig,
) -> Result<String, CompileError> {
    let expanded = preprocessor::expand_includes_with_depth(
        source,
        filename,
        config.max_include_depth,
    )?;
    let parser = Parser::new(&expanded, filename)?;
    parser.parse_program()
}

/// Compile a `.pas` file straight through to an executable, shelling out
/// to the configured assembler/linker. If `asm_only` is set, `output_path`
/// receives the assembly text directly and no assembler is invoked. If
/// `keep_asm` is set (and `asm_only` is not), the intermediate assembly
/// file is left next to `output_path` instead of being deleted.
pub fn compile_file(
    source_path: &Path,
    output_path: &Path,
    asm_only: bool,
    keep_asm: bool,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("could not read '{}': {e}", source_path.display())))?;

    let filename = source_path.to_string_lossy().into_owned();
    let asm = compile_source_to_asm(&source, &filename, config)?;

    if asm_only {
        fs::write(output_path, asm)?;
        return Ok(());
    }

    let asm_file = if keep_asm {
        output_path.with_extension("s")
    } else {
        config.temp_dir().join(format!("tpc_{}.s", std::process::id()))
    };
    fs::write(&asm_file, asm)?;

    let asm_file_str = asm_file.to_string_lossy().into_owned();
    let output_str = output_path.to_string_lossy().into_owned();

    let status = Command::new(&config.assembler)
        .args(codegen::platform::link_args(&asm_file_str, &output_str))
        .args(&config.assembler_args)
        .status()
        .map_err(|e| CompileError::Io(format!("failed to run '{}': {e}", config.assembler)))?;

    if !keep_asm {
        let _ = fs::remove_file(&asm_file);
    }

    if !status.success() {
        return Err(CompileError::Io("assembly/linking failed".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program_to_assembly() {
        let src = "program hello; begin writeln('hi') end.";
        let asm = compile_source_to_asm(src, "hello.pas", &CompilerConfig::new()).unwrap();
        assert!(asm.contains(".global _main"));
        assert!(asm.contains("_main:"));
        assert!(asm.contains("str0: .ascii \"hi\""));
    }

    #[test]
    fn reports_a_syntax_error_with_location() {
        let src = "program bad; begin x := end.";
        let err = compile_source_to_asm(src, "bad.pas", &CompilerConfig::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad.pas"));
    }
}
