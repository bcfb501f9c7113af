//! Compiler configuration: assembler invocation and preprocessor limits.
//!
//! `CompilerConfig` can be built programmatically via the builder methods
//! below, or loaded from a TOML file (see [`CompilerConfig::from_toml_str`])
//! for projects that want to check in a `tpc.toml` alongside their sources.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::CompileError;

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;
const DEFAULT_ASSEMBLER: &str = "clang";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Binary invoked to assemble and link the generated `.s` file.
    pub assembler: String,

    /// Extra arguments passed to the assembler before `-o <output> <asm>`.
    pub assembler_args: Vec<String>,

    /// Maximum `{$I}` nesting depth before preprocessing fails.
    pub max_include_depth: usize,

    /// Directory used for the intermediate assembly file when the caller
    /// doesn't request `-S`. Defaults to the platform temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            assembler: DEFAULT_ASSEMBLER.to_string(),
            assembler_args: Vec::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            temp_dir: None,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_assembler(mut self, assembler: impl Into<String>) -> Self {
        self.assembler = assembler.into();
        self
    }

    pub fn with_assembler_arg(mut self, arg: impl Into<String>) -> Self {
        self.assembler_args.push(arg.into());
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, CompileError> {
        toml::from_str(s).map_err(|e| CompileError::Io(format!("invalid config: {e}")))
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_driver() {
        let cfg = CompilerConfig::new();
        assert_eq!(cfg.assembler, "clang");
        assert_eq!(cfg.max_include_depth, 8);
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = CompilerConfig::new()
            .with_assembler("gcc")
            .with_max_include_depth(4)
            .with_assembler_arg("-static");
        assert_eq!(cfg.assembler, "gcc");
        assert_eq!(cfg.max_include_depth, 4);
        assert_eq!(cfg.assembler_args, vec!["-static"]);
    }

    #[test]
    fn parses_from_toml() {
        let cfg = CompilerConfig::from_toml_str(
            r#"
            assembler = "gcc"
            max_include_depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.assembler, "gcc");
        assert_eq!(cfg.max_include_depth, 3);
    }
}
