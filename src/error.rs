//! The single error type that flows out of every compiler phase.
//!
//! Every phase — preprocessing, lexing, parsing (which includes codegen,
//! since this compiler fuses the two) — returns `Result<_, CompileError>`.
//! There is no recovery and no multi-error reporting: the first error wins
//! and aborts the pipeline, exactly like the program this one replaces.

use std::fmt;

/// Where in the pipeline a [`CompileError`] originated.
#[derive(Debug)]
pub enum CompileError {
    /// Unexpected character or unterminated string from the lexer.
    Lex {
        file: String,
        line: usize,
        col: usize,
        message: String,
    },
    /// A specific token was required and a different one was found.
    Syntax {
        file: String,
        line: usize,
        col: usize,
        message: String,
        got: String,
    },
    /// Name resolution, duplicate declaration, and other static checks.
    Semantic {
        file: String,
        line: usize,
        col: usize,
        message: String,
    },
    /// `{$I file}` expansion failures: circular includes, depth, I/O.
    Preprocess(String),
    /// Reading the source file, writing the assembly file, or invoking
    /// the external assembler/linker failed.
    Io(String),
    /// A `write!` into the assembly buffer failed (effectively infallible
    /// for a `String` sink, but the codegen helpers propagate it anyway
    /// so a single `?` covers both logic and formatting failures).
    Format(fmt::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex {
                file,
                line,
                col,
                message,
            } => write!(f, "{file}:{line}:{col}: error: {message}"),
            CompileError::Syntax {
                file,
                line,
                col,
                message,
                got,
            } => write!(f, "{file}:{line}:{col}: error: {message} (got '{got}')"),
            CompileError::Semantic {
                file,
                line,
                col,
                message,
            } => write!(f, "{file}:{line}:{col}: error: {message}"),
            CompileError::Preprocess(msg) => write!(f, "error: {msg}"),
            CompileError::Io(msg) => write!(f, "error: {msg}"),
            CompileError::Format(e) => write!(f, "error: {e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<fmt::Error> for CompileError {
    fn from(e: fmt::Error) -> Self {
        CompileError::Format(e)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}
