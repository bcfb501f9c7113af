//! Recursive-descent parser fused with code generation.
//!
//! There is no AST: every grammar production emits its assembly as it
//! recognizes the construct. The split across files (`expressions`,
//! `statements`, `declarations`) is purely organizational — all three are
//! `impl Parser` blocks extending the single struct defined here.

mod declarations;
mod expressions;
mod statements;

use tracing::debug;

use crate::codegen::{emit_runtime_prelude, Emitter, RuntimeLabels};
use crate::error::CompileError;
use crate::symtab::SymbolTable;
use crate::token::{Lexer, TokenKind};

pub struct Parser {
    lexer: Lexer,
    pub(crate) symbols: SymbolTable,
    pub(crate) emitter: Emitter,
    pub(crate) runtime: Option<RuntimeLabels>,
}

impl Parser {
    pub fn new(source: &str, filename: impl Into<String>) -> Result<Self, CompileError> {
        Ok(Parser {
            lexer: Lexer::new(source, filename)?,
            symbols: SymbolTable::new(),
            emitter: Emitter::new(),
            runtime: None,
        })
    }

    fn kind(&self) -> &TokenKind {
        &self.lexer.current.kind
    }

    fn line_col(&self) -> (usize, usize) {
        (self.lexer.current.line, self.lexer.current.col)
    }

    fn filename(&self) -> String {
        self.lexer.filename().to_string()
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn ident_name(&self) -> Option<String> {
        match self.kind() {
            TokenKind::Ident(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn integer_value(&self) -> Option<i64> {
        match self.kind() {
            TokenKind::Integer(v) => Some(*v),
            _ => None,
        }
    }

    fn string_value(&self) -> Option<String> {
        match self.kind() {
            TokenKind::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn bump(&mut self) -> Result<(), CompileError> {
        self.lexer.advance()
    }

    fn match_tok(&mut self, kind: &TokenKind) -> Result<bool, CompileError> {
        if self.at(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        if self.match_tok(&kind)? {
            Ok(())
        } else {
            Err(self.syntax_error(format!("expected '{}'", kind.name())))
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> CompileError {
        let (line, col) = self.line_col();
        CompileError::Syntax {
            file: self.filename(),
            line,
            col,
            message: message.into(),
            got: self.kind().name().to_string(),
        }
    }

    fn semantic_error(&self, message: impl Into<String>) -> CompileError {
        let (line, col) = self.line_col();
        CompileError::Semantic {
            file: self.filename(),
            line,
            col,
            message: message.into(),
        }
    }

    fn current_level(&self) -> usize {
        self.symbols.level()
    }

    /// Parse a whole program and return the generated assembly text.
    pub fn parse_program(mut self) -> Result<String, CompileError> {
        self.emitter.raw(format_args!(".global _main"))?;
        self.emitter.raw(format_args!(".align 4"))?;
        self.emitter.raw(format_args!(""))?;

        let main_label = self.emitter.new_label();
        self.emitter.raw(format_args!("_main:"))?;
        self.emitter.instr(format_args!("b L{main_label}"))?;

        let rt = emit_runtime_prelude(&mut self.emitter)?;
        debug!(
            print_int = rt.print_int,
            newline = rt.newline,
            readchar = rt.readchar,
            print_char = rt.print_char,
            "emitted runtime prelude"
        );
        self.runtime = Some(rt);

        self.emitter.raw(format_args!("\n// Main program"))?;
        self.emitter.label(main_label)?;

        self.expect(TokenKind::Program)?;
        if self.ident_name().is_none() {
            return Err(self.syntax_error("expected program name"));
        }
        self.bump()?;

        if self.match_tok(&TokenKind::LParen)? {
            while !self.at(&TokenKind::RParen) && !self.at(&TokenKind::Eof) {
                if self.ident_name().is_some() {
                    self.bump()?;
                }
                if !self.at(&TokenKind::RParen) {
                    self.expect(TokenKind::Comma)?;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        self.expect(TokenKind::Semicolon)?;

        self.parse_block_main()?;
        self.expect(TokenKind::Dot)?;

        self.emitter.instr(format_args!("mov x0, #0"))?;
        self.emitter.exit_syscall()?;

        self.emitter.emit_string_pool()?;

        Ok(self.emitter.into_text())
    }
}
