//! Expression grammar: `expression > simple_expression > term > factor`,
//! each level left-associative, each production leaving its value in `x0`.
//!
//! Binary operators share one pattern: spill the left operand with
//! `str x0, [sp, #-16]!` (a 16-byte slot keeps SP aligned even though only
//! 8 bytes are live), evaluate the right operand, move it to `x1`, reload
//! the left operand into `x0`, then emit the op.

use crate::error::CompileError;
use crate::symtab::{Symbol, SymbolKind};
use crate::token::TokenKind;

use super::Parser;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<(), CompileError> {
        self.parse_simple_expression()?;

        let cond = match self.kind() {
            TokenKind::Eq => Some("eq"),
            TokenKind::Neq => Some("ne"),
            TokenKind::Lt => Some("lt"),
            TokenKind::Gt => Some("gt"),
            TokenKind::Le => Some("le"),
            TokenKind::Ge => Some("ge"),
            _ => None,
        };

        if let Some(cond) = cond {
            self.bump()?;
            self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
            self.parse_simple_expression()?;
            self.emitter.instr(format_args!("mov x1, x0"))?;
            self.emitter.instr(format_args!("ldr x0, [sp], #16"))?;
            self.emitter.instr(format_args!("cmp x0, x1"))?;
            self.emitter.instr(format_args!("cset x0, {cond}"))?;
        }
        Ok(())
    }

    pub(crate) fn parse_simple_expression(&mut self) -> Result<(), CompileError> {
        let negate = if self.match_tok(&TokenKind::Plus)? {
            false
        } else if self.match_tok(&TokenKind::Minus)? {
            true
        } else {
            false
        };

        self.parse_term()?;
        if negate {
            self.emitter.instr(format_args!("neg x0, x0"))?;
        }

        loop {
            let op = match self.kind() {
                TokenKind::Plus => "add",
                TokenKind::Minus => "sub",
                TokenKind::Or => "orr",
                _ => break,
            };
            self.bump()?;
            self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
            self.parse_term()?;
            self.emitter.instr(format_args!("mov x1, x0"))?;
            self.emitter.instr(format_args!("ldr x0, [sp], #16"))?;
            self.emitter.instr(format_args!("{op} x0, x0, x1"))?;
        }
        Ok(())
    }

    pub(crate) fn parse_term(&mut self) -> Result<(), CompileError> {
        self.parse_factor()?;

        loop {
            enum Op {
                Mul,
                Div,
                Mod,
                And,
            }
            let op = match self.kind() {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash | TokenKind::Div => Op::Div,
                TokenKind::Mod => Op::Mod,
                TokenKind::And => Op::And,
                _ => break,
            };
            self.bump()?;
            self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
            self.parse_factor()?;
            self.emitter.instr(format_args!("mov x1, x0"))?;
            self.emitter.instr(format_args!("ldr x0, [sp], #16"))?;
            match op {
                Op::Mul => self.emitter.instr(format_args!("mul x0, x0, x1"))?,
                Op::Div => self.emitter.instr(format_args!("sdiv x0, x0, x1"))?,
                Op::Mod => {
                    self.emitter.instr(format_args!("sdiv x2, x0, x1"))?;
                    self.emitter.instr(format_args!("msub x0, x2, x1, x0"))?;
                }
                Op::And => self.emitter.instr(format_args!("and x0, x0, x1"))?,
            }
        }
        Ok(())
    }

    pub(crate) fn parse_factor(&mut self) -> Result<(), CompileError> {
        if let Some(name) = self.ident_name() {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "readchar" => {
                    self.bump()?;
                    if self.match_tok(&TokenKind::LParen)? {
                        self.expect(TokenKind::RParen)?;
                    }
                    let label = self.runtime.as_ref().expect("runtime prelude emitted before body").readchar;
                    self.emitter.instr(format_args!("bl L{label}"))?;
                    return Ok(());
                }
                "ord" | "chr" => {
                    self.bump()?;
                    self.expect(TokenKind::LParen)?;
                    self.parse_expression()?;
                    self.expect(TokenKind::RParen)?;
                    return Ok(());
                }
                _ => {}
            }
        }

        if let Some(val) = self.integer_value() {
            self.bump()?;
            self.emitter.load_immediate("x0", val)?;
            return Ok(());
        }

        if self.string_value().is_some() {
            return Err(self.semantic_error("string literals only allowed in write/writeln"));
        }

        if self.match_tok(&TokenKind::True)? {
            self.emitter.instr(format_args!("mov x0, #1"))?;
            return Ok(());
        }
        if self.match_tok(&TokenKind::False)? {
            self.emitter.instr(format_args!("mov x0, #0"))?;
            return Ok(());
        }

        if let Some(name) = self.ident_name() {
            self.bump()?;
            return self.parse_identifier_factor(&name);
        }

        if self.match_tok(&TokenKind::LParen)? {
            self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(());
        }

        if self.match_tok(&TokenKind::Not)? {
            self.parse_factor()?;
            self.emitter.instr(format_args!("cmp x0, #0"))?;
            self.emitter.instr(format_args!("cset x0, eq"))?;
            return Ok(());
        }

        Err(self.syntax_error("expected expression"))
    }

    fn parse_identifier_factor(&mut self, name: &str) -> Result<(), CompileError> {
        let sym = self
            .symbols
            .lookup(name)
            .cloned()
            .ok_or_else(|| self.semantic_error(format!("undefined identifier '{name}'")))?;

        match sym.kind {
            SymbolKind::Const => {
                self.emitter.load_immediate("x0", sym.const_val)?;
            }
            SymbolKind::Function => {
                self.call_routine(&sym)?;
            }
            SymbolKind::Var | SymbolKind::Param => {
                if self.at(&TokenKind::LParen) {
                    if let Some(func) = self.symbols.lookup_enclosing_function(name).cloned() {
                        self.call_routine(&func)?;
                    } else {
                        self.load_symbol_value(&sym)?;
                    }
                } else if self.match_tok(&TokenKind::LBracket)? {
                    self.parse_array_read(&sym)?;
                } else {
                    self.load_symbol_value(&sym)?;
                }
            }
            SymbolKind::Procedure => {
                return Err(self.semantic_error(format!("'{name}' is a procedure, not a value")));
            }
        }
        Ok(())
    }

    /// Evaluate a call's argument list (already pointing at `(` or past
    /// it is not yet consumed), spilling each argument left to right and
    /// reloading into `x0..xN-1`, then emit the static link and `bl`.
    pub(crate) fn call_routine(&mut self, sym: &Symbol) -> Result<(), CompileError> {
        let mut arg_count = 0usize;
        if self.match_tok(&TokenKind::LParen)? {
            if !self.at(&TokenKind::RParen) {
                loop {
                    self.parse_expression()?;
                    self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
                    arg_count += 1;
                    if !self.match_tok(&TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        for i in (0..arg_count).rev() {
            self.emitter.instr(format_args!("ldr x{i}, [sp], #16"))?;
        }

        let current_level = self.current_level();
        self.emitter.static_link(sym.level, current_level)?;
        self.emitter.instr(format_args!("bl L{}", sym.label))?;
        Ok(())
    }

    pub(crate) fn load_symbol_value(&mut self, sym: &Symbol) -> Result<(), CompileError> {
        let current_level = self.current_level();
        if sym.level < current_level {
            self.emitter.load_outer(sym.offset, sym.level, current_level)?;
        } else {
            self.emitter.load_fp(sym.offset)?;
        }
        Ok(())
    }

    pub(crate) fn store_symbol_value(&mut self, sym: &Symbol) -> Result<(), CompileError> {
        let current_level = self.current_level();
        if sym.level < current_level {
            self.emitter.store_outer(sym.offset, sym.level, current_level)?;
        } else {
            self.emitter.store_fp(sym.offset)?;
        }
        Ok(())
    }

    /// Compute `x0 = address of arr[idx]` for a base whose address is
    /// already in `x0` before this is called is NOT the convention here —
    /// instead this emits the base-address computation itself, then reads
    /// the element. `[` has already been consumed.
    fn parse_array_read(&mut self, sym: &Symbol) -> Result<(), CompileError> {
        if !sym.ty.is_array() {
            return Err(self.semantic_error("indexing requires an array"));
        }
        self.emit_array_element_address(sym)?;
        self.emitter.instr(format_args!("ldr x0, [x0]"))?;
        Ok(())
    }

    /// Shared by reads and writes: leaves the element's address in `x0`.
    /// Expects `[` already consumed and stops right after the matching
    /// `]`.
    pub(crate) fn emit_array_element_address(&mut self, sym: &Symbol) -> Result<(), CompileError> {
        let (lo, current_level) = match &sym.ty {
            crate::types::Type::Array { lo, .. } => (*lo, self.current_level()),
            _ => unreachable!("checked by caller"),
        };

        if sym.level < current_level {
            self.emitter.addr_outer(sym.offset, sym.level, current_level)?;
        } else {
            self.emitter.addr_fp(sym.offset)?;
        }
        self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
        self.parse_expression()?;
        self.expect(TokenKind::RBracket)?;
        if lo != 0 {
            self.emitter.instr(format_args!("sub x0, x0, #{lo}"))?;
        }
        self.emitter.instr(format_args!("lsl x0, x0, #3"))?;
        self.emitter.instr(format_args!("ldr x1, [sp], #16"))?;
        self.emitter.instr(format_args!("add x0, x1, x0"))?;
        Ok(())
    }
}
