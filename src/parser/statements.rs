//! Statement grammar and control-flow lowering.
//!
//! Each construct allocates fresh labels via `self.emitter.new_label()`;
//! comparisons test `x0` against zero with `b.eq`/`b.ne` to pick the
//! taken branch.

use crate::error::CompileError;
use crate::symtab::SymbolKind;
use crate::token::TokenKind;

use super::Parser;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<(), CompileError> {
        if self.at(&TokenKind::Begin) {
            self.bump()?;
            while !self.at(&TokenKind::End) && !self.at(&TokenKind::Eof) {
                self.parse_statement()?;
                if !self.at(&TokenKind::End) {
                    self.expect(TokenKind::Semicolon)?;
                }
            }
            self.expect(TokenKind::End)?;
        } else if self.at(&TokenKind::If) {
            self.parse_if_statement()?;
        } else if self.at(&TokenKind::While) {
            self.parse_while_statement()?;
        } else if self.at(&TokenKind::Repeat) {
            self.parse_repeat_statement()?;
        } else if self.at(&TokenKind::For) {
            self.parse_for_statement()?;
        } else if self.ident_name().is_some() {
            self.parse_assignment_or_call()?;
        }
        Ok(())
    }

    fn parse_if_statement(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::If)?;
        self.parse_expression()?;
        self.expect(TokenKind::Then)?;

        let else_label = self.emitter.new_label();
        let end_label = self.emitter.new_label();

        self.emitter.instr(format_args!("cmp x0, #0"))?;
        self.emitter.instr(format_args!("b.eq L{else_label}"))?;

        self.parse_statement()?;

        let has_else = self.at(&TokenKind::Else);
        if has_else {
            self.emitter.instr(format_args!("b L{end_label}"))?;
        }

        self.emitter.label(else_label)?;

        if self.match_tok(&TokenKind::Else)? {
            self.parse_statement()?;
        }

        self.emitter.label(end_label)?;
        Ok(())
    }

    fn parse_while_statement(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::While)?;

        let loop_label = self.emitter.new_label();
        let end_label = self.emitter.new_label();

        self.emitter.label(loop_label)?;
        self.parse_expression()?;
        self.emitter.instr(format_args!("cmp x0, #0"))?;
        self.emitter.instr(format_args!("b.eq L{end_label}"))?;

        self.expect(TokenKind::Do)?;
        self.parse_statement()?;

        self.emitter.instr(format_args!("b L{loop_label}"))?;
        self.emitter.label(end_label)?;
        Ok(())
    }

    fn parse_repeat_statement(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Repeat)?;

        let loop_label = self.emitter.new_label();
        self.emitter.label(loop_label)?;

        while !self.at(&TokenKind::Until) && !self.at(&TokenKind::Eof) {
            self.parse_statement()?;
            if !self.at(&TokenKind::Until) {
                self.expect(TokenKind::Semicolon)?;
            }
        }

        self.expect(TokenKind::Until)?;
        self.parse_expression()?;

        self.emitter.instr(format_args!("cmp x0, #0"))?;
        self.emitter.instr(format_args!("b.eq L{loop_label}"))?;
        Ok(())
    }

    fn parse_for_statement(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::For)?;

        let var_name = self
            .ident_name()
            .ok_or_else(|| self.syntax_error("expected identifier"))?;
        self.bump()?;

        let sym = self
            .symbols
            .lookup(&var_name)
            .cloned()
            .filter(|s| matches!(s.kind, SymbolKind::Var | SymbolKind::Param))
            .ok_or_else(|| self.semantic_error("for loop variable must be a variable"))?;

        self.expect(TokenKind::Assign)?;
        self.parse_expression()?;
        self.store_symbol_value(&sym)?;

        let downto = if self.match_tok(&TokenKind::To)? {
            false
        } else if self.match_tok(&TokenKind::Downto)? {
            true
        } else {
            return Err(self.syntax_error("expected 'to' or 'downto'"));
        };

        self.parse_expression()?;
        self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;

        self.expect(TokenKind::Do)?;

        let loop_label = self.emitter.new_label();
        let end_label = self.emitter.new_label();

        self.emitter.label(loop_label)?;

        self.load_symbol_value(&sym)?;
        self.emitter.instr(format_args!("ldur x1, [sp]"))?;
        if downto {
            self.emitter.instr(format_args!("cmp x0, x1"))?;
            self.emitter.instr(format_args!("b.lt L{end_label}"))?;
        } else {
            self.emitter.instr(format_args!("cmp x0, x1"))?;
            self.emitter.instr(format_args!("b.gt L{end_label}"))?;
        }

        self.parse_statement()?;

        self.load_symbol_value(&sym)?;
        if downto {
            self.emitter.instr(format_args!("sub x0, x0, #1"))?;
        } else {
            self.emitter.instr(format_args!("add x0, x0, #1"))?;
        }
        self.store_symbol_value(&sym)?;

        self.emitter.instr(format_args!("b L{loop_label}"))?;
        self.emitter.label(end_label)?;

        self.emitter.instr(format_args!("add sp, sp, #16"))?;
        Ok(())
    }

    fn parse_assignment_or_call(&mut self) -> Result<(), CompileError> {
        let name = self.ident_name().expect("caller checked ident");
        self.bump()?;

        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "write" | "writeln" => return self.parse_write_call(lower == "writeln"),
            "writechar" => {
                self.expect(TokenKind::LParen)?;
                self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                let label = self
                    .runtime
                    .as_ref()
                    .expect("runtime prelude emitted before body")
                    .print_char;
                self.emitter.instr(format_args!("bl L{label}"))?;
                return Ok(());
            }
            "halt" => {
                if self.match_tok(&TokenKind::LParen)? {
                    self.parse_expression()?;
                    self.expect(TokenKind::RParen)?;
                } else {
                    self.emitter.instr(format_args!("mov x0, #0"))?;
                }
                self.emitter.exit_syscall()?;
                return Ok(());
            }
            _ => {}
        }

        let sym = self
            .symbols
            .lookup(&name)
            .cloned()
            .ok_or_else(|| self.semantic_error(format!("undefined identifier '{name}'")))?;

        if sym.kind == SymbolKind::Procedure {
            self.call_routine(&sym)?;
            return Ok(());
        }

        if self.match_tok(&TokenKind::LBracket)? {
            if !sym.ty.is_array() {
                return Err(self.semantic_error("indexing requires an array"));
            }
            self.emit_array_element_address(&sym)?;
            self.emitter.instr(format_args!("str x0, [sp, #-16]!"))?;
            self.expect(TokenKind::Assign)?;
            self.parse_expression()?;
            self.emitter.instr(format_args!("ldr x1, [sp], #16"))?;
            self.emitter.instr(format_args!("str x0, [x1]"))?;
            return Ok(());
        }

        self.expect(TokenKind::Assign)?;
        self.parse_expression()?;

        if matches!(sym.kind, SymbolKind::Var | SymbolKind::Param) {
            self.store_symbol_value(&sym)?;
        }
        Ok(())
    }

    fn parse_write_call(&mut self, newline: bool) -> Result<(), CompileError> {
        if self.match_tok(&TokenKind::LParen)? {
            if !self.at(&TokenKind::RParen) {
                loop {
                    if let Some(s) = self.string_value() {
                        self.bump()?;
                        let len = s.len();
                        let id = self.emitter.add_string(&s);
                        self.emitter.instr(format_args!("adrp x1, str{id}@PAGE"))?;
                        self.emitter.instr(format_args!("add x1, x1, str{id}@PAGEOFF"))?;
                        self.emitter.instr(format_args!("mov x0, #1"))?;
                        self.emitter.instr(format_args!("mov x2, #{len}"))?;
                        self.emitter.write_syscall()?;
                    } else {
                        self.parse_expression()?;
                        let label = self
                            .runtime
                            .as_ref()
                            .expect("runtime prelude emitted before body")
                            .print_int;
                        self.emitter.instr(format_args!("bl L{label}"))?;
                    }
                    if !self.match_tok(&TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
        }

        if newline {
            let label = self
                .runtime
                .as_ref()
                .expect("runtime prelude emitted before body")
                .newline;
            self.emitter.instr(format_args!("bl L{label}"))?;
        }
        Ok(())
    }
}
