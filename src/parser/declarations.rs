//! Declarations: `const`, `var`, `array` types, and procedure/function
//! bodies, including the static-link discipline for nested routines.

use crate::error::CompileError;
use crate::symtab::SymbolKind;
use crate::token::TokenKind;
use crate::types::Type;

use super::Parser;

impl Parser {
    pub(crate) fn parse_type(&mut self) -> Result<Type, CompileError> {
        if self.match_tok(&TokenKind::IntegerType)? {
            return Ok(Type::Integer);
        }
        if self.match_tok(&TokenKind::CharType)? {
            return Ok(Type::Char);
        }
        if self.match_tok(&TokenKind::BooleanType)? {
            return Ok(Type::Boolean);
        }
        if self.match_tok(&TokenKind::StringType)? {
            return Ok(Type::String);
        }
        if self.match_tok(&TokenKind::Array)? {
            self.expect(TokenKind::LBracket)?;
            let lo = self
                .integer_value()
                .ok_or_else(|| self.syntax_error("expected integer"))?;
            self.bump()?;
            self.expect(TokenKind::DotDot)?;
            let hi = self
                .integer_value()
                .ok_or_else(|| self.syntax_error("expected integer"))?;
            self.bump()?;
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Of)?;
            let elem = self.parse_type()?;
            return Ok(Type::Array {
                lo,
                hi,
                elem: Box::new(elem),
            });
        }
        Err(self.syntax_error("expected type"))
    }

    pub(crate) fn parse_var_declarations(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Var)?;

        while self.ident_name().is_some() {
            let mut names = Vec::new();
            loop {
                let name = self
                    .ident_name()
                    .ok_or_else(|| self.syntax_error("expected identifier"))?;
                self.bump()?;
                names.push(name);
                if !self.match_tok(&TokenKind::Comma)? {
                    break;
                }
            }

            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            self.expect(TokenKind::Semicolon)?;

            for name in names {
                if self.symbols.lookup_local(&name).is_some() {
                    return Err(self.semantic_error(format!("duplicate identifier '{name}'")));
                }
                self.symbols.add(&name, SymbolKind::Var, ty.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn parse_const_declarations(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Const)?;

        while let Some(name) = self.ident_name() {
            self.bump()?;
            self.expect(TokenKind::Eq)?;

            let val = self
                .integer_value()
                .ok_or_else(|| self.semantic_error("expected constant value"))?;
            self.bump()?;
            self.expect(TokenKind::Semicolon)?;

            if self.symbols.lookup_local(&name).is_some() {
                return Err(self.semantic_error(format!("duplicate identifier '{name}'")));
            }
            let sym = self.symbols.add(&name, SymbolKind::Const, Type::Integer);
            let _ = sym;
            self.symbols
                .lookup_mut(&name)
                .expect("just added")
                .const_val = val;
        }
        Ok(())
    }

    /// Parse `( name {, name} : type {; name {, name} : type} )`, returning
    /// the flattened parameter list in declaration order. Rejects more
    /// than 8 parameters — this compiler passes the first 8 in registers
    /// and has nowhere to put the rest.
    pub(crate) fn parse_parameters(&mut self) -> Result<Vec<(String, Type)>, CompileError> {
        let mut params = Vec::new();
        self.expect(TokenKind::LParen)?;

        if !self.at(&TokenKind::RParen) {
            loop {
                let mut names = Vec::new();
                loop {
                    let name = self
                        .ident_name()
                        .ok_or_else(|| self.syntax_error("expected parameter name"))?;
                    self.bump()?;
                    names.push(name);
                    if !self.match_tok(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                for name in names {
                    params.push((name, ty.clone()));
                }
                if !self.match_tok(&TokenKind::Semicolon)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        if params.len() > 8 {
            return Err(self.semantic_error("more than 8 parameters is not supported"));
        }
        Ok(params)
    }

    /// Emit a `b Lbody` jump and return its label the first time a nested
    /// `procedure`/`function` is encountered among a block's declarations,
    /// so straight-line execution never falls into nested routine bodies.
    fn maybe_jump_over_nested(&mut self) -> Result<Option<u32>, CompileError> {
        if self.at(&TokenKind::Procedure) || self.at(&TokenKind::Function) {
            let label = self.emitter.new_label();
            self.emitter.instr(format_args!("b L{label}"))?;
            Ok(Some(label))
        } else {
            Ok(None)
        }
    }

    fn parse_nested_routines(&mut self) -> Result<(), CompileError> {
        while self.at(&TokenKind::Procedure) || self.at(&TokenKind::Function) {
            if self.at(&TokenKind::Procedure) {
                self.parse_procedure_declaration()?;
            } else {
                self.parse_function_declaration()?;
            }
        }
        Ok(())
    }

    pub(crate) fn parse_procedure_declaration(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Procedure)?;
        let name = self
            .ident_name()
            .ok_or_else(|| self.syntax_error("expected procedure name"))?;
        self.bump()?;

        let is_forward_decl = self.symbols.lookup_local(&name).is_some();
        if is_forward_decl {
            if self.symbols.lookup_local(&name).unwrap().defined {
                return Err(self.semantic_error("procedure already defined"));
            }
        } else {
            self.symbols.add(&name, SymbolKind::Procedure, Type::Void);
            let new_label = self.emitter.new_label();
            self.symbols.lookup_mut(&name).expect("just added").label = new_label;
        }

        if self.at(&TokenKind::LParen) {
            let params = self.parse_parameters()?;
            self.symbols.lookup_mut(&name).expect("declared above").params = params;
        }

        self.expect(TokenKind::Semicolon)?;

        if self.match_tok(&TokenKind::Forward)? {
            self.expect(TokenKind::Semicolon)?;
            return Ok(());
        }

        let label = self.symbols.lookup(&name).expect("declared above").label;
        let params = self.symbols.lookup(&name).expect("declared above").params.clone();

        self.emitter.raw(format_args!(""))?;
        self.emitter.raw(format_args!("// Procedure {name}"))?;
        self.emitter.label(label)?;

        self.symbols.enter_scope();
        self.symbols.reserve_static_link_slot();

        for (pname, pty) in &params {
            self.symbols.add(pname, SymbolKind::Param, pty.clone());
        }

        while self.at(&TokenKind::Const) || self.at(&TokenKind::Var) {
            if self.at(&TokenKind::Const) {
                self.parse_const_declarations()?;
            } else {
                self.parse_var_declarations()?;
            }
        }

        let body_label = self.maybe_jump_over_nested()?;
        self.parse_nested_routines()?;
        if let Some(body_label) = body_label {
            self.emitter.label(body_label)?;
        }

        let local_size = self.symbols.local_size();
        self.emitter.prologue_proc(local_size)?;

        for (idx, (pname, _)) in params.iter().enumerate() {
            if idx < 8 {
                if idx != 0 {
                    self.emitter.instr(format_args!("mov x0, x{idx}"))?;
                }
                let offset = self.symbols.lookup(pname).expect("just added").offset;
                self.emitter.store_fp(offset)?;
            }
        }

        self.expect(TokenKind::Begin)?;
        while !self.at(&TokenKind::End) && !self.at(&TokenKind::Eof) {
            self.parse_statement()?;
            if !self.at(&TokenKind::End) {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::End)?;

        self.emitter.epilogue(local_size)?;

        self.symbols.leave_scope();
        self.symbols.lookup_mut(&name).expect("still in scope").defined = true;

        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    pub(crate) fn parse_function_declaration(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Function)?;
        let name = self
            .ident_name()
            .ok_or_else(|| self.syntax_error("expected function name"))?;
        self.bump()?;

        let is_forward_decl = self.symbols.lookup_local(&name).is_some();
        if is_forward_decl {
            if self.symbols.lookup_local(&name).unwrap().defined {
                return Err(self.semantic_error("function already defined"));
            }
        } else {
            self.symbols.add(&name, SymbolKind::Function, Type::Void);
            let new_label = self.emitter.new_label();
            self.symbols.lookup_mut(&name).expect("just added").label = new_label;
        }

        if self.at(&TokenKind::LParen) {
            let params = self.parse_parameters()?;
            self.symbols.lookup_mut(&name).expect("declared above").params = params;
        }

        self.expect(TokenKind::Colon)?;
        let return_type = self.parse_type()?;
        self.symbols.lookup_mut(&name).expect("declared above").ty = return_type.clone();

        self.expect(TokenKind::Semicolon)?;

        if self.match_tok(&TokenKind::Forward)? {
            self.expect(TokenKind::Semicolon)?;
            return Ok(());
        }

        let label = self.symbols.lookup(&name).expect("declared above").label;
        let params = self.symbols.lookup(&name).expect("declared above").params.clone();

        self.emitter.raw(format_args!(""))?;
        self.emitter.raw(format_args!("// Function {name}"))?;
        self.emitter.label(label)?;

        self.symbols.enter_scope();
        self.symbols.reserve_static_link_slot();

        self.symbols.add(&name, SymbolKind::Var, return_type);

        for (pname, pty) in &params {
            self.symbols.add(pname, SymbolKind::Param, pty.clone());
        }

        while self.at(&TokenKind::Const) || self.at(&TokenKind::Var) {
            if self.at(&TokenKind::Const) {
                self.parse_const_declarations()?;
            } else {
                self.parse_var_declarations()?;
            }
        }

        let body_label = self.maybe_jump_over_nested()?;
        self.parse_nested_routines()?;
        if let Some(body_label) = body_label {
            self.emitter.label(body_label)?;
        }

        let local_size = self.symbols.local_size();
        self.emitter.prologue_proc(local_size)?;

        for (idx, (pname, _)) in params.iter().enumerate() {
            if idx < 8 {
                if idx != 0 {
                    self.emitter.instr(format_args!("mov x0, x{idx}"))?;
                }
                let offset = self.symbols.lookup(pname).expect("just added").offset;
                self.emitter.store_fp(offset)?;
            }
        }

        self.expect(TokenKind::Begin)?;
        while !self.at(&TokenKind::End) && !self.at(&TokenKind::Eof) {
            self.parse_statement()?;
            if !self.at(&TokenKind::End) {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::End)?;

        let result_offset = self.symbols.lookup(&name).expect("result variable").offset;
        self.emitter.load_fp(result_offset)?;

        self.emitter.epilogue(local_size)?;

        self.symbols.leave_scope();
        self.symbols.lookup_mut(&name).expect("still in scope").defined = true;

        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// The outermost `begin ... end` block. Declarations (`const`, `var`,
    /// and nested routines) may interleave freely; the caller emits the
    /// exit syscall after this returns, so the local frame is torn down
    /// here but no `ret` is emitted.
    pub(crate) fn parse_block_main(&mut self) -> Result<(), CompileError> {
        let mut body_label = None;

        loop {
            if self.at(&TokenKind::Const) {
                self.parse_const_declarations()?;
            } else if self.at(&TokenKind::Var) {
                self.parse_var_declarations()?;
            } else if self.at(&TokenKind::Procedure) || self.at(&TokenKind::Function) {
                if body_label.is_none() {
                    body_label = self.maybe_jump_over_nested()?;
                }
                if self.at(&TokenKind::Procedure) {
                    self.parse_procedure_declaration()?;
                } else {
                    self.parse_function_declaration()?;
                }
            } else {
                break;
            }
        }

        if let Some(label) = body_label {
            self.emitter.label(label)?;
        }

        let local_size = self.symbols.local_size();
        self.emitter.prologue(local_size)?;

        self.expect(TokenKind::Begin)?;
        while !self.at(&TokenKind::End) && !self.at(&TokenKind::Eof) {
            self.parse_statement()?;
            if !self.at(&TokenKind::End) {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::End)?;

        if local_size > 0 {
            self.emitter.add_sp(crate::codegen::Emitter::aligned(local_size))?;
        }
        Ok(())
    }
}
