mod expr;
mod stmts;

use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::syntax::ast::*;
use crate::syntax::lexeme::Lexeme;
use crate::types::HostType;

const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "split deeply nested expressions into intermediate `let` bindings",
            );
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    /// Parse `[move] |param[: Type]| body`.
    pub(crate) fn parse_closure(mut self) -> Result<Closure, Vec<Diagnostic>> {
        self.eat(&Lexeme::Move);

        if self.at(&Lexeme::PipePipe) {
            self.error_with_help(
                "kernel closure has no parameters",
                "kernel bodies take exactly one parameter: `|ids: ThreadIds| { ... }`",
            );
            return Err(self.diagnostics);
        }
        if !self.at(&Lexeme::Pipe) {
            self.error_with_help(
                &format!("expected kernel closure, found {}", self.peek().description()),
                "kernel bodies are closures of the form `|ids: ThreadIds| { ... }`",
            );
            return Err(self.diagnostics);
        }
        self.advance();

        let name = self.expect_ident();
        let ty = if self.eat(&Lexeme::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        if self.at(&Lexeme::Comma) {
            self.error_with_help(
                "kernel closure takes more than one parameter",
                "kernel bodies take exactly one parameter: `|ids: ThreadIds| { ... }`",
            );
        }
        while !self.at(&Lexeme::Pipe) && !self.at(&Lexeme::Eof) {
            self.advance();
        }
        self.expect(&Lexeme::Pipe);

        let body = if self.at(&Lexeme::LBrace) {
            self.parse_block()
        } else {
            // Expression-bodied closure: `|ids| out[ids.x] = 1.0`
            let stmt = self.parse_simple_stmt(true);
            let span = stmt.span;
            Spanned::new(Block { stmts: vec![stmt] }, span)
        };

        if !self.at(&Lexeme::Eof) {
            self.error_at_current(&format!(
                "unexpected {} after kernel body",
                self.peek().description()
            ));
        }

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(Closure {
            param: Param { name, ty },
            body,
        })
    }

    /// `path::Name` or `path::Name<Arg, ...>`.
    fn parse_type(&mut self) -> Spanned<HostType> {
        let start = self.current_span();
        let mut segments = vec![self.expect_ident().node];
        while self.eat(&Lexeme::ColonColon) {
            segments.push(self.expect_ident().node);
        }
        let mut args = Vec::new();
        if self.eat(&Lexeme::Lt) {
            loop {
                args.push(self.parse_type().node);
                if !self.eat(&Lexeme::Comma) {
                    break;
                }
            }
            self.expect_generic_close();
        }
        let span = start.merge(self.prev_span());
        Spanned::new(HostType::generic(&segments.join("::"), args), span)
    }

    /// Close a generic argument list, splitting `>>` into two `>`.
    fn expect_generic_close(&mut self) {
        match self.peek() {
            Lexeme::Gt => {
                self.advance();
            }
            Lexeme::Shr => {
                let span = self.current_span();
                self.tokens[self.pos] = Spanned::new(Lexeme::Gt, Span::new(span.start + 1, span.end));
            }
            _ => {
                self.expect(&Lexeme::Gt);
            }
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}

/// Returns (left binding power, right binding power) for a binary operator.
/// Higher binding power = higher precedence. Mirrors Rust's table; the
/// rewriter re-parenthesizes where C precedence differs.
fn op_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Or => (2, 3),
        BinOp::And => (4, 5),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (6, 7),
        BinOp::BitOr => (8, 9),
        BinOp::BitXor => (10, 11),
        BinOp::BitAnd => (12, 13),
        BinOp::Shl | BinOp::Shr => (14, 15),
        BinOp::Add | BinOp::Sub => (16, 17),
        BinOp::Mul | BinOp::Div | BinOp::Rem => (18, 19),
    }
}

/// Left binding power of the postfix `as` cast.
const CAST_BP: u8 = 20;
