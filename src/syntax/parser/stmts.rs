use crate::span::Spanned;
use crate::syntax::ast::*;
use crate::syntax::lexeme::Lexeme;

use super::Parser;

impl Parser {
    pub(super) fn parse_block(&mut self) -> Spanned<Block> {
        if !self.enter_nesting() {
            let span = self.current_span();
            // The nesting depth error is already recorded; skip to EOF.
            while !self.at(&Lexeme::Eof) {
                self.advance();
            }
            return Spanned::new(Block { stmts: Vec::new() }, span);
        }

        let start = self.current_span();
        self.expect(&Lexeme::LBrace);

        let mut stmts = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            if self.eat(&Lexeme::Semicolon) {
                continue;
            }
            stmts.push(self.parse_stmt());
        }

        let end = self.current_span();
        self.expect(&Lexeme::RBrace);
        self.exit_nesting();
        Spanned::new(Block { stmts }, start.merge(end))
    }

    fn parse_stmt(&mut self) -> Spanned<Stmt> {
        match self.peek() {
            Lexeme::Let => self.parse_let_stmt(),
            Lexeme::If => self.parse_if_stmt(),
            Lexeme::For => self.parse_for_stmt(),
            Lexeme::While => self.parse_while_stmt(),
            Lexeme::Loop => {
                let start = self.current_span();
                self.advance();
                let body = self.parse_block();
                let span = start.merge(body.span);
                Spanned::new(Stmt::Loop { body }, span)
            }
            Lexeme::Break => self.parse_jump(Stmt::Break),
            Lexeme::Continue => self.parse_jump(Stmt::Continue),
            Lexeme::Return => self.parse_jump(Stmt::Return),
            Lexeme::LBrace => {
                let block = self.parse_block();
                let span = block.span;
                Spanned::new(Stmt::Block(block), span)
            }
            _ => self.parse_simple_stmt(false),
        }
    }

    /// Expression statement or assignment. The trailing `;` may be omitted
    /// before a closing brace, or at the end of an expression-bodied closure.
    pub(super) fn parse_simple_stmt(&mut self, closure_body: bool) -> Spanned<Stmt> {
        let expr = self.parse_expr();

        let op = match self.peek() {
            Lexeme::Eq => Some(None),
            Lexeme::PlusEq => Some(Some(BinOp::Add)),
            Lexeme::MinusEq => Some(Some(BinOp::Sub)),
            Lexeme::StarEq => Some(Some(BinOp::Mul)),
            Lexeme::SlashEq => Some(Some(BinOp::Div)),
            Lexeme::PercentEq => Some(Some(BinOp::Rem)),
            Lexeme::AmpEq => Some(Some(BinOp::BitAnd)),
            Lexeme::PipeEq => Some(Some(BinOp::BitOr)),
            Lexeme::CaretEq => Some(Some(BinOp::BitXor)),
            Lexeme::ShlEq => Some(Some(BinOp::Shl)),
            Lexeme::ShrEq => Some(Some(BinOp::Shr)),
            _ => None,
        };

        let stmt = if let Some(op) = op {
            self.advance();
            let value = self.parse_expr();
            let span = expr.span.merge(value.span);
            Spanned::new(
                Stmt::Assign {
                    op,
                    place: expr,
                    value,
                },
                span,
            )
        } else {
            let span = expr.span;
            Spanned::new(Stmt::Expr(expr), span)
        };

        let at_end = self.at(&Lexeme::RBrace) || (closure_body && self.at(&Lexeme::Eof));
        if !at_end && !self.ends_with_block(&stmt.node) {
            self.expect(&Lexeme::Semicolon);
        }
        stmt
    }

    /// An if-expression used as a statement needs no `;`.
    fn ends_with_block(&self, stmt: &Stmt) -> bool {
        matches!(stmt, Stmt::Expr(e) if matches!(e.node, Expr::If { .. }))
    }

    fn parse_let_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::Let);
        let mutable = self.eat(&Lexeme::Mut);
        let name = self.expect_ident();

        let ty = if self.eat(&Lexeme::Colon) {
            Some(self.parse_type())
        } else {
            None
        };

        let init = if self.eat(&Lexeme::Eq) {
            Some(self.parse_expr())
        } else {
            None
        };

        if !self.at(&Lexeme::RBrace) {
            self.expect(&Lexeme::Semicolon);
        }

        let span = start.merge(self.prev_span());
        Spanned::new(
            Stmt::Let {
                mutable,
                name,
                ty,
                init,
            },
            span,
        )
    }

    fn parse_if_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::If);
        let cond = self.parse_expr();
        let then_block = self.parse_block();

        let else_block = if self.eat(&Lexeme::Else) {
            if self.at(&Lexeme::If) {
                // else if: wrap in a block containing a single if statement
                let inner = self.parse_if_stmt();
                let span = inner.span;
                Some(Spanned::new(Block { stmts: vec![inner] }, span))
            } else {
                Some(self.parse_block())
            }
        } else {
            None
        };

        let span = start.merge(self.prev_span());
        Spanned::new(
            Stmt::If {
                cond,
                then_block,
                else_block,
            },
            span,
        )
    }

    /// `for var in start..end { ... }` and `for var in start..=end { ... }`.
    fn parse_for_stmt(&mut self) -> Spanned<Stmt> {
        let start_span = self.current_span();
        self.expect(&Lexeme::For);
        let var = self.expect_ident();
        self.expect(&Lexeme::In);
        let start = self.parse_expr();

        let inclusive = match self.peek() {
            Lexeme::DotDot => false,
            Lexeme::DotDotEq => true,
            _ => {
                self.error_with_help(
                    &format!("expected range, found {}", self.peek().description()),
                    "kernel loops iterate integer ranges: `for i in 0..n { ... }`",
                );
                false
            }
        };
        self.advance();
        let end = self.parse_expr();
        let body = self.parse_block();

        let span = start_span.merge(body.span);
        Spanned::new(
            Stmt::For {
                var,
                start,
                end,
                inclusive,
                body,
            },
            span,
        )
    }

    fn parse_while_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::While);
        let cond = self.parse_expr();
        let body = self.parse_block();
        let span = start.merge(body.span);
        Spanned::new(Stmt::While { cond, body }, span)
    }

    fn parse_jump(&mut self, stmt: Stmt) -> Spanned<Stmt> {
        let start = self.current_span();
        self.advance();
        if !self.at(&Lexeme::Semicolon) && !self.at(&Lexeme::RBrace) {
            let what = match stmt {
                Stmt::Return => "kernel bodies cannot return a value",
                _ => "loop labels and break values are not supported in kernels",
            };
            self.error_at_current(what);
            // Recover at the next statement boundary.
            while !self.at(&Lexeme::Semicolon)
                && !self.at(&Lexeme::RBrace)
                && !self.at(&Lexeme::Eof)
            {
                self.advance();
            }
        }
        self.eat(&Lexeme::Semicolon);
        Spanned::new(stmt, start)
    }
}
