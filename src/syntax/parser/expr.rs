use crate::span::Spanned;
use crate::syntax::ast::*;
use crate::syntax::lexeme::Lexeme;

use super::{op_binding_power, Parser, CAST_BP};

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Spanned<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Spanned<Expr> {
        if !self.enter_nesting() {
            let span = self.current_span();
            while !self.at(&Lexeme::Eof) {
                self.advance();
            }
            return Spanned::new(Expr::Var("_error_".to_string()), span);
        }

        let mut lhs = self.parse_prefix();

        loop {
            if self.at(&Lexeme::As) {
                if CAST_BP < min_bp {
                    break;
                }
                self.advance();
                let ty = self.parse_type();
                let span = lhs.span.merge(ty.span);
                lhs = Spanned::new(
                    Expr::Cast {
                        expr: Box::new(lhs),
                        ty,
                    },
                    span,
                );
                continue;
            }

            let op = match self.peek() {
                Lexeme::PipePipe => BinOp::Or,
                Lexeme::AmpAmp => BinOp::And,
                Lexeme::EqEq => BinOp::Eq,
                Lexeme::BangEq => BinOp::Ne,
                Lexeme::Lt => BinOp::Lt,
                Lexeme::Le => BinOp::Le,
                Lexeme::Gt => BinOp::Gt,
                Lexeme::Ge => BinOp::Ge,
                Lexeme::Pipe => BinOp::BitOr,
                Lexeme::Caret => BinOp::BitXor,
                Lexeme::Amp => BinOp::BitAnd,
                Lexeme::Shl => BinOp::Shl,
                Lexeme::Shr => BinOp::Shr,
                Lexeme::Plus => BinOp::Add,
                Lexeme::Minus => BinOp::Sub,
                Lexeme::Star => BinOp::Mul,
                Lexeme::Slash => BinOp::Div,
                Lexeme::Percent => BinOp::Rem,
                _ => break,
            };

            let (l_bp, r_bp) = op_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            self.advance(); // consume operator
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        self.exit_nesting();
        lhs
    }

    /// Unary operators bind tighter than `as` and every binary operator.
    fn parse_prefix(&mut self) -> Spanned<Expr> {
        let op = match self.peek() {
            Lexeme::Minus => UnOp::Neg,
            Lexeme::Bang => UnOp::Not,
            _ => {
                let primary = self.parse_primary();
                return self.parse_postfix(primary);
            }
        };
        let start = self.current_span();
        self.advance();
        let operand = self.parse_prefix();
        let span = start.merge(operand.span);
        Spanned::new(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        )
    }

    /// Parse postfix operations: .field, .method(..), [index]
    fn parse_postfix(&mut self, mut expr: Spanned<Expr>) -> Spanned<Expr> {
        loop {
            if self.eat(&Lexeme::Dot) {
                let member = match self.peek().clone() {
                    Lexeme::Ident(name) => {
                        let span = self.current_span();
                        self.advance();
                        Spanned::new(name, span)
                    }
                    Lexeme::Integer { text, .. } => {
                        self.error_with_help(
                            "tuple fields are not supported in kernels",
                            "bind the components with separate `let` statements",
                        );
                        let span = self.current_span();
                        self.advance();
                        Spanned::new(text, span)
                    }
                    _ => self.expect_ident(),
                };
                if self.at(&Lexeme::LParen) {
                    let args = self.parse_call_args();
                    let span = expr.span.merge(self.prev_span());
                    expr = Spanned::new(
                        Expr::MethodCall {
                            receiver: Box::new(expr),
                            method: member,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.merge(member.span);
                    expr = Spanned::new(
                        Expr::Field {
                            expr: Box::new(expr),
                            field: member,
                        },
                        span,
                    );
                }
            } else if self.eat(&Lexeme::LBracket) {
                let index = self.parse_expr();
                self.expect(&Lexeme::RBracket);
                let span = expr.span.merge(self.prev_span());
                expr = Spanned::new(
                    Expr::Index {
                        expr: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.at(&Lexeme::LParen) {
                self.error_with_help(
                    "only paths can be called in kernels",
                    "call intrinsics through `Hlsl::name(..)` and constructors through `Type::new(..)`",
                );
                self.parse_call_args();
            } else {
                break;
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Spanned<Expr> {
        let start = self.current_span();

        match self.peek().clone() {
            Lexeme::Integer { text, suffix } => {
                self.advance();
                Spanned::new(Expr::Literal(Literal::Int { text, suffix }), start)
            }
            Lexeme::Float { text, suffix } => {
                self.advance();
                Spanned::new(Expr::Literal(Literal::Float { text, suffix }), start)
            }
            Lexeme::True => {
                self.advance();
                Spanned::new(Expr::Literal(Literal::Bool(true)), start)
            }
            Lexeme::False => {
                self.advance();
                Spanned::new(Expr::Literal(Literal::Bool(false)), start)
            }
            Lexeme::Ident(first) => {
                self.advance();
                let mut segments = vec![first];
                while self.at(&Lexeme::ColonColon) {
                    self.advance();
                    segments.push(self.expect_ident().node);
                }
                let path_span = start.merge(self.prev_span());
                if self.at(&Lexeme::LParen) {
                    let args = self.parse_call_args();
                    let span = start.merge(self.prev_span());
                    return Spanned::new(
                        Expr::Call {
                            path: Spanned::new(Path(segments), path_span),
                            args,
                        },
                        span,
                    );
                }
                let node = if segments.len() == 1 {
                    Expr::Var(segments.remove(0))
                } else {
                    Expr::Path(Path(segments))
                };
                Spanned::new(node, path_span)
            }
            Lexeme::LParen => self.parse_paren_or_tuple(),
            Lexeme::If => self.parse_if_expr(),
            _ => {
                self.error_at_current(&format!(
                    "expected expression, found {}",
                    self.peek().description()
                ));
                if !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
                    self.advance();
                }
                Spanned::new(Expr::Var("_error_".to_string()), start)
            }
        }
    }

    /// `(e)` keeps its parentheses; `(a, b)` and `(a,)` are tuples.
    fn parse_paren_or_tuple(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        self.expect(&Lexeme::LParen);
        if self.at(&Lexeme::RParen) {
            self.error_at_current("the unit value `()` is not supported in kernel expressions");
            let end = self.expect(&Lexeme::RParen);
            return Spanned::new(Expr::Tuple(Vec::new()), start.merge(end));
        }

        let first = self.parse_expr();
        if self.at(&Lexeme::RParen) {
            let end = self.expect(&Lexeme::RParen);
            return Spanned::new(Expr::Paren(Box::new(first)), start.merge(end));
        }

        let mut elements = vec![first];
        while self.eat(&Lexeme::Comma) {
            if self.at(&Lexeme::RParen) {
                break;
            }
            elements.push(self.parse_expr());
        }
        let end = self.expect(&Lexeme::RParen);
        Spanned::new(Expr::Tuple(elements), start.merge(end))
    }

    /// `if c { a } else { b }` where each branch holds a single expression.
    fn parse_if_expr(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        self.expect(&Lexeme::If);
        let cond = self.parse_expr();
        let then_expr = self.parse_branch_expr();

        if !self.eat(&Lexeme::Else) {
            self.error_with_help(
                "`if` used as a value needs an `else` branch",
                "add `else { ... }` or turn the `if` into a statement",
            );
            let span = start.merge(then_expr.span);
            return Spanned::new(Expr::Var("_error_".to_string()), span);
        }

        let else_expr = if self.at(&Lexeme::If) {
            self.parse_if_expr()
        } else {
            self.parse_branch_expr()
        };

        let span = start.merge(else_expr.span);
        Spanned::new(
            Expr::If {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        )
    }

    fn parse_branch_expr(&mut self) -> Spanned<Expr> {
        self.expect(&Lexeme::LBrace);
        let expr = self.parse_expr();
        if !self.at(&Lexeme::RBrace) {
            self.error_with_help(
                "`if` branches used as values must be a single expression",
                "compute the branch value with statements before the `if`",
            );
            while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
                self.advance();
            }
        }
        self.expect(&Lexeme::RBrace);
        expr
    }

    fn parse_call_args(&mut self) -> Vec<Spanned<Expr>> {
        self.expect(&Lexeme::LParen);
        let mut args = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            args.push(self.parse_expr());
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RParen);
        args
    }
}
