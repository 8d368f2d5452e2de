//! Syntax rewriter: recovered kernel body to HLSL statement text.
//!
//! One depth-first walk over the tree. Host placeholder members are
//! resolved through [`placeholder::PLACEHOLDERS`], literals lose their
//! host-only suffixes, identifiers are de-collided against HLSL and
//! against each other, and every static the body reads is recorded as an
//! extra capture under a plain identifier.

pub mod names;
pub mod placeholder;

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::extract::model::{element_position, matrix_index_position};
use crate::extract::{LocalId, RecoveredBody, Symbol, SymbolModel};
use crate::kernel::Capture;
use crate::span::{Span, Spanned};
use crate::syntax::ast::*;
use crate::types::{HostType, ScalarKind, Ty, TypeTable};

use names::{capture_names, NameAllocator};
use placeholder::{Member, Placeholder, Receiver};

/// A static read by the body, in first-reference order.
#[derive(Clone, Copy, Debug)]
pub struct StaticCapture {
    /// Position among the kernel's visible statics.
    pub index: usize,
    pub path: &'static str,
    pub ty: &'static str,
    pub read: fn() -> Capture<'static>,
}

#[derive(Clone, Debug)]
pub struct RewrittenBody {
    /// Braced HLSL statement block, no trailing whitespace.
    pub text: String,
    /// HLSL name of the thread-index parameter.
    pub thread_ids: String,
    /// Shader identifiers of instance captures, in catalog order.
    pub capture_names: Vec<String>,
    pub statics: Vec<StaticCapture>,
    /// Shader identifiers of `statics`, parallel to it.
    pub static_names: Vec<String>,
}

// C operator precedence, loosest first.
const PREC_OR: u8 = 2;
const PREC_AND: u8 = 3;
const PREC_BITOR: u8 = 4;
const PREC_XOR: u8 = 5;
const PREC_BITAND: u8 = 6;
const PREC_EQ: u8 = 7;
const PREC_REL: u8 = 8;
const PREC_SHIFT: u8 = 9;
const PREC_ADD: u8 = 10;
const PREC_MUL: u8 = 11;
const PREC_UNARY: u8 = 12;
const PREC_POSTFIX: u8 = 13;
const PREC_PRIMARY: u8 = 14;

fn binop_prec(op: BinOp) -> u8 {
    match op {
        BinOp::Or => PREC_OR,
        BinOp::And => PREC_AND,
        BinOp::BitOr => PREC_BITOR,
        BinOp::BitXor => PREC_XOR,
        BinOp::BitAnd => PREC_BITAND,
        BinOp::Eq | BinOp::Ne => PREC_EQ,
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => PREC_REL,
        BinOp::Shl | BinOp::Shr => PREC_SHIFT,
        BinOp::Add | BinOp::Sub => PREC_ADD,
        BinOp::Mul | BinOp::Div | BinOp::Rem => PREC_MUL,
    }
}

fn wrap(text: String, prec: u8, min: u8) -> String {
    if prec < min {
        format!("({})", text)
    } else {
        text
    }
}

/// HLSL spelling of a numeric or boolean literal.
pub fn normalize_literal(lit: &Literal) -> String {
    match lit {
        Literal::Bool(b) => b.to_string(),
        Literal::Int { text, suffix } => {
            let digits = text.replace('_', "");
            let digits = match digits.get(..2) {
                Some("0b") => radix_to_decimal(&digits, 2),
                Some("0o") => radix_to_decimal(&digits, 8),
                _ => digits,
            };
            match suffix.as_deref() {
                Some("u" | "U" | "u32" | "usize") => format!("{}u", digits),
                _ => digits,
            }
        }
        Literal::Float { text, suffix } => {
            let digits = text.replace('_', "");
            let is_fractional = digits.contains(&['.', 'e', 'E'][..]);
            if suffix.is_some() && !is_fractional {
                format!("{}.0", digits)
            } else {
                digits
            }
        }
    }
}

/// HLSL has no binary or `0o` octal literals.
fn radix_to_decimal(digits: &str, radix: u32) -> String {
    u64::from_str_radix(&digits[2..], radix)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| digits.to_string())
}

/// Rewrite a recovered body to HLSL.
pub fn rewrite(body: &RecoveredBody, table: &dyn TypeTable) -> Result<RewrittenBody, Vec<Diagnostic>> {
    let (names, capture_names) = capture_names(body.fields.iter().map(|f| f.name));
    let mut rewriter = Rewriter::new(body, table, names, capture_names);
    rewriter.block(&body.closure.body);

    if !rewriter.diagnostics.is_empty() {
        return Err(rewriter.diagnostics);
    }
    let text = rewriter.out.trim_end().to_string();
    let thread_ids = rewriter.local_names[LocalId::PARAM.0 as usize].clone();
    Ok(RewrittenBody {
        text,
        thread_ids,
        capture_names: rewriter.capture_names,
        statics: rewriter.statics,
        static_names: rewriter.static_names,
    })
}

struct Rewriter<'a> {
    body: &'a RecoveredBody,
    model: &'a SymbolModel,
    table: &'a dyn TypeTable,
    names: NameAllocator,
    capture_names: Vec<String>,
    local_names: Vec<String>,
    /// Static catalog index to position in `statics`.
    static_slots: HashMap<usize, usize>,
    statics: Vec<StaticCapture>,
    static_names: Vec<String>,
    out: String,
    indent: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Rewriter<'a> {
    fn new(
        body: &'a RecoveredBody,
        table: &'a dyn TypeTable,
        mut names: NameAllocator,
        capture_names: Vec<String>,
    ) -> Self {
        let local_names = body
            .model
            .locals()
            .iter()
            .map(|l| names.allocate(&l.name))
            .collect();
        Self {
            body,
            model: &body.model,
            table,
            names,
            capture_names,
            local_names,
            static_slots: HashMap::new(),
            statics: Vec::new(),
            static_names: Vec::new(),
            out: String::new(),
            indent: 0,
            diagnostics: Vec::new(),
        }
    }

    // --- Names and types ---

    fn local_name(&self, id: LocalId) -> &str {
        &self.local_names[id.0 as usize]
    }

    fn declared_local(&self, name: &Spanned<String>) -> LocalId {
        match self.model.symbol(name.span) {
            Some(Symbol::Local(id)) => id,
            other => unreachable!("declaration `{}` bound to {:?}", name.node, other),
        }
    }

    fn static_name(&mut self, index: usize) -> String {
        if let Some(&slot) = self.static_slots.get(&index) {
            return self.static_names[slot].clone();
        }
        let field = self.body.statics[index];
        let name = self.names.allocate(field.name());
        self.static_slots.insert(index, self.statics.len());
        self.statics.push(StaticCapture {
            index,
            path: field.path,
            ty: field.ty,
            read: field.read,
        });
        self.static_names.push(name.clone());
        name
    }

    fn symbol_name(&mut self, span: Span) -> String {
        match self.model.symbol(span) {
            Some(Symbol::Local(id)) => self.local_name(id).to_string(),
            Some(Symbol::Capture(i)) => self.capture_names[i].clone(),
            Some(Symbol::Static(i)) => self.static_name(i),
            None => unreachable!("unresolved name at {:?}", span),
        }
    }

    fn host_type_name(&mut self, host: &HostType, span: Span) -> String {
        match self.table.mapped_name(host) {
            Some(name) => name,
            None => {
                self.diagnostics.push(Diagnostic::error(
                    format!("type `{}` has no HLSL equivalent", host),
                    span,
                ));
                host.base().to_string()
            }
        }
    }

    fn type_name(&mut self, ty: &Ty, span: Span) -> String {
        self.host_type_name(&ty.to_host(), span)
    }

    fn ty(&self, span: Span) -> &'a Ty {
        match self.model.ty(span) {
            Some(ty) => ty,
            None => unreachable!("untyped expression at {:?}", span),
        }
    }

    fn placeholder(&self, receiver: Receiver, member: Member) -> &'static Placeholder {
        match placeholder::resolve(receiver, member) {
            Some(p) => p,
            None => panic!("no placeholder rule for {:?} on {:?}", member, receiver),
        }
    }

    fn receiver_of(&self, span: Span) -> Receiver {
        let ty = self.ty(span);
        match Receiver::of(ty) {
            Some(r) => r,
            None => panic!("`{}` is not a placeholder receiver", ty),
        }
    }

    // --- Statements ---

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, block: &Spanned<Block>) {
        self.line("{");
        self.indent += 1;
        for stmt in &block.node.stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Let { name, init, .. } => {
                let id = self.declared_local(name);
                let ty = self.model.local(id).ty.clone();
                let ty_name = self.type_name(&ty, name.span);
                let local = self.local_name(id).to_string();
                match init {
                    Some(init) => {
                        let (value, _) = self.expr(init);
                        self.line(&format!("{} {} = {};", ty_name, local, value));
                    }
                    None => self.line(&format!("{} {};", ty_name, local)),
                }
            }
            Stmt::Assign { op, place, value } => {
                if let Some(op) = op {
                    self.check_binop(*op, place.span, value.span);
                }
                let (target, _) = self.expr(place);
                let (value, _) = self.expr(value);
                let assign = match op {
                    Some(op) => format!("{}=", op.as_str()),
                    None => "=".to_string(),
                };
                self.line(&format!("{} {} {};", target, assign, value));
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => self.if_chain("if", cond, then_block, else_block.as_ref()),
            Stmt::For {
                var,
                start,
                end,
                inclusive,
                body,
            } => {
                let id = self.declared_local(var);
                let ty = self.model.local(id).ty.clone();
                let ty_name = self.type_name(&ty, var.span);
                let counter = self.local_name(id).to_string();
                let (lo, _) = self.expr(start);
                let (hi, hi_prec) = self.expr(end);
                // The range end is evaluated once; HLSL re-tests the condition
                // each iteration, so an end the body can change is hoisted.
                let hi = if self.is_loop_invariant(end) {
                    wrap(hi, hi_prec, PREC_REL + 1)
                } else {
                    let bound = self.names.allocate(&format!("{}_end", counter));
                    self.line(&format!("{} {} = {};", ty_name, bound, hi));
                    bound
                };
                let cmp = if *inclusive { "<=" } else { "<" };
                self.line(&format!(
                    "for ({} {} = {}; {} {} {}; {}++)",
                    ty_name, counter, lo, counter, cmp, hi, counter
                ));
                self.block(body);
            }
            Stmt::While { cond, body } => {
                let (cond, _) = self.expr(cond);
                self.line(&format!("while ({})", cond));
                self.block(body);
            }
            Stmt::Loop { body } => {
                self.line("while (true)");
                self.block(body);
            }
            Stmt::Break => self.line("break;"),
            Stmt::Continue => self.line("continue;"),
            Stmt::Return => self.line("return;"),
            Stmt::Expr(expr) => {
                let (text, _) = self.expr(expr);
                self.line(&format!("{};", text));
            }
            Stmt::Block(block) => self.block(block),
        }
    }

    /// Whether `e` reads only literals, captures, statics, immutable locals
    /// and pure calls on them.
    fn is_loop_invariant(&self, e: &Spanned<Expr>) -> bool {
        match &e.node {
            Expr::Literal(_) => true,
            Expr::Var(_) | Expr::Path(_) => match self.model.symbol(e.span) {
                Some(Symbol::Local(id)) => !self.model.local(id).mutable,
                Some(Symbol::Capture(_) | Symbol::Static(_)) => true,
                None => false,
            },
            Expr::Paren(inner)
            | Expr::Unary { expr: inner, .. }
            | Expr::Cast { expr: inner, .. }
            | Expr::Field { expr: inner, .. } => self.is_loop_invariant(inner),
            Expr::Binary { lhs, rhs, .. } => {
                self.is_loop_invariant(lhs) && self.is_loop_invariant(rhs)
            }
            Expr::MethodCall { receiver, args, .. } => {
                self.is_loop_invariant(receiver)
                    && args.iter().all(|a| self.is_loop_invariant(a))
            }
            Expr::Call { args, .. } | Expr::Tuple(args) => {
                args.iter().all(|a| self.is_loop_invariant(a))
            }
            // Buffer elements can be written by the loop body.
            Expr::Index { .. } | Expr::If { .. } => false,
        }
    }

    fn if_chain(
        &mut self,
        keyword: &str,
        cond: &Spanned<Expr>,
        then_block: &Spanned<Block>,
        else_block: Option<&Spanned<Block>>,
    ) {
        let (cond, _) = self.expr(cond);
        self.line(&format!("{} ({})", keyword, cond));
        self.block(then_block);
        let Some(else_block) = else_block else {
            return;
        };
        match else_block.node.stmts.as_slice() {
            [Spanned {
                node:
                    Stmt::If {
                        cond,
                        then_block,
                        else_block,
                    },
                ..
            }] => self.if_chain("else if", cond, then_block, else_block.as_ref()),
            _ => {
                self.line("else");
                self.block(else_block);
            }
        }
    }

    /// Operators on vectors and matrices must have a placeholder rule.
    fn check_binop(&self, op: BinOp, lhs: Span, rhs: Span) {
        let aggregate = |ty: &Ty| match ty {
            Ty::Matrix(..) => Some(Receiver::Matrix),
            Ty::Vector(..) => Some(Receiver::Vector),
            _ => None,
        };
        let receiver = match (aggregate(self.ty(lhs)), aggregate(self.ty(rhs))) {
            (Some(Receiver::Matrix), _) | (_, Some(Receiver::Matrix)) => Receiver::Matrix,
            (Some(r), _) | (_, Some(r)) => r,
            (None, None) => return,
        };
        match Member::for_binop(op) {
            Some(member) => {
                self.placeholder(receiver, member);
            }
            None => panic!("operator `{}` has no aggregate form", op.as_str()),
        }
    }

    // --- Expressions ---

    /// Emit an expression; returns its text and C precedence.
    fn expr(&mut self, e: &Spanned<Expr>) -> (String, u8) {
        match &e.node {
            Expr::Literal(lit) => (normalize_literal(lit), PREC_PRIMARY),
            Expr::Var(_) | Expr::Path(_) => (self.symbol_name(e.span), PREC_PRIMARY),
            Expr::Paren(inner) => {
                let (text, _) = self.expr(inner);
                (format!("({})", text), PREC_PRIMARY)
            }
            Expr::Unary { op, expr } => self.unary(*op, expr),
            Expr::Binary { op, lhs, rhs } => {
                self.check_binop(*op, lhs.span, rhs.span);
                let prec = binop_prec(*op);
                let (l, lp) = self.expr(lhs);
                let (r, rp) = self.expr(rhs);
                let l = wrap(l, lp, prec);
                let r = wrap(r, rp, prec + 1);
                (format!("{} {} {}", l, op.as_str(), r), prec)
            }
            Expr::Cast { expr, ty } => {
                let name = self.host_type_name(&ty.node, ty.span);
                let (value, _) = self.expr(expr);
                (format!("({})({})", name, value), PREC_UNARY)
            }
            Expr::Field { expr, field } => {
                let receiver = self.receiver_of(expr.span);
                let rule = self.placeholder(receiver, Member::Component);
                let (base, bp) = self.expr(expr);
                let base = wrap(base, bp, PREC_POSTFIX);
                (placeholder::render(rule.template, &field.node, &[base]), PREC_POSTFIX)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call(receiver, method, args),
            Expr::Call { path, args } => self.call(e.span, path, args),
            Expr::Index { expr, index } => self.index(expr, index),
            Expr::Tuple(_) => unreachable!("tuple outside a matrix indexer"),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let (c, _) = self.expr(cond);
                let (a, _) = self.expr(then_expr);
                let (b, _) = self.expr(else_expr);
                (format!("({} ? {} : {})", c, a, b), PREC_PRIMARY)
            }
        }
    }

    fn unary(&mut self, op: UnOp, operand: &Spanned<Expr>) -> (String, u8) {
        let ty = self.ty(operand.span);
        let (text, prec) = self.expr(operand);
        let mut text = wrap(text, prec, PREC_UNARY);
        if op == UnOp::Neg && text.starts_with('-') {
            text = format!("({})", text);
        }

        let rendered = match (op, ty) {
            (UnOp::Neg, Ty::Vector(..) | Ty::Matrix(..)) => {
                let rule = self.placeholder(self.receiver_of(operand.span), Member::Neg);
                placeholder::render(rule.template, "", &[text])
            }
            (UnOp::Not, Ty::Vector(kind, _)) => {
                let member = if *kind == ScalarKind::Bool {
                    Member::Not
                } else {
                    Member::Complement
                };
                let rule = self.placeholder(Receiver::Vector, member);
                placeholder::render(rule.template, "", &[text])
            }
            (UnOp::Neg, _) => format!("-{}", text),
            (UnOp::Not, Ty::Scalar(ScalarKind::Bool)) => format!("!{}", text),
            (UnOp::Not, _) => format!("~{}", text),
        };
        (rendered, PREC_UNARY)
    }

    fn args(&mut self, args: &[Spanned<Expr>]) -> Vec<String> {
        args.iter().map(|a| self.expr(a).0).collect()
    }

    fn method_call(
        &mut self,
        receiver: &Spanned<Expr>,
        method: &Spanned<String>,
        args: &[Spanned<Expr>],
    ) -> (String, u8) {
        let kind = self.receiver_of(receiver.span);
        let name = method.node.as_str();

        if kind == Receiver::Scalar {
            let hlsl = match placeholder::scalar_method(name) {
                Some(m) => m.hlsl,
                None => panic!("no scalar method `{}`", name),
            };
            let rule = self.placeholder(kind, Member::Method);
            let mut operands = vec![self.expr(receiver).0];
            operands.extend(self.args(args));
            return (placeholder::render(rule.template, hlsl, &operands), PREC_POSTFIX);
        }

        let (member, text) = match (kind, element_position(name)) {
            (Receiver::Matrix, Some((r, c))) => (Member::Element, format!("_m{}{}", r - 1, c - 1)),
            _ => (Member::Swizzle, name.to_string()),
        };
        let rule = self.placeholder(kind, member);
        let (base, bp) = self.expr(receiver);
        let base = wrap(base, bp, PREC_POSTFIX);
        (placeholder::render(rule.template, &text, &[base]), PREC_POSTFIX)
    }

    fn call(&mut self, span: Span, path: &Spanned<Path>, args: &[Spanned<Expr>]) -> (String, u8) {
        let operands = self.args(args);
        match (path.node.owner(), path.node.last()) {
            (Some(placeholder::INTRINSIC_OWNER), name) => {
                let rule = self.placeholder(Receiver::Hlsl, Member::Intrinsic);
                (placeholder::render(rule.template, name, &operands), PREC_POSTFIX)
            }
            (_, "splat") => {
                let ty = self.ty(span);
                let name = self.type_name(ty, path.span);
                let rule = self.placeholder(Receiver::Constructor, Member::Splat);
                (placeholder::render(rule.template, &name, &operands), PREC_UNARY)
            }
            (_, "new") => {
                let ty = self.ty(span);
                let name = self.type_name(ty, path.span);
                let rule = self.placeholder(Receiver::Constructor, Member::New);
                (placeholder::render(rule.template, &name, &operands), PREC_POSTFIX)
            }
            _ => panic!("no placeholder rule for call `{}`", path.node.as_dotted()),
        }
    }

    fn index(&mut self, base: &Spanned<Expr>, index: &Spanned<Expr>) -> (String, u8) {
        let kind = self.receiver_of(base.span);
        let (text, bp) = self.expr(base);
        let text = wrap(text, bp, PREC_POSTFIX);

        if let (Receiver::Matrix, Expr::Tuple(items)) = (kind, &index.node) {
            let selectors: String = items
                .iter()
                .map(|item| match &item.node {
                    Expr::Path(path) => match matrix_index_position(path) {
                        Some((r, c)) => format!("_m{}{}", r - 1, c - 1),
                        None => unreachable!("unchecked matrix selector"),
                    },
                    _ => unreachable!("unchecked matrix selector"),
                })
                .collect();
            let rule = self.placeholder(kind, Member::MatrixSwizzle);
            return (placeholder::render(rule.template, &selectors, &[text]), PREC_POSTFIX);
        }

        let rule = self.placeholder(kind, Member::Index);
        let (idx, _) = self.expr(index);
        (placeholder::render(rule.template, "", &[text, idx]), PREC_POSTFIX)
    }
}
