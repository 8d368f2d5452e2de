//! Name resolution and host type-checking for a recovered kernel body.
//!
//! Resolutions and expression types are keyed by span: every expression
//! node of a body covers a distinct byte range of the captured source.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::kernel::{FieldDecl, StaticField};
use crate::rewrite::placeholder::{self, Member, Receiver, Returns};
use crate::span::{Span, Spanned};
use crate::syntax::ast::*;
use crate::types::{BufferKind, HostType, ScalarKind, Ty};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl LocalId {
    /// The thread-index parameter.
    pub const PARAM: LocalId = LocalId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a name in the body refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Local(LocalId),
    /// Index into the kernel's field catalog.
    Capture(usize),
    /// Index into the kernel's visible statics.
    Static(usize),
}

#[derive(Clone, Debug)]
pub struct LocalInfo {
    pub name: String,
    pub ty: Ty,
    pub mutable: bool,
    pub span: Span,
}

/// Resolved names and types of one kernel body.
#[derive(Clone, Debug, Default)]
pub struct SymbolModel {
    locals: Vec<LocalInfo>,
    bindings: HashMap<Span, Symbol>,
    types: HashMap<Span, Ty>,
}

impl SymbolModel {
    /// Locals in declaration order; the parameter comes first.
    pub fn locals(&self) -> &[LocalInfo] {
        &self.locals
    }

    pub fn local(&self, id: LocalId) -> &LocalInfo {
        &self.locals[id.index()]
    }

    /// Resolution of a name reference or declaration at `span`.
    pub fn symbol(&self, span: Span) -> Option<Symbol> {
        self.bindings.get(&span).copied()
    }

    /// Type of the expression at `span`.
    pub fn ty(&self, span: Span) -> Option<&Ty> {
        self.types.get(&span)
    }
}

/// Literal family of a value whose type is still open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lit {
    Int,
    Float,
}

impl Lit {
    fn accepts(self, kind: ScalarKind) -> bool {
        match self {
            Lit::Int => kind.is_integer(),
            Lit::Float => kind.is_float(),
        }
    }
}

#[derive(Clone, Debug)]
struct Typed {
    ty: Ty,
    /// Set for unsuffixed literals and for locals initialized from one.
    flex: Option<Lit>,
    /// The flexible local this expression names directly, if any.
    local: Option<LocalId>,
}

impl Typed {
    fn of(ty: Ty) -> Self {
        Self {
            ty,
            flex: None,
            local: None,
        }
    }

    fn literal(kind: ScalarKind, lit: Lit) -> Self {
        Self {
            ty: Ty::Scalar(kind),
            flex: Some(lit),
            local: None,
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self.ty, Ty::Scalar(k) if k.is_integer())
    }
}

const BOOL: Ty = Ty::Scalar(ScalarKind::Bool);

/// Bind a parsed kernel closure against its field catalog and statics.
pub(crate) fn bind(
    closure: &Closure,
    fields: &[FieldDecl],
    statics: &[StaticField],
) -> Result<SymbolModel, Vec<Diagnostic>> {
    let mut binder = Binder::new(fields, statics);
    binder.bind_closure(closure);
    if !binder.diagnostics.is_empty() {
        return Err(binder.diagnostics);
    }
    Ok(SymbolModel {
        locals: binder.locals,
        bindings: binder.bindings,
        types: binder.types,
    })
}

struct Binder<'a> {
    fields: &'a [FieldDecl],
    field_types: Vec<Option<Ty>>,
    statics: &'a [StaticField],
    scopes: Vec<Vec<(String, LocalId)>>,
    locals: Vec<LocalInfo>,
    flexible: Vec<Option<Lit>>,
    bindings: HashMap<Span, Symbol>,
    types: HashMap<Span, Ty>,
    loop_depth: u32,
    diagnostics: Vec<Diagnostic>,
}

fn host_ty(text: &str) -> Option<Ty> {
    text.parse::<HostType>()
        .ok()
        .and_then(|h| Ty::from_host(&h))
}

fn component_index(c: char) -> Option<u8> {
    match c {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        'w' => Some(3),
        _ => None,
    }
}

/// `xy`, `zyx`, `wwww`: 2 to 4 components, each within the vector.
fn is_swizzle(name: &str, dim: u8) -> bool {
    (2..=4).contains(&name.len())
        && name
            .chars()
            .all(|c| component_index(c).is_some_and(|i| i < dim))
}

/// `m12` → (1, 2), one-based row and column.
pub(crate) fn element_position(name: &str) -> Option<(u8, u8)> {
    match name.as_bytes() {
        [b'm', r, c] if (b'1'..=b'4').contains(r) && (b'1'..=b'4').contains(c) => {
            Some((r - b'0', c - b'0'))
        }
        _ => None,
    }
}

/// `MatrixIndex::M21` → (2, 1).
pub(crate) fn matrix_index_position(path: &Path) -> Option<(u8, u8)> {
    if path.owner() != Some("MatrixIndex") {
        return None;
    }
    match path.last().as_bytes() {
        [b'M', r, c] if (b'1'..=b'4').contains(r) && (b'1'..=b'4').contains(c) => {
            Some((r - b'0', c - b'0'))
        }
        _ => None,
    }
}

fn vector_or_scalar(kind: ScalarKind, n: u8) -> Ty {
    if n == 1 {
        Ty::Scalar(kind)
    } else {
        Ty::Vector(kind, n)
    }
}

fn components(ty: &Ty) -> Option<u8> {
    match ty {
        Ty::Scalar(_) => Some(1),
        Ty::Vector(_, n) => Some(*n),
        Ty::Matrix(_, r, c) => Some(r * c),
        _ => None,
    }
}

/// Result shape of `mul(a, b)`.
fn product(a: &Ty, b: &Ty) -> Option<Ty> {
    if a.elem() != b.elem() {
        return None;
    }
    match (a, b) {
        (Ty::Scalar(_), other) | (other, Ty::Scalar(_)) => Some(other.clone()),
        (Ty::Vector(k, n), Ty::Vector(_, m)) if n == m => Some(Ty::Scalar(*k)),
        (Ty::Vector(k, n), Ty::Matrix(_, r, c)) if n == r => Some(vector_or_scalar(*k, *c)),
        (Ty::Matrix(k, r, c), Ty::Vector(_, n)) if c == n => Some(vector_or_scalar(*k, *r)),
        (Ty::Matrix(k, r, n), Ty::Matrix(_, m, c)) if n == m => Some(Ty::Matrix(*k, *r, *c)),
        _ => None,
    }
}

impl<'a> Binder<'a> {
    fn new(fields: &'a [FieldDecl], statics: &'a [StaticField]) -> Self {
        Self {
            fields,
            field_types: fields.iter().map(|f| host_ty(f.ty)).collect(),
            statics,
            scopes: Vec::new(),
            locals: Vec::new(),
            flexible: Vec::new(),
            bindings: HashMap::new(),
            types: HashMap::new(),
            loop_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, msg: String, span: Span) {
        self.diagnostics.push(Diagnostic::error(msg, span));
    }

    fn error_with_help(&mut self, msg: String, help: &str, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(msg, span).with_help(help.to_string()));
    }

    // --- Scopes ---

    fn declare(&mut self, name: &Spanned<String>, ty: Ty, mutable: bool, flex: Option<Lit>) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalInfo {
            name: name.node.clone(),
            ty,
            mutable,
            span: name.span,
        });
        self.flexible.push(flex);
        self.bindings.insert(name.span, Symbol::Local(id));
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name.node.clone(), id));
        }
        id
    }

    fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    /// Statics named by `path`, which may be any unique suffix of a
    /// static's full path.
    fn lookup_static(&mut self, path: &Path, span: Span) -> Option<Option<usize>> {
        let found: Vec<usize> = self
            .statics
            .iter()
            .enumerate()
            .filter(|(_, s)| path.names(s.path))
            .map(|(i, _)| i)
            .collect();
        match found.as_slice() {
            [] => None,
            [only] => Some(Some(*only)),
            _ => {
                let candidates: Vec<&str> = found.iter().map(|&i| self.statics[i].path).collect();
                self.error_with_help(
                    format!("`{}` is ambiguous", path.as_dotted()),
                    &format!("qualify the path: {}", candidates.join(", ")),
                    span,
                );
                Some(None)
            }
        }
    }

    // --- Literal inference ---

    /// Fix the type of a flexible local once context decides it.
    fn settle(&mut self, value: &Typed, ty: &Ty) {
        if let Some(id) = value.local {
            self.locals[id.index()].ty = ty.clone();
            self.flexible[id.index()] = None;
        }
    }

    fn coerce(&mut self, value: &Typed, target: &Ty) -> bool {
        if value.ty == *target {
            self.settle(value, target);
            return true;
        }
        match (value.flex, target) {
            (Some(lit), Ty::Scalar(kind)) if lit.accepts(*kind) => {
                self.settle(value, target);
                true
            }
            _ => false,
        }
    }

    fn unify(&mut self, a: &Typed, b: &Typed) -> Option<Typed> {
        match (a.flex, b.flex) {
            (None, None) => (a.ty == b.ty).then(|| a.clone()),
            (Some(_), None) => self.coerce(a, &b.ty).then(|| b.clone()),
            (None, Some(_)) => self.coerce(b, &a.ty).then(|| a.clone()),
            // Integer literals never widen to floats: `1 + 2.5` is rejected.
            (Some(la), Some(lb)) => (la == lb && a.ty == b.ty).then(|| Typed {
                ty: a.ty.clone(),
                flex: Some(la),
                local: None,
            }),
        }
    }

    // --- Closure and statements ---

    fn bind_closure(&mut self, closure: &Closure) {
        if let Some(ty) = &closure.param.ty {
            if Ty::from_host(&ty.node) != Some(Ty::ThreadIds) {
                self.error_with_help(
                    format!(
                        "kernel parameter must have type `ThreadIds`, found `{}`",
                        ty.node
                    ),
                    "kernel bodies are closures of the form `|ids: ThreadIds| { ... }`",
                    ty.span,
                );
            }
        }
        self.scopes.push(Vec::new());
        self.declare(&closure.param.name, Ty::ThreadIds, false, None);
        self.block(&closure.body);
        self.scopes.pop();
    }

    fn block(&mut self, block: &Spanned<Block>) {
        self.scopes.push(Vec::new());
        for stmt in &block.node.stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn loop_body(&mut self, body: &Spanned<Block>) {
        self.loop_depth += 1;
        self.block(body);
        self.loop_depth -= 1;
    }

    fn condition(&mut self, cond: &Spanned<Expr>) {
        if let Some(t) = self.expr(cond) {
            if t.ty != BOOL {
                self.error(
                    format!("mismatched types: expected `bool`, found `{}`", t.ty),
                    cond.span,
                );
            }
        }
    }

    fn stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Let {
                mutable,
                name,
                ty,
                init,
            } => self.let_stmt(*mutable, name, ty.as_ref(), init.as_ref()),
            Stmt::Assign { op, place, value } => self.assign(*op, place, value, stmt.span),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.condition(cond);
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.block(else_block);
                }
            }
            Stmt::For {
                var,
                start,
                end,
                body,
                ..
            } => self.for_stmt(var, start, end, body),
            Stmt::While { cond, body } => {
                self.condition(cond);
                self.loop_body(body);
            }
            Stmt::Loop { body } => self.loop_body(body),
            Stmt::Break | Stmt::Continue => {
                if self.loop_depth == 0 {
                    let what = if matches!(stmt.node, Stmt::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    self.error(format!("`{}` outside of a loop", what), stmt.span);
                }
            }
            Stmt::Return => {}
            Stmt::Expr(expr) => {
                self.expr(expr);
            }
            Stmt::Block(block) => self.block(block),
        }
    }

    fn let_stmt(
        &mut self,
        mutable: bool,
        name: &Spanned<String>,
        annotation: Option<&Spanned<HostType>>,
        init: Option<&Spanned<Expr>>,
    ) {
        let value = init.and_then(|e| self.expr(e));
        let mut flex = None;

        let ty = match annotation {
            Some(ann) => match Ty::from_host(&ann.node) {
                Some(ty) if ty.is_value() || ty == Ty::ThreadIds => {
                    if let (Some(v), Some(init)) = (&value, init) {
                        if !self.coerce(v, &ty) {
                            self.error(
                                format!("mismatched types: expected `{}`, found `{}`", ty, v.ty),
                                init.span,
                            );
                        }
                    }
                    ty
                }
                _ => {
                    self.error(
                        format!("type `{}` cannot be used for kernel locals", ann.node),
                        ann.span,
                    );
                    Ty::Unit
                }
            },
            None => match (&value, init) {
                (Some(v), Some(init)) => {
                    if v.ty.is_value() || v.ty == Ty::ThreadIds {
                        flex = v.flex;
                        v.ty.clone()
                    } else {
                        self.error_with_help(
                            format!("cannot bind a value of type `{}` to a local", v.ty),
                            "index buffers directly where their elements are needed",
                            init.span,
                        );
                        Ty::Unit
                    }
                }
                (None, Some(_)) => Ty::Unit,
                (_, None) => {
                    self.error_with_help(
                        format!("type annotations needed for `{}`", name.node),
                        &format!("give the local a type: `let {}: f32;`", name.node),
                        name.span,
                    );
                    Ty::Unit
                }
            },
        };

        // `Unit` marks a local whose type is unknown after an error.
        self.declare(name, ty, mutable, flex);
    }

    fn for_stmt(
        &mut self,
        var: &Spanned<String>,
        start: &Spanned<Expr>,
        end: &Spanned<Expr>,
        body: &Spanned<Block>,
    ) {
        let lo = self.expr(start);
        let hi = self.expr(end);
        let counter = match (lo, hi) {
            (Some(lo), Some(hi)) => match self.unify(&lo, &hi) {
                Some(t) if t.is_integer() => Some(t),
                Some(t) => {
                    self.error(
                        format!("`for` ranges must be integers, found `{}`", t.ty),
                        start.span.merge(end.span),
                    );
                    None
                }
                None => {
                    self.error(
                        format!(
                            "mismatched range bounds: `{}` and `{}`",
                            lo.ty, hi.ty
                        ),
                        start.span.merge(end.span),
                    );
                    None
                }
            },
            _ => None,
        };

        self.scopes.push(Vec::new());
        let (ty, flex) = counter.map_or((Ty::Unit, None), |t| (t.ty, t.flex));
        self.declare(var, ty, false, flex);
        self.loop_body(body);
        self.scopes.pop();
    }

    fn assign(&mut self, op: Option<BinOp>, place: &Spanned<Expr>, value: &Spanned<Expr>, span: Span) {
        let target = self.expr(place);
        let value_ty = self.expr(value);
        if target.is_some() {
            self.check_assignable(place);
        }
        let (Some(target), Some(value_ty)) = (target, value_ty) else {
            return;
        };

        let ok = match op {
            None => self.coerce(&value_ty, &target.ty) || self.coerce(&target, &value_ty.ty),
            Some(op) => match self.binary(op, &target, &value_ty, span) {
                Some(result) => self.coerce(&result, &target.ty),
                None => return,
            },
        };
        if !ok {
            self.error(
                format!(
                    "mismatched types: cannot assign `{}` to `{}`",
                    value_ty.ty, target.ty
                ),
                value.span,
            );
        }
    }

    fn check_assignable(&mut self, place: &Spanned<Expr>) {
        match &place.node {
            Expr::Var(name) => match self.bindings.get(&place.span).copied() {
                Some(Symbol::Local(id)) if !self.locals[id.index()].mutable => {
                    self.error_with_help(
                        format!("cannot assign twice to immutable variable `{}`", name),
                        &format!("make it mutable: `let mut {}`", name),
                        place.span,
                    );
                }
                Some(Symbol::Local(_)) | None => {}
                Some(Symbol::Capture(_)) => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            format!("cannot assign to captured value `{}`", name),
                            place.span,
                        )
                        .with_note(
                            "scalar captures live in a read-only uniform buffer".to_string(),
                        ),
                    );
                }
                Some(Symbol::Static(_)) => {
                    self.error(format!("cannot assign to static `{}`", name), place.span);
                }
            },
            Expr::Path(path) => {
                self.error(
                    format!("cannot assign to static `{}`", path.as_dotted()),
                    place.span,
                );
            }
            Expr::Index { expr, .. } => match self.types.get(&expr.span).cloned() {
                Some(Ty::Buffer(BufferKind::ReadWrite, _)) => {}
                Some(Ty::Buffer(kind, _)) => {
                    self.error_with_help(
                        format!("cannot assign through a `{}`", kind.host_name()),
                        "declare the capture as a `ReadWriteBuffer` to write to it",
                        place.span,
                    );
                }
                _ => self.check_assignable(expr),
            },
            Expr::Field { expr, .. } => self.check_assignable(expr),
            Expr::Paren(inner) => self.check_assignable(inner),
            _ => self.error(
                "invalid left-hand side of assignment".to_string(),
                place.span,
            ),
        }
    }

    // --- Expressions ---

    fn expr(&mut self, e: &Spanned<Expr>) -> Option<Typed> {
        let typed = self.expr_inner(e)?;
        self.types.insert(e.span, typed.ty.clone());
        Some(typed)
    }

    fn expr_inner(&mut self, e: &Spanned<Expr>) -> Option<Typed> {
        match &e.node {
            Expr::Literal(lit) => Some(self.literal(lit)),
            Expr::Var(name) => self.var(name, e.span),
            Expr::Path(path) => self.path(path, e.span),
            Expr::Unary { op, expr } => self.unary(*op, expr, e.span),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.expr(lhs);
                let r = self.expr(rhs);
                self.binary(*op, &l?, &r?, e.span)
            }
            Expr::Cast { expr, ty } => self.cast(expr, ty),
            Expr::Field { expr, field } => self.field(expr, field),
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call(receiver, method, args),
            Expr::Call { path, args } => self.call(path, args, e.span),
            Expr::Index { expr, index } => self.index(expr, index),
            Expr::Tuple(_) => {
                self.error(
                    "tuples are only supported as matrix swizzle indices".to_string(),
                    e.span,
                );
                None
            }
            Expr::Paren(inner) => self.expr(inner),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                self.condition(cond);
                let a = self.expr(then_expr);
                let b = self.expr(else_expr);
                let (a, b) = (a?, b?);
                let unified = self.unify(&a, &b);
                if unified.is_none() {
                    self.error(
                        format!(
                            "`if` and `else` have incompatible types: `{}` and `{}`",
                            a.ty, b.ty
                        ),
                        e.span,
                    );
                }
                unified
            }
        }
    }

    fn literal(&mut self, lit: &Literal) -> Typed {
        match lit {
            Literal::Bool(_) => Typed::of(BOOL),
            Literal::Int { suffix, .. } => match suffix.as_deref() {
                None => Typed::literal(ScalarKind::Int, Lit::Int),
                Some("u" | "U" | "u32" | "usize") => Typed::of(Ty::Scalar(ScalarKind::UInt)),
                Some(_) => Typed::of(Ty::Scalar(ScalarKind::Int)),
            },
            Literal::Float { suffix, .. } => match suffix.as_deref() {
                None => Typed::literal(ScalarKind::Float, Lit::Float),
                Some("d" | "D" | "f64") => Typed::of(Ty::Scalar(ScalarKind::Double)),
                Some(_) => Typed::of(Ty::Scalar(ScalarKind::Float)),
            },
        }
    }

    fn var(&mut self, name: &str, span: Span) -> Option<Typed> {
        if let Some(id) = self.lookup_local(name) {
            self.bindings.insert(span, Symbol::Local(id));
            let info = &self.locals[id.index()];
            if info.ty == Ty::Unit {
                return None;
            }
            let flex = self.flexible[id.index()];
            return Some(Typed {
                ty: info.ty.clone(),
                flex,
                local: flex.map(|_| id),
            });
        }

        if let Some(i) = self.fields.iter().position(|f| f.name == name) {
            self.bindings.insert(span, Symbol::Capture(i));
            return match self.field_types[i].clone() {
                Some(ty) => Some(Typed::of(ty)),
                None => {
                    self.error(
                        format!(
                            "capture `{}` has type `{}` which kernels cannot use",
                            name, self.fields[i].ty
                        ),
                        span,
                    );
                    None
                }
            };
        }

        let path = Path(vec![name.to_string()]);
        match self.lookup_static(&path, span) {
            Some(Some(i)) => self.static_ref(i, span),
            Some(None) => None,
            None => {
                self.error(format!("cannot find value `{}` in this kernel", name), span);
                None
            }
        }
    }

    fn path(&mut self, path: &Path, span: Span) -> Option<Typed> {
        if path.owner() == Some("MatrixIndex") {
            self.error_with_help(
                format!("`{}` can only be used inside a matrix indexer", path.as_dotted()),
                "select matrix elements with `m[(MatrixIndex::M11, MatrixIndex::M22)]`",
                span,
            );
            return None;
        }
        match self.lookup_static(path, span) {
            Some(Some(i)) => self.static_ref(i, span),
            Some(None) => None,
            None => {
                self.error(
                    format!("cannot find value `{}` in this kernel", path.as_dotted()),
                    span,
                );
                None
            }
        }
    }

    fn static_ref(&mut self, index: usize, span: Span) -> Option<Typed> {
        self.bindings.insert(span, Symbol::Static(index));
        let s = self.statics[index];
        match host_ty(s.ty) {
            Some(ty) => Some(Typed::of(ty)),
            None => {
                self.error(
                    format!(
                        "static `{}` has type `{}` which kernels cannot use",
                        s.path, s.ty
                    ),
                    span,
                );
                None
            }
        }
    }

    fn unary(&mut self, op: UnOp, operand: &Spanned<Expr>, span: Span) -> Option<Typed> {
        let v = self.expr(operand)?;
        let ok = match (op, &v.ty) {
            (UnOp::Neg, Ty::Scalar(k)) => !matches!(k, ScalarKind::Bool | ScalarKind::UInt),
            (UnOp::Neg, Ty::Vector(k, _)) => *k != ScalarKind::Bool && *k != ScalarKind::UInt,
            (UnOp::Neg, Ty::Matrix(k, _, _)) => {
                *k != ScalarKind::Bool && placeholder::resolve(Receiver::Matrix, Member::Neg).is_some()
            }
            (UnOp::Not, Ty::Scalar(k)) => !k.is_float(),
            (UnOp::Not, Ty::Vector(ScalarKind::Bool, _)) => {
                placeholder::resolve(Receiver::Vector, Member::Not).is_some()
            }
            (UnOp::Not, Ty::Vector(k, _)) => {
                k.is_integer() && placeholder::resolve(Receiver::Vector, Member::Complement).is_some()
            }
            _ => false,
        };
        if !ok {
            self.error(
                format!("cannot apply unary operator `{}` to type `{}`", op.as_str(), v.ty),
                span,
            );
            return None;
        }
        Some(Typed { local: None, ..v })
    }

    fn binary(&mut self, op: BinOp, l: &Typed, r: &Typed, span: Span) -> Option<Typed> {
        let mismatch = |this: &mut Self| -> Option<Typed> {
            this.error(
                format!(
                    "cannot apply `{}` to `{}` and `{}`",
                    op.as_str(),
                    l.ty,
                    r.ty
                ),
                span,
            );
            None
        };

        if op.is_logical() {
            if l.ty != BOOL || r.ty != BOOL {
                return mismatch(self);
            }
            return Some(Typed::of(BOOL));
        }

        let is_aggregate = |t: &Ty| matches!(t, Ty::Vector(..) | Ty::Matrix(..));
        if !is_aggregate(&l.ty) && !is_aggregate(&r.ty) {
            let (Ty::Scalar(_), Ty::Scalar(_)) = (&l.ty, &r.ty) else {
                return mismatch(self);
            };
            if op.is_shift() {
                if !(l.is_integer() && r.is_integer()) {
                    return mismatch(self);
                }
                return Some(Typed { local: None, ..l.clone() });
            }
            let Some(u) = self.unify(l, r) else {
                return mismatch(self);
            };
            let kind = u.ty.elem()?;
            let ok = if op.is_arithmetic() {
                kind != ScalarKind::Bool
            } else if op.is_bitwise() {
                kind != ScalarKind::Float && kind != ScalarKind::Double
            } else {
                true
            };
            if !ok {
                return mismatch(self);
            }
            if op.is_comparison() {
                return Some(Typed::of(BOOL));
            }
            return Some(Typed { local: None, ..u });
        }

        let receiver = if matches!(l.ty, Ty::Matrix(..)) || matches!(r.ty, Ty::Matrix(..)) {
            Receiver::Matrix
        } else {
            Receiver::Vector
        };
        let supported = Member::for_binop(op)
            .and_then(|m| placeholder::resolve(receiver, m))
            .is_some();
        if !supported {
            let agg = if is_aggregate(&l.ty) { &l.ty } else { &r.ty };
            self.error(
                format!("operator `{}` is not supported on `{}`", op.as_str(), agg),
                span,
            );
            return None;
        }

        let (agg, other) = if is_aggregate(&l.ty) { (l, r) } else { (r, l) };
        let kind = agg.ty.elem()?;
        let shapes_match = if is_aggregate(&other.ty) {
            agg.ty == other.ty
        } else {
            self.coerce(other, &Ty::Scalar(kind))
        };
        if !shapes_match {
            self.diagnostics.push(
                Diagnostic::error(
                    format!(
                        "cannot apply `{}` to `{}` and `{}`",
                        op.as_str(),
                        l.ty,
                        r.ty
                    ),
                    span,
                )
                .with_help("use `Hlsl::mul` for matrix and vector products".to_string()),
            );
            return None;
        }
        let elem_ok = if op.is_arithmetic() {
            kind != ScalarKind::Bool
        } else if op.is_bitwise() || op.is_shift() {
            kind.is_integer() || (kind == ScalarKind::Bool && op.is_bitwise())
        } else {
            true
        };
        if !elem_ok {
            return mismatch(self);
        }
        if op.is_comparison() {
            return Some(Typed::of(agg.ty.with_elem(ScalarKind::Bool)));
        }
        Some(Typed::of(agg.ty.clone()))
    }

    fn cast(&mut self, operand: &Spanned<Expr>, ty: &Spanned<HostType>) -> Option<Typed> {
        let v = self.expr(operand)?;
        let target = Ty::from_host(&ty.node);
        match (&v.ty, target) {
            (_, Some(Ty::Scalar(ScalarKind::Bool))) => {
                self.error_with_help(
                    format!("cannot cast `{}` as `bool`", v.ty),
                    "compare with zero instead: `x != 0`",
                    ty.span,
                );
                None
            }
            (Ty::Scalar(ScalarKind::Bool), Some(Ty::Scalar(k))) if k.is_float() => {
                self.error(format!("cannot cast `bool` as `{}`", ty.node), ty.span);
                None
            }
            (Ty::Scalar(_), Some(Ty::Scalar(k))) => Some(Typed::of(Ty::Scalar(k))),
            (Ty::Scalar(_), _) => {
                self.error(format!("cannot cast to `{}`", ty.node), ty.span);
                None
            }
            _ => {
                self.error(
                    format!("non-primitive cast: `{}` as `{}`", v.ty, ty.node),
                    ty.span,
                );
                None
            }
        }
    }

    fn field(&mut self, receiver: &Spanned<Expr>, field: &Spanned<String>) -> Option<Typed> {
        let recv = self.expr(receiver)?;
        let mut chars = field.node.chars();
        let component = match (chars.next(), chars.next()) {
            (Some(c), None) => component_index(c),
            _ => None,
        };
        let ty = match (&recv.ty, component) {
            (Ty::ThreadIds, Some(i)) if i < 3 => Some(Ty::Scalar(ScalarKind::UInt)),
            (Ty::Vector(k, n), Some(i)) if i < *n => Some(Ty::Scalar(*k)),
            _ => None,
        };
        match ty {
            Some(ty) => Some(Typed::of(ty)),
            None => {
                self.error(
                    format!("no field `{}` on type `{}`", field.node, recv.ty),
                    field.span,
                );
                None
            }
        }
    }

    fn args(&mut self, args: &[Spanned<Expr>]) -> Option<Vec<Typed>> {
        let typed: Vec<Option<Typed>> = args.iter().map(|a| self.expr(a)).collect();
        typed.into_iter().collect()
    }

    fn arity_error(&mut self, what: &str, expected: usize, found: usize, span: Span) {
        self.error(
            format!(
                "{} takes {} argument{} but {} {} supplied",
                what,
                expected,
                if expected == 1 { "" } else { "s" },
                found,
                if found == 1 { "was" } else { "were" }
            ),
            span,
        );
    }

    fn method_call(
        &mut self,
        receiver: &Spanned<Expr>,
        method: &Spanned<String>,
        args: &[Spanned<Expr>],
    ) -> Option<Typed> {
        let recv = self.expr(receiver);
        let arg_types = self.args(args);
        let recv = recv?;
        let name = method.node.as_str();

        match &recv.ty {
            Ty::Vector(k, n) if args.is_empty() && is_swizzle(name, *n) => {
                return Some(Typed::of(Ty::Vector(*k, name.len() as u8)));
            }
            Ty::Matrix(k, rows, cols) if args.is_empty() => {
                if let Some((r, c)) = element_position(name) {
                    if r <= *rows && c <= *cols {
                        return Some(Typed::of(Ty::Scalar(*k)));
                    }
                    self.error(
                        format!("element `{}` is out of range for `{}`", name, recv.ty),
                        method.span,
                    );
                    return None;
                }
            }
            Ty::Scalar(k) if *k != ScalarKind::Bool => {
                if let Some(m) = placeholder::scalar_method(name) {
                    if !k.is_float() && !m.integers {
                        self.error(
                            format!("no method named `{}` found for `{}`", name, recv.ty),
                            method.span,
                        );
                        return None;
                    }
                    if args.len() != m.arity {
                        self.arity_error(&format!("`{}`", name), m.arity, args.len(), method.span);
                        return None;
                    }
                    let ty = Ty::Scalar(*k);
                    self.coerce(&recv, &ty);
                    for (arg, typed) in args.iter().zip(arg_types?.iter()) {
                        if !self.coerce(typed, &ty) {
                            self.error(
                                format!("mismatched types: expected `{}`, found `{}`", ty, typed.ty),
                                arg.span,
                            );
                        }
                    }
                    return Some(Typed::of(ty));
                }
            }
            _ => {}
        }

        self.error(
            format!("no method named `{}` found for `{}`", name, recv.ty),
            method.span,
        );
        None
    }

    /// Common operand type of an elementwise intrinsic. The shape is that of
    /// the first vector or matrix argument, the element kind that of the first
    /// argument that is not a flexible literal. Scalars promote to the shape,
    /// as in HLSL, and flexible literals settle on the element kind.
    fn intrinsic_operands(
        &mut self,
        name: &str,
        args: &[Spanned<Expr>],
        arg_types: &[Typed],
    ) -> Option<Ty> {
        let anchor = arg_types
            .iter()
            .find(|t| t.flex.is_none())
            .unwrap_or(&arg_types[0]);
        let kind = anchor.ty.elem()?;
        let ty = arg_types
            .iter()
            .find(|t| !matches!(t.ty, Ty::Scalar(_)))
            .map_or(Ty::Scalar(kind), |t| t.ty.with_elem(kind));
        for (arg, typed) in args.iter().zip(arg_types) {
            let target = match typed.ty {
                Ty::Scalar(_) => Ty::Scalar(kind),
                _ => ty.clone(),
            };
            if !self.coerce(typed, &target) {
                self.error(
                    format!(
                        "mismatched types: `{}` expects `{}`, found `{}`",
                        name, target, typed.ty
                    ),
                    arg.span,
                );
                return None;
            }
        }
        Some(ty)
    }

    fn call(&mut self, path: &Spanned<Path>, args: &[Spanned<Expr>], span: Span) -> Option<Typed> {
        let arg_types = self.args(args);
        match (path.node.owner(), path.node.last()) {
            (Some(placeholder::INTRINSIC_OWNER), name) => {
                let Some(intrinsic) = placeholder::intrinsic_named(name) else {
                    self.error(
                        format!("cannot find function `{}`", path.node.as_dotted()),
                        path.span,
                    );
                    return None;
                };
                if args.len() != intrinsic.arity {
                    self.arity_error(
                        &format!("`{}`", path.node.as_dotted()),
                        intrinsic.arity,
                        args.len(),
                        path.span,
                    );
                    return None;
                }
                let arg_types = arg_types?;
                if let Some((arg, bad)) = args.iter().zip(&arg_types).find(|(_, t)| !t.ty.is_value()) {
                    self.error(
                        format!("`{}` cannot take a value of type `{}`", name, bad.ty),
                        arg.span,
                    );
                    return None;
                }
                match intrinsic.returns {
                    Returns::Operands => {
                        self.intrinsic_operands(name, args, &arg_types).map(Typed::of)
                    }
                    Returns::Elem => self
                        .intrinsic_operands(name, args, &arg_types)
                        .and_then(|ty| ty.elem())
                        .map(|k| Typed::of(Ty::Scalar(k))),
                    Returns::Bool => Some(Typed::of(BOOL)),
                    Returns::Product => {
                        let (a, b) = (&arg_types[0].ty, &arg_types[1].ty);
                        let result = product(a, b);
                        if result.is_none() {
                            self.error(
                                format!("`{}` cannot combine `{}` and `{}`", name, a, b),
                                span,
                            );
                        }
                        result.map(Typed::of)
                    }
                }
            }
            (Some(owner), ctor @ ("new" | "splat")) => {
                let ty = match Ty::from_host(&HostType::named(owner)) {
                    Some(ty @ (Ty::Vector(..) | Ty::Matrix(..))) => ty,
                    _ => {
                        self.error(
                            format!("`{}` is not a vector or matrix constructor", path.node.as_dotted()),
                            path.span,
                        );
                        return None;
                    }
                };
                let arg_types = arg_types?;
                let kind = ty.elem()?;
                if ctor == "splat" {
                    if args.len() != 1 {
                        self.arity_error(&format!("`{}`", path.node.as_dotted()), 1, args.len(), path.span);
                        return None;
                    }
                    if !self.coerce(&arg_types[0], &Ty::Scalar(kind)) {
                        self.error(
                            format!(
                                "mismatched types: expected `{}`, found `{}`",
                                kind.host_name(),
                                arg_types[0].ty
                            ),
                            args[0].span,
                        );
                        return None;
                    }
                    return Some(Typed::of(ty));
                }
                let mut count = 0u8;
                for (arg, typed) in args.iter().zip(&arg_types) {
                    let fits = match &typed.ty {
                        Ty::Vector(k, n) if *k == kind => Some(*n),
                        Ty::Scalar(_) if self.coerce(typed, &Ty::Scalar(kind)) => Some(1),
                        _ => None,
                    };
                    match fits {
                        Some(n) => count += n,
                        None => {
                            self.error(
                                format!(
                                    "mismatched types: `{}` cannot initialize components of `{}`",
                                    typed.ty, ty
                                ),
                                arg.span,
                            );
                            return None;
                        }
                    }
                }
                let expected = components(&ty)?;
                if count != expected {
                    self.error(
                        format!(
                            "`{}` expects {} components, found {}",
                            path.node.as_dotted(),
                            expected,
                            count
                        ),
                        span,
                    );
                    return None;
                }
                Some(Typed::of(ty))
            }
            _ => {
                self.error_with_help(
                    format!("cannot find function `{}`", path.node.as_dotted()),
                    "call intrinsics as `Hlsl::name(..)` and constructors as `Float4::new(..)`",
                    path.span,
                );
                None
            }
        }
    }

    fn index(&mut self, base: &Spanned<Expr>, index: &Spanned<Expr>) -> Option<Typed> {
        let base_ty = self.expr(base)?;

        if let (Ty::Matrix(k, rows, cols), Expr::Tuple(items)) = (&base_ty.ty, &index.node) {
            return self.matrix_swizzle(*k, *rows, *cols, items, index.span);
        }

        let idx = self.expr(index)?;
        if !idx.is_integer() {
            self.error(
                format!("the type `{}` cannot be indexed by `{}`", base_ty.ty, idx.ty),
                index.span,
            );
            return None;
        }
        let ty = match &base_ty.ty {
            Ty::Buffer(_, elem) => (**elem).clone(),
            Ty::Vector(k, _) => Ty::Scalar(*k),
            Ty::Matrix(k, _, cols) => vector_or_scalar(*k, *cols),
            other => {
                self.error(
                    format!("cannot index into a value of type `{}`", other),
                    base.span,
                );
                return None;
            }
        };
        Some(Typed::of(ty))
    }

    fn matrix_swizzle(
        &mut self,
        kind: ScalarKind,
        rows: u8,
        cols: u8,
        items: &[Spanned<Expr>],
        span: Span,
    ) -> Option<Typed> {
        if !(2..=4).contains(&items.len()) {
            self.error(
                format!("matrix swizzles take 2 to 4 indices, found {}", items.len()),
                span,
            );
            return None;
        }
        for item in items {
            let position = match &item.node {
                Expr::Path(path) => matrix_index_position(path),
                _ => None,
            };
            match position {
                Some((r, c)) if r <= rows && c <= cols => {
                    self.types.insert(item.span, Ty::MatrixIndex);
                }
                Some(_) => {
                    self.error(
                        format!(
                            "matrix index is out of range for a {}x{} matrix",
                            rows, cols
                        ),
                        item.span,
                    );
                    return None;
                }
                None => {
                    self.error_with_help(
                        "expected a `MatrixIndex` selector".to_string(),
                        "matrix swizzles look like `m[(MatrixIndex::M11, MatrixIndex::M22)]`",
                        item.span,
                    );
                    return None;
                }
            }
        }
        self.types
            .insert(span, Ty::Tuple(vec![Ty::MatrixIndex; items.len()]));
        Some(Typed::of(Ty::Vector(kind, items.len() as u8)))
    }
}

#[cfg(test)]
mod tests;
