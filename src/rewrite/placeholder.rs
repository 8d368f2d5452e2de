//! Host placeholder members and the HLSL they stand for.
//!
//! The host vector, matrix and buffer types expose indexers, swizzles and
//! operators that only exist so kernel bodies read like ordinary Rust.
//! None of them may run; every call site is rewritten through this table.
//! The symbol model consults the same table, so a member the table does
//! not know is reported while recovering the body, and the rewriter
//! treats a miss as a bug.

use crate::syntax::ast::BinOp;
use crate::types::Ty;

/// Kind of the value a placeholder member is invoked on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Receiver {
    Buffer,
    Vector,
    Matrix,
    ThreadIds,
    Scalar,
    /// Static intrinsics, `Hlsl::name(..)`.
    Hlsl,
    /// `Float4::new(..)`, `Float4::splat(..)`.
    Constructor,
}

impl Receiver {
    pub fn of(ty: &Ty) -> Option<Receiver> {
        match ty {
            Ty::Buffer(..) => Some(Receiver::Buffer),
            Ty::Vector(..) => Some(Receiver::Vector),
            Ty::Matrix(..) => Some(Receiver::Matrix),
            Ty::ThreadIds => Some(Receiver::ThreadIds),
            Ty::Scalar(_) => Some(Receiver::Scalar),
            Ty::MatrixIndex | Ty::Tuple(_) | Ty::Unit => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Member {
    /// `x[i]`
    Index,
    /// `m[(MatrixIndex::M11, MatrixIndex::M22)]`
    MatrixSwizzle,
    /// `v.xy()`
    Swizzle,
    /// `v.x`
    Component,
    /// `m.m12()`
    Element,
    Neg,
    /// Logical not of bool vectors.
    Not,
    /// Bitwise complement of integer vectors (`!v` on the host).
    Complement,
    /// `+ - * / %`
    Arith,
    /// `== != < <= > >=`
    Compare,
    /// `& | ^ << >>`
    Bitwise,
    /// Scalar math methods, see [`SCALAR_METHODS`].
    Method,
    /// See [`INTRINSICS`].
    Intrinsic,
    New,
    Splat,
}

impl Member {
    /// Operator family of a binary operator. Logical operators have no
    /// aggregate form.
    pub fn for_binop(op: BinOp) -> Option<Member> {
        if op.is_arithmetic() {
            Some(Member::Arith)
        } else if op.is_comparison() {
            Some(Member::Compare)
        } else if op.is_bitwise() || op.is_shift() {
            Some(Member::Bitwise)
        } else {
            None
        }
    }
}

/// One rewrite rule.
///
/// Template tokens: `{0}`..`{9}` are operands (receiver first), `{*}` is
/// every operand joined by `, `, and `{m}` is the member text computed by
/// the rewriter (swizzle letters, operator symbol, function or type name).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder {
    pub receiver: Receiver,
    pub member: Member,
    pub template: &'static str,
}

const fn rule(receiver: Receiver, member: Member, template: &'static str) -> Placeholder {
    Placeholder {
        receiver,
        member,
        template,
    }
}

pub static PLACEHOLDERS: &[Placeholder] = &[
    rule(Receiver::Buffer, Member::Index, "{0}[{1}]"),
    rule(Receiver::Vector, Member::Index, "{0}[{1}]"),
    rule(Receiver::Matrix, Member::Index, "{0}[{1}]"),
    rule(Receiver::Matrix, Member::MatrixSwizzle, "{0}.{m}"),
    rule(Receiver::Matrix, Member::Element, "{0}.{m}"),
    rule(Receiver::Vector, Member::Swizzle, "{0}.{m}"),
    rule(Receiver::Vector, Member::Component, "{0}.{m}"),
    rule(Receiver::ThreadIds, Member::Component, "{0}.{m}"),
    rule(Receiver::Vector, Member::Neg, "-{0}"),
    rule(Receiver::Matrix, Member::Neg, "-{0}"),
    rule(Receiver::Vector, Member::Not, "!{0}"),
    rule(Receiver::Vector, Member::Complement, "~{0}"),
    rule(Receiver::Vector, Member::Arith, "{0} {m} {1}"),
    rule(Receiver::Matrix, Member::Arith, "{0} {m} {1}"),
    rule(Receiver::Vector, Member::Compare, "{0} {m} {1}"),
    rule(Receiver::Vector, Member::Bitwise, "{0} {m} {1}"),
    rule(Receiver::Scalar, Member::Method, "{m}({*})"),
    rule(Receiver::Hlsl, Member::Intrinsic, "{m}({*})"),
    rule(Receiver::Constructor, Member::New, "{m}({*})"),
    rule(Receiver::Constructor, Member::Splat, "({m})({0})"),
];

pub fn resolve(receiver: Receiver, member: Member) -> Option<&'static Placeholder> {
    PLACEHOLDERS
        .iter()
        .find(|p| p.receiver == receiver && p.member == member)
}

/// Scalar math method: host name, HLSL function, extra arguments, and
/// whether integer receivers are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarMethod {
    pub name: &'static str,
    pub hlsl: &'static str,
    pub arity: usize,
    pub integers: bool,
}

const fn method(name: &'static str, hlsl: &'static str, arity: usize, integers: bool) -> ScalarMethod {
    ScalarMethod {
        name,
        hlsl,
        arity,
        integers,
    }
}

pub static SCALAR_METHODS: &[ScalarMethod] = &[
    method("abs", "abs", 0, true),
    method("acos", "acos", 0, false),
    method("asin", "asin", 0, false),
    method("atan", "atan", 0, false),
    method("atan2", "atan2", 1, false),
    method("ceil", "ceil", 0, false),
    method("clamp", "clamp", 2, true),
    method("cos", "cos", 0, false),
    method("cosh", "cosh", 0, false),
    method("exp", "exp", 0, false),
    method("exp2", "exp2", 0, false),
    method("floor", "floor", 0, false),
    method("fract", "frac", 0, false),
    method("ln", "log", 0, false),
    method("log10", "log10", 0, false),
    method("log2", "log2", 0, false),
    method("max", "max", 1, true),
    method("min", "min", 1, true),
    method("mul_add", "mad", 2, false),
    method("powf", "pow", 1, false),
    method("powi", "pow", 1, false),
    method("round", "round", 0, false),
    method("signum", "sign", 0, false),
    method("sin", "sin", 0, false),
    method("sinh", "sinh", 0, false),
    method("sqrt", "sqrt", 0, false),
    method("tan", "tan", 0, false),
    method("tanh", "tanh", 0, false),
    method("to_degrees", "degrees", 0, false),
    method("to_radians", "radians", 0, false),
    method("trunc", "trunc", 0, false),
];

pub fn scalar_method(name: &str) -> Option<&'static ScalarMethod> {
    SCALAR_METHODS.iter().find(|m| m.name == name)
}

/// How an intrinsic's result type follows from its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Returns {
    /// Common type of the arguments, scalars promoted to the vector or
    /// matrix shape (`max(0.0, v)`, `step(0.5, v)`).
    Operands,
    /// Scalar element of the common type (`dot`, `length`).
    Elem,
    /// Scalar `bool` (`all`, `any`).
    Bool,
    /// Matrix/vector product shape (`mul`).
    Product,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intrinsic {
    pub name: &'static str,
    pub arity: usize,
    pub returns: Returns,
}

const fn intrinsic(name: &'static str, arity: usize, returns: Returns) -> Intrinsic {
    Intrinsic {
        name,
        arity,
        returns,
    }
}

pub static INTRINSICS: &[Intrinsic] = &[
    intrinsic("abs", 1, Returns::Operands),
    intrinsic("acos", 1, Returns::Operands),
    intrinsic("all", 1, Returns::Bool),
    intrinsic("any", 1, Returns::Bool),
    intrinsic("asin", 1, Returns::Operands),
    intrinsic("atan", 1, Returns::Operands),
    intrinsic("atan2", 2, Returns::Operands),
    intrinsic("ceil", 1, Returns::Operands),
    intrinsic("clamp", 3, Returns::Operands),
    intrinsic("cos", 1, Returns::Operands),
    intrinsic("cosh", 1, Returns::Operands),
    intrinsic("cross", 2, Returns::Operands),
    intrinsic("degrees", 1, Returns::Operands),
    intrinsic("distance", 2, Returns::Elem),
    intrinsic("dot", 2, Returns::Elem),
    intrinsic("exp", 1, Returns::Operands),
    intrinsic("exp2", 1, Returns::Operands),
    intrinsic("floor", 1, Returns::Operands),
    intrinsic("fmod", 2, Returns::Operands),
    intrinsic("frac", 1, Returns::Operands),
    intrinsic("length", 1, Returns::Elem),
    intrinsic("lerp", 3, Returns::Operands),
    intrinsic("log", 1, Returns::Operands),
    intrinsic("log2", 1, Returns::Operands),
    intrinsic("mad", 3, Returns::Operands),
    intrinsic("max", 2, Returns::Operands),
    intrinsic("min", 2, Returns::Operands),
    intrinsic("mul", 2, Returns::Product),
    intrinsic("normalize", 1, Returns::Operands),
    intrinsic("pow", 2, Returns::Operands),
    intrinsic("radians", 1, Returns::Operands),
    intrinsic("reflect", 2, Returns::Operands),
    intrinsic("round", 1, Returns::Operands),
    intrinsic("rsqrt", 1, Returns::Operands),
    intrinsic("saturate", 1, Returns::Operands),
    intrinsic("sign", 1, Returns::Operands),
    intrinsic("sin", 1, Returns::Operands),
    intrinsic("sinh", 1, Returns::Operands),
    intrinsic("smoothstep", 3, Returns::Operands),
    intrinsic("sqrt", 1, Returns::Operands),
    intrinsic("step", 2, Returns::Operands),
    intrinsic("tan", 1, Returns::Operands),
    intrinsic("tanh", 1, Returns::Operands),
    intrinsic("trunc", 1, Returns::Operands),
];

pub fn intrinsic_named(name: &str) -> Option<&'static Intrinsic> {
    INTRINSICS.iter().find(|i| i.name == name)
}

/// Owner segment of static intrinsic calls.
pub const INTRINSIC_OWNER: &str = "Hlsl";

/// Substitute operands and member text into a template.
pub fn render(template: &str, member: &str, operands: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        match &after[..close] {
            "m" => out.push_str(member),
            "*" => out.push_str(&operands.join(", ")),
            token => match token.parse::<usize>().ok().and_then(|i| operands.get(i)) {
                Some(operand) => out.push_str(operand),
                None => unreachable!("template `{}` has no operand `{}`", template, token),
            },
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
