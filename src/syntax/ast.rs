use crate::span::Spanned;
use crate::types::HostType;

/// A kernel body: a single-parameter closure.
#[derive(Clone, Debug, PartialEq)]
pub struct Closure {
    pub param: Param,
    pub body: Spanned<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Option<Spanned<HostType>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Let {
        mutable: bool,
        name: Spanned<String>,
        ty: Option<Spanned<HostType>>,
        init: Option<Spanned<Expr>>,
    },
    /// `place = value` and the compound forms (`place += value`, ...).
    Assign {
        op: Option<BinOp>,
        place: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    /// `else if` chains are nested `If`s in the else block.
    If {
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_block: Option<Spanned<Block>>,
    },
    For {
        var: Spanned<String>,
        start: Spanned<Expr>,
        end: Spanned<Expr>,
        inclusive: bool,
        body: Spanned<Block>,
    },
    While {
        cond: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Loop {
        body: Spanned<Block>,
    },
    Break,
    Continue,
    Return,
    Expr(Spanned<Expr>),
    Block(Spanned<Block>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A single identifier: a local, the thread-ids parameter, or a capture.
    Var(String),
    /// A multi-segment path such as `MatrixIndex::M11` or `Params::SCALE`.
    Path(Path),
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Cast {
        expr: Box<Spanned<Expr>>,
        ty: Spanned<HostType>,
    },
    Field {
        expr: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    /// Path calls: `Float4::new(..)`, `Hlsl::dot(..)`.
    Call {
        path: Spanned<Path>,
        args: Vec<Spanned<Expr>>,
    },
    Index {
        expr: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Tuple(Vec<Spanned<Expr>>),
    /// Parentheses are kept so emitted text follows the source grouping.
    Paren(Box<Spanned<Expr>>),
    /// `if c { a } else { b }` in expression position.
    If {
        cond: Box<Spanned<Expr>>,
        then_expr: Box<Spanned<Expr>>,
        else_expr: Box<Spanned<Expr>>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    /// Digits as written (separators included), suffix kept apart.
    Int { text: String, suffix: Option<String> },
    Float { text: String, suffix: Option<String> },
}

impl Literal {
    /// Unsuffixed numeric literals take their type from context.
    pub fn is_flexible(&self) -> bool {
        matches!(
            self,
            Literal::Int { suffix: None, .. } | Literal::Float { suffix: None, .. }
        )
    }
}

/// `a::b::c`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(pub Vec<String>);

impl Path {
    pub fn as_dotted(&self) -> String {
        self.0.join("::")
    }

    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// The segment before the last one, for `Type::function` calls.
    pub fn owner(&self) -> Option<&str> {
        let n = self.0.len();
        (n >= 2).then(|| self.0[n - 2].as_str())
    }

    /// True when `self` names `full` on a segment boundary
    /// (`params::SCALE` names `crate::params::SCALE`).
    pub fn names(&self, full: &str) -> bool {
        let full: Vec<&str> = full.split("::").collect();
        full.len() >= self.0.len()
            && full[full.len() - self.0.len()..]
                .iter()
                .zip(&self.0)
                .all(|(a, b)| *a == b.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Path {
        Path(s.split("::").map(str::to_string).collect())
    }

    #[test]
    fn test_path_names_on_segment_boundary() {
        assert!(path("params::SCALE").names("crate::params::SCALE"));
        assert!(path("SCALE").names("crate::params::SCALE"));
        assert!(!path("rams::SCALE").names("crate::params::SCALE"));
        assert!(!path("a::params::SCALE").names("params::SCALE"));
    }

    #[test]
    fn test_path_owner() {
        assert_eq!(path("Hlsl::dot").owner(), Some("Hlsl"));
        assert_eq!(path("dot").owner(), None);
        assert_eq!(path("kernels::Float4::new").owner(), Some("Float4"));
    }
}
