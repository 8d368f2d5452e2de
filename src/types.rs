//! Host-side types as kernels declare them, and the semantic types the
//! symbol model reasons with.

mod table;

use std::fmt;
use std::str::FromStr;

pub use table::{Category, HlslTypeTable, TypeTable};

/// A host type as written in a field catalog or in kernel source,
/// e.g. `ReadOnlyBuffer<f32>` or `kernels::Float4`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostType {
    /// Path as written, without generic arguments.
    pub name: String,
    pub args: Vec<HostType>,
}

impl HostType {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: &str, args: Vec<HostType>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }

    /// Last path segment: `kernels::Float4` -> `Float4`.
    pub fn base(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Full name including generic arguments, used in diagnostics.
    pub fn full_name(&self) -> String {
        if self.args.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self.args.iter().map(|a| a.full_name()).collect();
        format!("{}<{}>", self.name, args.join(", "))
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Error returned when a type string in a catalog is malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTypeError(pub String);

impl fmt::Display for ParseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed host type `{}`", self.0)
    }
}

impl std::error::Error for ParseTypeError {}

impl FromStr for HostType {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let (ty, rest) = parse_host_type(&compact).ok_or_else(|| ParseTypeError(s.to_string()))?;
        if !rest.is_empty() {
            return Err(ParseTypeError(s.to_string()));
        }
        Ok(ty)
    }
}

fn parse_host_type(s: &str) -> Option<(HostType, &str)> {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(s.len());
    let name = &s[..end];
    if name.is_empty() || name.starts_with(':') || name.ends_with(':') {
        return None;
    }
    let mut rest = &s[end..];
    let mut args = Vec::new();
    if let Some(after) = rest.strip_prefix('<') {
        rest = after;
        loop {
            let (arg, after) = parse_host_type(rest)?;
            args.push(arg);
            if let Some(after) = after.strip_prefix(',') {
                rest = after;
            } else if let Some(after) = after.strip_prefix('>') {
                rest = after;
                break;
            } else {
                return None;
            }
        }
    }
    Some((HostType::generic(name, args), rest))
}

/// Scalar element kinds shared by scalars, vectors and matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarKind {
    /// Host scalar name (`f32`, `u32`, ...).
    pub fn host_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "i32",
            ScalarKind::UInt => "u32",
            ScalarKind::Float => "f32",
            ScalarKind::Double => "f64",
        }
    }

    /// Prefix of the host vector/matrix type names (`Float4`, `Int3x3`).
    pub fn aggregate_prefix(self) -> &'static str {
        match self {
            ScalarKind::Bool => "Bool",
            ScalarKind::Int => "Int",
            ScalarKind::UInt => "UInt",
            ScalarKind::Float => "Float",
            ScalarKind::Double => "Double",
        }
    }

    /// HLSL scalar keyword.
    pub fn hlsl_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    /// Size of one component inside an HLSL constant buffer.
    pub fn hlsl_size(self) -> u32 {
        match self {
            ScalarKind::Double => 8,
            _ => 4,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::UInt)
    }

    fn from_scalar_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ScalarKind::Bool),
            "i32" | "isize" => Some(ScalarKind::Int),
            "u32" | "usize" => Some(ScalarKind::UInt),
            "f32" => Some(ScalarKind::Float),
            "f64" => Some(ScalarKind::Double),
            _ => None,
        }
    }

    fn from_prefix(name: &str) -> Option<(Self, &str)> {
        for kind in [
            ScalarKind::UInt,
            ScalarKind::Int,
            ScalarKind::Bool,
            ScalarKind::Float,
            ScalarKind::Double,
        ] {
            if let Some(rest) = name.strip_prefix(kind.aggregate_prefix()) {
                return Some((kind, rest));
            }
        }
        None
    }
}

/// Kinds of memory-backed buffers a kernel can capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Constant,
    ReadOnly,
    ReadWrite,
}

impl BufferKind {
    pub fn host_name(self) -> &'static str {
        match self {
            BufferKind::Constant => "ConstantBuffer",
            BufferKind::ReadOnly => "ReadOnlyBuffer",
            BufferKind::ReadWrite => "ReadWriteBuffer",
        }
    }
}

/// Semantic types used by the symbol model (distinct from `HostType`,
/// which is purely syntactic).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// Element kind, rows, columns.
    Matrix(ScalarKind, u8, u8),
    Buffer(BufferKind, Box<Ty>),
    /// The thread-index parameter (`uint3` in HLSL).
    ThreadIds,
    /// A `MatrixIndex::Mrc` selector used by matrix swizzle indexers.
    MatrixIndex,
    Tuple(Vec<Ty>),
    Unit,
}

impl Ty {
    /// Resolve a host type to its semantic shape, if it has one.
    pub fn from_host(host: &HostType) -> Option<Ty> {
        let base = host.base();
        if !host.args.is_empty() {
            let kind = match base {
                "ConstantBuffer" => BufferKind::Constant,
                "ReadOnlyBuffer" => BufferKind::ReadOnly,
                "ReadWriteBuffer" => BufferKind::ReadWrite,
                _ => return None,
            };
            if host.args.len() != 1 {
                return None;
            }
            let elem = Ty::from_host(&host.args[0])?;
            if !elem.is_value() {
                return None;
            }
            return Some(Ty::Buffer(kind, Box::new(elem)));
        }
        match base {
            "ThreadIds" => return Some(Ty::ThreadIds),
            "MatrixIndex" => return Some(Ty::MatrixIndex),
            _ => {}
        }
        if let Some(kind) = ScalarKind::from_scalar_name(base) {
            return Some(Ty::Scalar(kind));
        }
        let (kind, dims) = ScalarKind::from_prefix(base)?;
        let bytes = dims.as_bytes();
        match bytes {
            [n] if (b'2'..=b'4').contains(n) => Some(Ty::Vector(kind, n - b'0')),
            [r, b'x', c] if (b'1'..=b'4').contains(r) && (b'1'..=b'4').contains(c) => {
                Some(Ty::Matrix(kind, r - b'0', c - b'0'))
            }
            _ => None,
        }
    }

    /// Canonical host spelling of this type.
    pub fn to_host(&self) -> HostType {
        match self {
            Ty::Scalar(k) => HostType::named(k.host_name()),
            Ty::Vector(k, n) => HostType::named(&format!("{}{}", k.aggregate_prefix(), n)),
            Ty::Matrix(k, r, c) => {
                HostType::named(&format!("{}{}x{}", k.aggregate_prefix(), r, c))
            }
            Ty::Buffer(kind, elem) => HostType::generic(kind.host_name(), vec![elem.to_host()]),
            Ty::ThreadIds => HostType::named("ThreadIds"),
            Ty::MatrixIndex => HostType::named("MatrixIndex"),
            Ty::Tuple(elems) => {
                HostType::generic("Tuple", elems.iter().map(|t| t.to_host()).collect())
            }
            Ty::Unit => HostType::named("()"),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Ty::Tuple(elems) => {
                let parts: Vec<_> = elems.iter().map(|t| t.display()).collect();
                format!("({})", parts.join(", "))
            }
            Ty::Unit => "()".to_string(),
            other => other.to_host().full_name(),
        }
    }

    /// Scalar element kind of scalars, vectors and matrices.
    pub fn elem(&self) -> Option<ScalarKind> {
        match self {
            Ty::Scalar(k) | Ty::Vector(k, _) | Ty::Matrix(k, _, _) => Some(*k),
            _ => None,
        }
    }

    /// Plain values: scalars, vectors and matrices.
    pub fn is_value(&self) -> bool {
        self.elem().is_some()
    }

    pub fn is_bool(&self) -> bool {
        self.elem() == Some(ScalarKind::Bool)
    }

    /// Same shape, different element kind (`Float3` -> `Bool3`).
    pub fn with_elem(&self, kind: ScalarKind) -> Ty {
        match self {
            Ty::Vector(_, n) => Ty::Vector(kind, *n),
            Ty::Matrix(_, r, c) => Ty::Matrix(kind, *r, *c),
            _ => Ty::Scalar(kind),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> Option<Ty> {
        Ty::from_host(&s.parse().unwrap())
    }

    #[test]
    fn test_parse_generic_host_type() {
        let t: HostType = "ReadWriteBuffer< kernels::Float4 >".parse().unwrap();
        assert_eq!(t.base(), "ReadWriteBuffer");
        assert_eq!(t.args[0].base(), "Float4");
        assert_eq!(t.full_name(), "ReadWriteBuffer<kernels::Float4>");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("ReadOnlyBuffer<f32".parse::<HostType>().is_err());
        assert!("<f32>".parse::<HostType>().is_err());
        assert!("f32>".parse::<HostType>().is_err());
        assert!("".parse::<HostType>().is_err());
    }

    #[test]
    fn test_scalar_vector_matrix_shapes() {
        assert_eq!(ty("f32"), Some(Ty::Scalar(ScalarKind::Float)));
        assert_eq!(ty("UInt3"), Some(Ty::Vector(ScalarKind::UInt, 3)));
        assert_eq!(ty("Int2"), Some(Ty::Vector(ScalarKind::Int, 2)));
        assert_eq!(ty("Double2x3"), Some(Ty::Matrix(ScalarKind::Double, 2, 3)));
        assert_eq!(ty("Float5"), None);
        assert_eq!(ty("Float1"), None);
        assert_eq!(ty("Float4x5"), None);
    }

    #[test]
    fn test_buffer_shapes() {
        assert_eq!(
            ty("ReadOnlyBuffer<Float4>"),
            Some(Ty::Buffer(
                BufferKind::ReadOnly,
                Box::new(Ty::Vector(ScalarKind::Float, 4))
            ))
        );
        assert_eq!(ty("ReadOnlyBuffer<Particle>"), None);
        assert_eq!(ty("ReadOnlyBuffer<ReadOnlyBuffer<f32>>"), None);
        assert_eq!(ty("Vec<f32>"), None);
    }

    #[test]
    fn test_to_host_is_canonical() {
        let m = Ty::Matrix(ScalarKind::Float, 4, 4);
        assert_eq!(m.to_host().full_name(), "Float4x4");
        assert_eq!(Ty::from_host(&m.to_host()), Some(m));
        assert_eq!(Ty::Vector(ScalarKind::Bool, 3).display(), "Bool3");
    }
}
