//! Capture categories and the host-to-HLSL type table.

use serde::Serialize;

use super::{BufferKind, HostType, Ty};

/// Capture categories, decided purely by a capture's declared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    /// Packed into the implicit uniform buffer at constant-buffer slot 0.
    ScalarOrVector,
    ConstantBuffer,
    ReadOnlyBuffer,
    ReadWriteBuffer,
}

impl Category {
    pub fn is_resource(self) -> bool {
        !matches!(self, Category::ScalarOrVector)
    }
}

/// Maps host types to capture categories and target-language type names.
///
/// `classify` returning `None` means the type is unsupported as a capture;
/// `mapped_name` may still succeed for such types (e.g. `usize` in a cast).
pub trait TypeTable: Send + Sync {
    fn classify(&self, ty: &HostType) -> Option<Category>;

    fn mapped_name(&self, ty: &HostType) -> Option<String>;
}

/// The built-in HLSL table.
#[derive(Clone, Copy, Debug, Default)]
pub struct HlslTypeTable;

/// Scalars that only exist for indexing and casts on the host; their host
/// layout differs from any HLSL scalar so they can never be captured.
const HOST_ONLY_SCALARS: &[&str] = &["usize", "isize"];

fn is_capturable(host: &HostType) -> bool {
    !HOST_ONLY_SCALARS.contains(&host.base()) && host.args.iter().all(is_capturable)
}

impl TypeTable for HlslTypeTable {
    fn classify(&self, ty: &HostType) -> Option<Category> {
        if !is_capturable(ty) {
            return None;
        }
        match Ty::from_host(ty)? {
            Ty::Scalar(_) | Ty::Vector(..) | Ty::Matrix(..) => Some(Category::ScalarOrVector),
            Ty::Buffer(BufferKind::Constant, _) => Some(Category::ConstantBuffer),
            Ty::Buffer(BufferKind::ReadOnly, _) => Some(Category::ReadOnlyBuffer),
            Ty::Buffer(BufferKind::ReadWrite, _) => Some(Category::ReadWriteBuffer),
            Ty::ThreadIds | Ty::MatrixIndex | Ty::Tuple(_) | Ty::Unit => None,
        }
    }

    fn mapped_name(&self, ty: &HostType) -> Option<String> {
        Ty::from_host(ty).and_then(|t| hlsl_name(&t))
    }
}

/// HLSL spelling of a semantic type.
pub(crate) fn hlsl_name(ty: &Ty) -> Option<String> {
    match ty {
        Ty::Scalar(k) => Some(k.hlsl_name().to_string()),
        Ty::Vector(k, n) => Some(format!("{}{}", k.hlsl_name(), n)),
        Ty::Matrix(k, r, c) => Some(format!("{}{}x{}", k.hlsl_name(), r, c)),
        // Constant buffers are declared as arrays of their element type.
        Ty::Buffer(BufferKind::Constant, elem) => hlsl_name(elem),
        Ty::Buffer(BufferKind::ReadOnly, elem) => {
            Some(format!("StructuredBuffer<{}>", hlsl_name(elem)?))
        }
        Ty::Buffer(BufferKind::ReadWrite, elem) => {
            Some(format!("RWStructuredBuffer<{}>", hlsl_name(elem)?))
        }
        Ty::ThreadIds => Some("uint3".to_string()),
        Ty::MatrixIndex | Ty::Tuple(_) => None,
        Ty::Unit => Some("void".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(s: &str) -> HostType {
        s.parse().unwrap()
    }

    #[test]
    fn test_classify_scalars_and_vectors() {
        let t = HlslTypeTable;
        for name in ["bool", "i32", "u32", "f32", "f64", "Float4", "Int2", "Float4x4"] {
            assert_eq!(
                t.classify(&host(name)),
                Some(Category::ScalarOrVector),
                "{name}"
            );
        }
    }

    #[test]
    fn test_classify_buffers() {
        let t = HlslTypeTable;
        assert_eq!(
            t.classify(&host("ConstantBuffer<Float4>")),
            Some(Category::ConstantBuffer)
        );
        assert_eq!(
            t.classify(&host("ReadOnlyBuffer<f32>")),
            Some(Category::ReadOnlyBuffer)
        );
        assert_eq!(
            t.classify(&host("ReadWriteBuffer<UInt2>")),
            Some(Category::ReadWriteBuffer)
        );
    }

    #[test]
    fn test_classify_rejects_unknown_and_host_only() {
        let t = HlslTypeTable;
        assert_eq!(t.classify(&host("String")), None);
        assert_eq!(t.classify(&host("usize")), None);
        assert_eq!(t.classify(&host("ReadOnlyBuffer<usize>")), None);
        assert_eq!(t.classify(&host("ThreadIds")), None);
    }

    #[test]
    fn test_mapped_names() {
        let t = HlslTypeTable;
        assert_eq!(t.mapped_name(&host("f32")).as_deref(), Some("float"));
        assert_eq!(t.mapped_name(&host("UInt3")).as_deref(), Some("uint3"));
        assert_eq!(t.mapped_name(&host("Double2x3")).as_deref(), Some("double2x3"));
        assert_eq!(
            t.mapped_name(&host("ReadOnlyBuffer<Float4>")).as_deref(),
            Some("StructuredBuffer<float4>")
        );
        assert_eq!(
            t.mapped_name(&host("ReadWriteBuffer<i32>")).as_deref(),
            Some("RWStructuredBuffer<int>")
        );
        assert_eq!(
            t.mapped_name(&host("ConstantBuffer<Float2>")).as_deref(),
            Some("float2")
        );
        assert_eq!(t.mapped_name(&host("usize")).as_deref(), Some("uint"));
        assert_eq!(t.mapped_name(&host("Particle")), None);
    }
}
