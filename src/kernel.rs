//! The kernel provider: what a kernel type must expose to be translated.
//!
//! A kernel is a plain struct whose instance fields are the closure's
//! captures. Its body is a Rust closure captured as source text with
//! [`kernel_source!`](crate::kernel_source), and its field catalog is
//! declared explicitly next to it:
//!
//! ```ignore
//! struct Scale {
//!     factor: f32,
//!     data: ReadWriteBuffer<f32>,
//! }
//!
//! impl Kernel for Scale {
//!     fn source() -> KernelSource {
//!         kernel_source!(|ids: ThreadIds| {
//!             data[ids.x] *= factor;
//!         })
//!     }
//!
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::instance("factor", "f32"),
//!             FieldDecl::instance("data", "ReadWriteBuffer<f32>"),
//!         ]
//!     }
//!
//!     fn capture(&self, field: usize) -> Capture<'_> {
//!         match field {
//!             0 => Capture::pod(&self.factor),
//!             _ => Capture::resource(&self.data),
//!         }
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Captured source text of a kernel closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelSource {
    pub text: &'static str,
}

impl KernelSource {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }
}

/// Capture a kernel closure as source text.
///
/// The closure is not compiled by the host; it only has to be valid
/// token trees. Comments are dropped by `stringify!`.
#[macro_export]
macro_rules! kernel_source {
    ($($body:tt)*) => {
        $crate::kernel::KernelSource::new(stringify!($($body)*))
    };
}

/// One entry of a kernel type's field catalog, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    /// Host type as written, e.g. `ReadOnlyBuffer<Float4>`.
    pub ty: &'static str,
    pub is_static: bool,
}

impl FieldDecl {
    pub const fn instance(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            is_static: false,
        }
    }

    /// A static declared on the kernel type itself. Such kernels are
    /// rejected before their body is recovered.
    pub const fn static_field(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            is_static: true,
        }
    }
}

/// A static visible to the kernel body, e.g. `Params::THRESHOLD`.
///
/// Referencing one from the body turns it into an extra capture.
#[derive(Clone, Copy)]
pub struct StaticField {
    /// Path the static is reachable by. The body may name it by any
    /// suffix of this path that is unique among the visible statics.
    pub path: &'static str,
    pub ty: &'static str,
    pub read: fn() -> Capture<'static>,
}

impl StaticField {
    pub const fn new(path: &'static str, ty: &'static str, read: fn() -> Capture<'static>) -> Self {
        Self { path, ty, read }
    }

    /// Last path segment.
    pub fn name(&self) -> &'static str {
        self.path.rsplit("::").next().unwrap_or(self.path)
    }
}

impl fmt::Debug for StaticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticField")
            .field("path", &self.path)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// The live value of one capture, read from a kernel instance at
/// dispatch time.
#[derive(Clone)]
pub enum Capture<'a> {
    /// Plain bytes of a scalar, vector or matrix, laid out as the host
    /// type (row-major for matrices, 4 bytes per `bool`).
    Value(Cow<'a, [u8]>),
    /// A buffer handle owned by the execution backend.
    Resource(&'a (dyn Any + Send + Sync)),
}

impl<'a> Capture<'a> {
    pub fn pod<T: bytemuck::Pod>(value: &'a T) -> Self {
        Capture::Value(Cow::Borrowed(bytemuck::bytes_of(value)))
    }

    pub fn owned<T: bytemuck::Pod>(value: T) -> Self {
        Capture::Value(Cow::Owned(bytemuck::bytes_of(&value).to_vec()))
    }

    /// HLSL `bool` is 4 bytes wide.
    pub fn bool(value: bool) -> Self {
        Capture::owned(u32::from(value))
    }

    pub fn resource<T: Any + Send + Sync>(value: &'a T) -> Self {
        Capture::Resource(value)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Capture::Value(bytes) => Some(bytes.as_ref()),
            Capture::Resource(_) => None,
        }
    }

    pub fn downcast<T: Any>(&self) -> Option<&'a T> {
        match self {
            Capture::Resource(r) => {
                let r: &'a (dyn Any + Send + Sync) = *r;
                r.downcast_ref::<T>()
            }
            Capture::Value(_) => None,
        }
    }
}

impl fmt::Debug for Capture<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capture::Value(bytes) => f.debug_tuple("Value").field(&bytes.len()).finish(),
            Capture::Resource(_) => f.write_str("Resource(..)"),
        }
    }
}

/// A kernel type: a closure body plus the state it captures.
pub trait Kernel: Send + Sync + 'static {
    fn source() -> KernelSource;

    /// Field catalog of the kernel type, in declaration order.
    fn fields() -> Vec<FieldDecl>;

    /// Statics the body may reference.
    fn statics() -> Vec<StaticField> {
        Vec::new()
    }

    /// Value of the `field`-th catalog entry on this instance.
    fn capture(&self, field: usize) -> Capture<'_>;
}

/// Identity of a kernel type, the key of every translation cache.
#[derive(Clone, Copy)]
pub struct KernelId {
    type_id: TypeId,
    name: &'static str,
}

impl KernelId {
    pub fn of<K: Kernel>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            name: std::any::type_name::<K>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for KernelId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for KernelId {}

impl Hash for KernelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        value: [f32; 2],
        flag: bool,
        table: Vec<u32>,
    }

    impl Kernel for Sample {
        fn source() -> KernelSource {
            crate::kernel_source!(|ids: ThreadIds| { table[ids.x] = 1u32; })
        }

        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::instance("value", "Float2"),
                FieldDecl::instance("flag", "bool"),
                FieldDecl::instance("table", "ReadWriteBuffer<u32>"),
            ]
        }

        fn capture(&self, field: usize) -> Capture<'_> {
            match field {
                0 => Capture::pod(&self.value),
                1 => Capture::bool(self.flag),
                _ => Capture::resource(&self.table),
            }
        }
    }

    #[test]
    fn test_kernel_source_macro_stringifies_tokens() {
        let src = Sample::source();
        assert!(src.text.starts_with('|'));
        assert!(src.text.contains("ThreadIds"));
        assert!(src.text.contains("1u32"));
    }

    #[test]
    fn test_capture_bytes_and_resources() {
        let sample = Sample {
            value: [1.0, 2.0],
            flag: true,
            table: vec![7, 8],
        };
        assert_eq!(sample.capture(0).as_bytes().map(<[u8]>::len), Some(8));
        assert_eq!(sample.capture(1).as_bytes(), Some(&1u32.to_ne_bytes()[..]));
        let table = sample.capture(2);
        assert!(table.as_bytes().is_none());
        assert_eq!(table.downcast::<Vec<u32>>(), Some(&vec![7, 8]));
        assert!(table.downcast::<Vec<f32>>().is_none());
    }

    #[test]
    fn test_kernel_id_is_per_type() {
        struct Other;
        impl Kernel for Other {
            fn source() -> KernelSource {
                KernelSource::new("|ids| {}")
            }
            fn fields() -> Vec<FieldDecl> {
                Vec::new()
            }
            fn capture(&self, _: usize) -> Capture<'_> {
                Capture::bool(false)
            }
        }
        assert_eq!(KernelId::of::<Sample>(), KernelId::of::<Sample>());
        assert_ne!(KernelId::of::<Sample>(), KernelId::of::<Other>());
        assert!(KernelId::of::<Sample>().name().ends_with("Sample"));
    }

    #[test]
    fn test_static_field_name_is_last_segment() {
        static LIMIT: f32 = 0.5;
        let s = StaticField::new("config::Params::LIMIT", "f32", || Capture::pod(&LIMIT));
        assert_eq!(s.name(), "LIMIT");
        assert_eq!((s.read)().as_bytes().map(<[u8]>::len), Some(4));
    }
}
