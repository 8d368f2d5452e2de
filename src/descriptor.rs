//! The translated kernel: generated body, classified captures and binding
//! manifest.
//!
//! A descriptor only depends on the kernel's type, so one descriptor
//! serves every instance. Values are read from an instance at dispatch
//! time through the accessors on each [`CapturedField`].

use std::sync::OnceLock;

use crate::binding::{self, BindingParameter, BindingSlot};
use crate::capture::CapturedField;
use crate::kernel::{Capture, Kernel, KernelId};
use crate::uniform::{UniformError, UniformLayout};

#[derive(Debug)]
pub struct KernelDescriptor {
    kernel: KernelId,
    body: String,
    thread_ids: String,
    resources: Vec<CapturedField>,
    scalars: Vec<CapturedField>,
    slots: Vec<BindingSlot>,
    uniforms: UniformLayout,
    fingerprint: blake3::Hash,
    parameters: OnceLock<Vec<BindingParameter>>,
}

impl KernelDescriptor {
    pub(crate) fn new(
        kernel: KernelId,
        body: String,
        thread_ids: String,
        resources: Vec<CapturedField>,
        scalars: Vec<CapturedField>,
    ) -> Self {
        let slots = binding::assemble(&resources);
        let uniforms = crate::uniform::layout(&scalars);
        let fingerprint = blake3::hash(body.as_bytes());
        Self {
            kernel,
            body,
            thread_ids,
            resources,
            scalars,
            slots,
            uniforms,
            fingerprint,
            parameters: OnceLock::new(),
        }
    }

    pub fn kernel(&self) -> KernelId {
        self.kernel
    }

    /// HLSL statement block of the entry point, braces included.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Name of the thread-index parameter in `body`.
    pub fn thread_ids(&self) -> &str {
        &self.thread_ids
    }

    /// Buffer captures, in discovery order.
    pub fn resources(&self) -> &[CapturedField] {
        &self.resources
    }

    /// Scalar, vector and matrix captures, in discovery order.
    pub fn scalars(&self) -> &[CapturedField] {
        &self.scalars
    }

    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    /// Binding parameters, one per slot. Built on first use.
    pub fn binding_parameters(&self) -> &[BindingParameter] {
        self.parameters.get_or_init(|| binding::parameters(&self.slots))
    }

    pub fn uniform_layout(&self) -> &UniformLayout {
        &self.uniforms
    }

    pub fn uniform_size(&self) -> u32 {
        self.uniforms.size
    }

    /// blake3 of the body text, hex encoded.
    pub fn fingerprint(&self) -> String {
        self.fingerprint.to_hex().to_string()
    }

    /// Resource handles of `kernel`, in resource order.
    pub fn resource_values<'k, K: Kernel>(&self, kernel: &'k K) -> Vec<Capture<'k>> {
        self.resources.iter().map(|f| f.read(kernel)).collect()
    }

    /// Values of `kernel`'s scalar captures, in scalar order.
    pub fn scalar_values<'k, K: Kernel>(&self, kernel: &'k K) -> Vec<Capture<'k>> {
        self.scalars.iter().map(|f| f.read(kernel)).collect()
    }

    /// Contents of the uniform buffer for one dispatch of `kernel`.
    pub fn pack_uniforms<K: Kernel>(&self, kernel: &K) -> Result<Vec<u8>, UniformError> {
        let found = KernelId::of::<K>();
        if found != self.kernel {
            return Err(UniformError::KernelMismatch {
                expected: self.kernel.name().to_string(),
                found: found.name().to_string(),
            });
        }
        let values = self.scalar_values(kernel);
        self.uniforms.pack(values.iter().map(Capture::as_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSource;
    use crate::kernel::{FieldDecl, KernelSource};
    use crate::types::Category;

    struct Pair {
        a: i32,
        b: f32,
    }

    impl Kernel for Pair {
        fn source() -> KernelSource {
            KernelSource::new("|ids| { }")
        }

        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::instance("a", "i32"), FieldDecl::instance("b", "f32")]
        }

        fn capture(&self, field: usize) -> Capture<'_> {
            match field {
                0 => Capture::pod(&self.a),
                _ => Capture::pod(&self.b),
            }
        }
    }

    struct Other;

    impl Kernel for Other {
        fn source() -> KernelSource {
            KernelSource::new("|ids| { }")
        }

        fn fields() -> Vec<FieldDecl> {
            Vec::new()
        }

        fn capture(&self, _: usize) -> Capture<'_> {
            Capture::bool(false)
        }
    }

    fn scalar(name: &str, ty: &str, index: usize) -> CapturedField {
        CapturedField {
            name: name.to_string(),
            shader_name: name.to_string(),
            host_type: ty.parse().unwrap(),
            hlsl_type: String::new(),
            category: Category::ScalarOrVector,
            slot: None,
            source: CaptureSource::Instance(index),
        }
    }

    fn descriptor() -> KernelDescriptor {
        KernelDescriptor::new(
            KernelId::of::<Pair>(),
            "{\n}".to_string(),
            "ids".to_string(),
            Vec::new(),
            vec![scalar("a", "i32", 0), scalar("b", "f32", 1)],
        )
    }

    #[test]
    fn test_uniform_only_manifest() {
        let d = descriptor();
        assert_eq!(d.slots(), &[BindingSlot::UNIFORM]);
        assert_eq!(d.binding_parameters().len(), 1);
        assert!(std::ptr::eq(d.binding_parameters(), d.binding_parameters()));
        assert_eq!(d.uniform_size(), 16);
        assert_eq!(d.fingerprint().len(), 64);
    }

    #[test]
    fn test_pack_uniforms_reads_the_instance() {
        let d = descriptor();
        let bytes = d.pack_uniforms(&Pair { a: -3, b: 0.5 }).unwrap();
        assert_eq!(&bytes[0..4], &(-3i32).to_ne_bytes());
        assert_eq!(&bytes[4..8], &0.5f32.to_ne_bytes());
        assert!(bytes[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pack_uniforms_checks_kernel_identity() {
        let err = descriptor().pack_uniforms(&Other).unwrap_err();
        assert!(matches!(err, UniformError::KernelMismatch { .. }));
    }
}
