//! Capture classification.
//!
//! Every capture of a kernel (instance fields first, then the statics the
//! body reads) gets a category from the type table. Resource captures also
//! get a slot from their category's own counter. Constant buffers count
//! from 1 because slot 0 is the implicit uniform buffer.

use std::fmt;

use tracing::debug;

use crate::error::{Result, TranslateError};
use crate::kernel::{Capture, FieldDecl, Kernel};
use crate::rewrite::StaticCapture;
use crate::types::{Category, HostType, TypeTable};

/// Where a capture's run-time value comes from.
#[derive(Clone, Copy)]
pub enum CaptureSource {
    /// Index into the kernel's field catalog.
    Instance(usize),
    Static {
        path: &'static str,
        read: fn() -> Capture<'static>,
    },
}

impl fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
            CaptureSource::Static { path, .. } => f.debug_tuple("Static").field(path).finish(),
        }
    }
}

/// One classified capture.
#[derive(Clone, Debug)]
pub struct CapturedField {
    /// Name as declared on the host.
    pub name: String,
    /// Identifier used for it in the generated program.
    pub shader_name: String,
    pub host_type: HostType,
    pub hlsl_type: String,
    pub category: Category,
    /// Slot within `category`; `None` for scalars and vectors.
    pub slot: Option<u32>,
    pub source: CaptureSource,
}

impl CapturedField {
    pub fn is_static(&self) -> bool {
        matches!(self.source, CaptureSource::Static { .. })
    }

    /// Current value of this capture on `kernel`.
    pub fn read<'k, K: Kernel>(&self, kernel: &'k K) -> Capture<'k> {
        match self.source {
            CaptureSource::Instance(field) => kernel.capture(field),
            CaptureSource::Static { read, .. } => read(),
        }
    }
}

/// Reject kernel types that declare static fields.
pub fn check_shape(kernel: &str, fields: &[FieldDecl]) -> Result<()> {
    match fields.iter().find(|f| f.is_static) {
        Some(field) => Err(TranslateError::InvalidBodyShape {
            kernel: kernel.to_string(),
            field: field.name.to_string(),
        }),
        None => Ok(()),
    }
}

/// Accumulates classified captures in discovery order.
pub struct Classifier<'t> {
    kernel: String,
    table: &'t dyn TypeTable,
    next_constant: u32,
    next_read_only: u32,
    next_read_write: u32,
    resources: Vec<CapturedField>,
    scalars: Vec<CapturedField>,
}

impl<'t> Classifier<'t> {
    pub fn new(kernel: &str, table: &'t dyn TypeTable) -> Self {
        Self {
            kernel: kernel.to_string(),
            table,
            next_constant: 1,
            next_read_only: 0,
            next_read_write: 0,
            resources: Vec::new(),
            scalars: Vec::new(),
        }
    }

    pub fn classify_instance(&mut self, index: usize, field: &FieldDecl, shader_name: &str) -> Result<()> {
        self.classify(field.name, field.ty, shader_name, CaptureSource::Instance(index))
    }

    pub fn classify_static(&mut self, capture: &StaticCapture, shader_name: &str) -> Result<()> {
        let name = capture.path.rsplit("::").next().unwrap_or(capture.path);
        let source = CaptureSource::Static {
            path: capture.path,
            read: capture.read,
        };
        self.classify(name, capture.ty, shader_name, source)
    }

    fn unsupported(&self, name: &str, type_name: String) -> TranslateError {
        TranslateError::UnsupportedCaptureType {
            kernel: self.kernel.clone(),
            field: name.to_string(),
            type_name,
        }
    }

    fn classify(&mut self, name: &str, ty: &str, shader_name: &str, source: CaptureSource) -> Result<()> {
        let host: HostType = ty
            .parse()
            .map_err(|_| self.unsupported(name, ty.to_string()))?;
        let category = self
            .table
            .classify(&host)
            .ok_or_else(|| self.unsupported(name, host.full_name()))?;
        let hlsl_type = self
            .table
            .mapped_name(&host)
            .ok_or_else(|| self.unsupported(name, host.full_name()))?;

        let counter = match category {
            Category::ScalarOrVector => None,
            Category::ConstantBuffer => Some(&mut self.next_constant),
            Category::ReadOnlyBuffer => Some(&mut self.next_read_only),
            Category::ReadWriteBuffer => Some(&mut self.next_read_write),
        };
        let slot = counter.map(|next| {
            let slot = *next;
            *next += 1;
            slot
        });

        debug!(
            kernel = %self.kernel,
            field = name,
            ?category,
            ?slot,
            "classified capture"
        );

        let field = CapturedField {
            name: name.to_string(),
            shader_name: shader_name.to_string(),
            host_type: host,
            hlsl_type,
            category,
            slot,
            source,
        };
        if category.is_resource() {
            self.resources.push(field);
        } else {
            self.scalars.push(field);
        }
        Ok(())
    }

    /// `(resources, scalars)`, each in discovery order.
    pub fn finish(self) -> (Vec<CapturedField>, Vec<CapturedField>) {
        (self.resources, self.scalars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HlslTypeTable;

    fn classify_all(fields: &[FieldDecl]) -> Result<(Vec<CapturedField>, Vec<CapturedField>)> {
        let mut classifier = Classifier::new("demo::K", &HlslTypeTable);
        for (i, f) in fields.iter().enumerate() {
            classifier.classify_instance(i, f, f.name)?;
        }
        Ok(classifier.finish())
    }

    #[test]
    fn test_check_shape_names_static_field() {
        let fields = [
            FieldDecl::instance("a", "f32"),
            FieldDecl::static_field("COUNTER", "u32"),
        ];
        match check_shape("demo::K", &fields) {
            Err(TranslateError::InvalidBodyShape { field, .. }) => assert_eq!(field, "COUNTER"),
            other => panic!("expected InvalidBodyShape, got {:?}", other),
        }
        assert!(check_shape("demo::K", &fields[..1]).is_ok());
    }

    #[test]
    fn test_slots_are_per_category_and_ordered() {
        let fields = [
            FieldDecl::instance("a", "ReadOnlyBuffer<f32>"),
            FieldDecl::instance("w", "ConstantBuffer<Float4>"),
            FieldDecl::instance("s", "f32"),
            FieldDecl::instance("b", "ReadWriteBuffer<f32>"),
            FieldDecl::instance("c", "ReadOnlyBuffer<Int2>"),
            FieldDecl::instance("v", "ConstantBuffer<f32>"),
        ];
        let (resources, scalars) = classify_all(&fields).unwrap();
        let got: Vec<(&str, Category, Option<u32>)> = resources
            .iter()
            .map(|f| (f.name.as_str(), f.category, f.slot))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a", Category::ReadOnlyBuffer, Some(0)),
                ("w", Category::ConstantBuffer, Some(1)),
                ("b", Category::ReadWriteBuffer, Some(0)),
                ("c", Category::ReadOnlyBuffer, Some(1)),
                ("v", Category::ConstantBuffer, Some(2)),
            ]
        );
        assert_eq!(scalars.len(), 1);
        assert_eq!(scalars[0].slot, None);
        assert_eq!(scalars[0].hlsl_type, "float");
        assert_eq!(resources[2].hlsl_type, "RWStructuredBuffer<float>");
    }

    #[test]
    fn test_unsupported_type_is_named_in_full() {
        let fields = [FieldDecl::instance("p", "ReadOnlyBuffer<Particle>")];
        match classify_all(&fields) {
            Err(TranslateError::UnsupportedCaptureType {
                field, type_name, ..
            }) => {
                assert_eq!(field, "p");
                assert_eq!(type_name, "ReadOnlyBuffer<Particle>");
            }
            other => panic!("expected UnsupportedCaptureType, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_malformed_type_is_unsupported() {
        let fields = [FieldDecl::instance("p", "ReadOnlyBuffer<f32")];
        assert!(matches!(
            classify_all(&fields),
            Err(TranslateError::UnsupportedCaptureType { .. })
        ));
    }

    #[test]
    fn test_static_captures_are_classified_after_instances() {
        static LIMIT: f32 = 1.5;
        let mut classifier = Classifier::new("demo::K", &HlslTypeTable);
        classifier
            .classify_instance(0, &FieldDecl::instance("a", "i32"), "a")
            .unwrap();
        let capture = StaticCapture {
            index: 0,
            path: "cfg::Params::limit",
            ty: "f32",
            read: || Capture::pod(&LIMIT),
        };
        classifier.classify_static(&capture, "limit").unwrap();
        let (_, scalars) = classifier.finish();
        assert_eq!(scalars[1].name, "limit");
        assert!(scalars[1].is_static());
        assert!(!scalars[0].is_static());
    }
}
