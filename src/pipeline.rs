//! Translation pipeline: shape check, classification, recovery, rewrite and
//! manifest assembly for one kernel type.

use std::sync::{Arc, OnceLock};

use tracing::{instrument, warn};

use crate::cache::SingleFlight;
use crate::capture::{check_shape, Classifier};
use crate::descriptor::KernelDescriptor;
use crate::error::{Result, TranslateError};
use crate::extract;
use crate::kernel::{Kernel, KernelId};
use crate::rewrite::{self, names::capture_names};
use crate::types::{HlslTypeTable, TypeTable};

type DescriptorCache = SingleFlight<KernelId, Result<Arc<KernelDescriptor>>>;

fn descriptors() -> &'static DescriptorCache {
    static DESCRIPTORS: OnceLock<DescriptorCache> = OnceLock::new();
    DESCRIPTORS.get_or_init(|| SingleFlight::new("descriptors"))
}

/// Translate `K` against the built-in HLSL table, at most once per process.
pub fn translate<K: Kernel>() -> Result<Arc<KernelDescriptor>> {
    descriptors().get_or_compute(&KernelId::of::<K>(), || {
        translate_with::<K>(&HlslTypeTable).map(Arc::new)
    })
}

/// Translate `K` against `table`.
///
/// Body recovery is still shared process-wide; everything after it is
/// recomputed on each call.
#[instrument(skip(table), fields(kernel = KernelId::of::<K>().name()))]
pub fn translate_with<K: Kernel>(table: &dyn TypeTable) -> Result<KernelDescriptor> {
    let result = run::<K>(table);
    if let Err(err) = &result {
        warn!("translation failed:\n{}", err.report());
    }
    result
}

fn run<K: Kernel>(table: &dyn TypeTable) -> Result<KernelDescriptor> {
    let id = KernelId::of::<K>();
    let fields = K::fields();
    check_shape(id.name(), &fields)?;

    let (_, shader_names) = capture_names(fields.iter().map(|f| f.name));
    let mut classifier = Classifier::new(id.name(), table);
    for (index, (field, shader_name)) in fields.iter().zip(&shader_names).enumerate() {
        classifier.classify_instance(index, field, shader_name)?;
    }

    let body = extract::recover::<K>()?;
    let rewritten = rewrite::rewrite(&body, table).map_err(|diagnostics| {
        TranslateError::DecompilationFailure {
            kernel: id.name().to_string(),
            source_text: body.source.to_string(),
            diagnostics,
        }
    })?;

    for (capture, shader_name) in rewritten.statics.iter().zip(&rewritten.static_names) {
        classifier.classify_static(capture, shader_name)?;
    }
    let (resources, scalars) = classifier.finish();

    Ok(KernelDescriptor::new(
        id,
        rewritten.text,
        rewritten.thread_ids,
        resources,
        scalars,
    ))
}

/// Whether `translate::<K>()` has run (successfully or not).
pub fn is_translated<K: Kernel>() -> bool {
    descriptors().contains(&KernelId::of::<K>())
}

/// A kernel translation entry point, e.g. `translate::<Blur>`.
pub type Loader = fn() -> Result<Arc<KernelDescriptor>>;

/// Run `loaders` in parallel; results keep the input order.
pub fn load_all(loaders: &[Loader]) -> Vec<Result<Arc<KernelDescriptor>>> {
    use rayon::prelude::*;
    loaders.par_iter().map(|load| load()).collect()
}
