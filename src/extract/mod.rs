//! Body extraction: captured closure source to syntax tree and symbol model.
//!
//! Recovery is deterministic per kernel type and memoized process-wide, so
//! every kernel body is parsed and bound at most once.

pub mod model;

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::cache::SingleFlight;
use crate::error::{Result, TranslateError};
use crate::kernel::{FieldDecl, Kernel, KernelId, StaticField};
use crate::syntax::ast::Closure;
use crate::syntax::parse_closure;

pub use model::{LocalId, LocalInfo, Symbol, SymbolModel};

/// A kernel body recovered into an editable tree plus its symbol model.
#[derive(Debug)]
pub struct RecoveredBody {
    pub kernel: KernelId,
    pub source: &'static str,
    pub closure: Closure,
    pub model: SymbolModel,
    pub fields: Vec<FieldDecl>,
    pub statics: Vec<StaticField>,
}

type BodyCache = SingleFlight<KernelId, Result<Arc<RecoveredBody>>>;

fn bodies() -> &'static BodyCache {
    static BODIES: OnceLock<BodyCache> = OnceLock::new();
    BODIES.get_or_init(|| SingleFlight::new("bodies"))
}

/// Parse and bind `source` for the kernel `kernel`.
pub fn decompile(
    kernel: KernelId,
    source: &'static str,
    fields: Vec<FieldDecl>,
    statics: Vec<StaticField>,
) -> Result<RecoveredBody> {
    let failure = |diagnostics| TranslateError::DecompilationFailure {
        kernel: kernel.name().to_string(),
        source_text: source.to_string(),
        diagnostics,
    };

    let closure = parse_closure(source).map_err(failure)?;
    let model = model::bind(&closure, &fields, &statics).map_err(failure)?;
    debug!(
        kernel = kernel.name(),
        locals = model.locals().len(),
        "recovered kernel body"
    );
    Ok(RecoveredBody {
        kernel,
        source,
        closure,
        model,
        fields,
        statics,
    })
}

/// Recover the body of `K`, at most once per process.
pub fn recover<K: Kernel>() -> Result<Arc<RecoveredBody>> {
    let id = KernelId::of::<K>();
    bodies().get_or_compute(&id, || {
        decompile(id, K::source().text, K::fields(), K::statics()).map(Arc::new)
    })
}

/// Whether recovery of `K` has run (successfully or not).
pub fn is_recovered<K: Kernel>() -> bool {
    bodies().contains(&KernelId::of::<K>())
}

/// Number of times the body of `K` has been recovered.
pub fn recoveries<K: Kernel>() -> usize {
    bodies().computations(&KernelId::of::<K>())
}
