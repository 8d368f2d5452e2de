//! Translation of per-thread Rust compute closures into HLSL compute
//! kernels plus the resource-binding manifest a backend needs to run them.

pub mod binding;
pub mod cache;
pub mod capture;
pub mod config;
pub mod descriptor;
pub mod diagnostic;
pub mod error;
pub mod extract;
pub mod kernel;
pub mod pipeline;
pub mod render;
pub mod rewrite;
pub mod span;
pub mod syntax;
pub mod types;
pub mod uniform;

pub use binding::{BindingParameter, BindingSlot, DescriptorRange, RangeKind, Visibility};
pub use capture::{CaptureSource, CapturedField};
pub use config::ShaderConfig;
pub use descriptor::KernelDescriptor;
pub use diagnostic::Diagnostic;
pub use error::{Result, TranslateError};
pub use kernel::{Capture, FieldDecl, Kernel, KernelId, KernelSource, StaticField};
pub use pipeline::{is_translated, load_all, translate, translate_with, Loader};
pub use render::render_shader;
pub use types::{Category, HlslTypeTable, HostType, TypeTable};
pub use uniform::{UniformEntry, UniformError, UniformLayout};

/// Translate `K` and render it as a complete HLSL program.
pub fn compile<K: Kernel>(config: &ShaderConfig) -> Result<String> {
    let descriptor = translate::<K>()?;
    Ok(render_shader(&descriptor, config))
}
