//! Errors surfaced by kernel translation.
//!
//! Every variant is terminal for the kernel being translated: nothing is
//! retried and no partial descriptor is produced. Errors are `Clone` because
//! the process-wide cache hands the same failed result to every caller that
//! asked for the same kernel.
//!
//! A placeholder call the rewriter cannot resolve is not an error here: it
//! is a defect in the rewriter's tables and panics.

use thiserror::Error;

use crate::diagnostic::{render_diagnostics, Diagnostic};

/// Translation result type alias.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors that abort the translation of a kernel.
#[derive(Debug, Clone, Error)]
pub enum TranslateError {
    /// The kernel's declaring type lists a static field among its captures.
    ///
    /// Raised before the body is recovered. Statics referenced from inside
    /// the body are legal; statics declared on the kernel type are not.
    #[error("kernel `{kernel}` declares static field `{field}`; kernel types may only declare instance captures")]
    InvalidBodyShape { kernel: String, field: String },

    /// A captured field's type has no category in the type table.
    #[error("unsupported field `{field}` of type {type_name} in kernel `{kernel}`")]
    UnsupportedCaptureType {
        kernel: String,
        field: String,
        type_name: String,
    },

    /// The kernel body could not be recovered into a syntax tree.
    #[error("cannot decompile kernel `{kernel}`: {}", summary(.diagnostics))]
    DecompilationFailure {
        kernel: String,
        source_text: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl TranslateError {
    /// Full ariadne report for decompilation failures, `Display` otherwise.
    pub fn report(&self) -> String {
        match self {
            TranslateError::DecompilationFailure {
                kernel,
                source_text,
                diagnostics,
            } => render_diagnostics(diagnostics, kernel, source_text),
            other => other.to_string(),
        }
    }
}

fn summary(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}
