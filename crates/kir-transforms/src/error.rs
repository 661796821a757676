//! Transform error types.

use kir_core::id::OpId;
use kir_core::verify::VerifyError;
use kir_core::CoreError;

/// Errors raised while outlining kernels.
#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    /// Structural misuse of the program graph.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The input does not satisfy a precondition of the transformation.
    #[error("contract violation at op {op}: {reason}")]
    ContractViolation { op: OpId, reason: String },
}

impl OutlineError {
    pub(crate) fn contract(op: OpId, reason: impl Into<String>) -> Self {
        OutlineError::ContractViolation {
            op,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the pass infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// A kernel outlining step failed.
    #[error("outlining failed: {0}")]
    Outline(#[from] OutlineError),

    /// The program did not verify after a pass.
    #[error("verification failed after pass '{pass}' with {} error(s)", .errors.len())]
    Verification {
        pass: String,
        errors: Vec<VerifyError>,
    },

    /// No pass is registered under the requested name.
    #[error("unknown pass: {0}")]
    UnknownPass(String),
}
