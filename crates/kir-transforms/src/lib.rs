//! GPU kernel outlining for kir programs.
//!
//! Each `gpu.launch` found in a top-level function is extracted into a
//! `gpu.kernel` function living in its own `gpu.kernel_module`, and the
//! launch site is rewritten into a `gpu.launch_func` referencing it.
//! Constant launch operands are folded into the kernel body on the way.
//!
//! The pipeline is exposed both as plain functions ([`outline_module`] and
//! the per-step helpers) and as [`GpuKernelOutliningPass`], registered under
//! `gpu-kernel-outlining` by [`register_builtin_passes`].

pub mod constants;
pub mod error;
pub mod extract;
pub mod index_ops;
pub mod outline;
pub mod pass;

use serde::{Deserialize, Serialize};

pub use constants::inline_constants;
pub use error::{OutlineError, PassError};
pub use extract::outline_kernel_func;
pub use index_ops::inject_gpu_index_operations;
pub use outline::{outline_module, GpuKernelOutliningPass, OutlinedKernel};
pub use pass::{register_builtin_passes, Pass, PassManager, PassRegistry};

/// Options controlling kernel outlining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineOptions {
    /// Appended to the enclosing function's name to name the kernel.
    pub kernel_suffix: String,

    /// Whether constant data operands are folded into the kernel body.
    pub inline_constants: bool,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        OutlineOptions {
            kernel_suffix: "_kernel".to_string(),
            inline_constants: true,
        }
    }
}
