//! The outlining driver and its pass wrapper.
//!
//! For every function of a module, each `gpu.launch` is processed to
//! completion before the next one:
//!
//! 1. extract the body into a kernel function,
//! 2. insert the kernel after the enclosing function under a unique name,
//! 3. replace the launch with a `gpu.launch_func` and fold constants,
//! 4. move the kernel body into a copy of the kernel wrapped in a fresh
//!    `gpu.kernel_module`, leaving the top-level kernel as a declaration.
//!
//! Launches nested inside another launch body are outlined first, so the
//! outer kernel ends up holding a `gpu.launch_func` instead of a launch.

use kir_core::attr::{Attribute, KERNEL_MODULE_ATTR};
use kir_core::builder::OpBuilder;
use kir_core::id::OpId;
use kir_core::symbol::SymbolTable;
use kir_core::{InsertPoint, Program};
use serde::{Deserialize, Serialize};

use crate::constants::inline_constants;
use crate::error::{OutlineError, PassError};
use crate::extract::outline_kernel_func;
use crate::pass::Pass;
use crate::OutlineOptions;

/// What became of one outlined launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlinedKernel {
    /// Final, unique kernel name.
    pub name: String,
    /// Function the launch was taken from.
    pub enclosing: OpId,
    /// Top-level declaration carrying the kernel signature.
    pub declaration: OpId,
    /// The `gpu.kernel_module` holding the kernel.
    pub container: OpId,
    /// The kernel definition inside the container.
    pub kernel: OpId,
    /// The `gpu.launch_func` that replaced the launch.
    pub launch_func: OpId,
    /// Number of constant operands folded into the kernel.
    pub folded: usize,
}

/// Outlines every launch in the functions of `module`, innermost first.
pub fn outline_module(
    program: &mut Program,
    module: OpId,
    options: &OutlineOptions,
) -> Result<Vec<OutlinedKernel>, OutlineError> {
    let body = program.module_body(module)?;
    let funcs = program.module_functions(module)?;
    let mut symbols = SymbolTable::build(program, module)?;
    let mut outlined = Vec::new();

    for func in funcs {
        let launches = collect_launches(program, func)?;
        if launches.is_empty() {
            continue;
        }
        // Everything extracted from `func` lands right after it, in order.
        let point = match program.next_op(func)? {
            Some(next) => InsertPoint::Before(next),
            None => InsertPoint::End(body),
        };
        tracing::debug!(
            func = program.func_name(func)?,
            launches = launches.len(),
            "outlining function"
        );
        for launch in launches {
            let kernel = outline_launch(program, &mut symbols, func, launch, point, options)?;
            outlined.push(kernel);
        }
    }
    Ok(outlined)
}

/// Launches inside `func` in post-order: every launch comes after the
/// launches nested in its body and before the launches that follow it.
fn collect_launches(program: &Program, func: OpId) -> Result<Vec<OpId>, OutlineError> {
    let mut launches = Vec::new();
    collect_launches_into(program, func, &mut launches)?;
    Ok(launches)
}

fn collect_launches_into(
    program: &Program,
    op: OpId,
    launches: &mut Vec<OpId>,
) -> Result<(), OutlineError> {
    for nested in program.nested_ops(op)? {
        collect_launches_into(program, nested, launches)?;
        if program.kind(nested)?.is_launch() {
            launches.push(nested);
        }
    }
    Ok(())
}

fn outline_launch(
    program: &mut Program,
    symbols: &mut SymbolTable,
    func: OpId,
    launch: OpId,
    point: InsertPoint,
    options: &OutlineOptions,
) -> Result<OutlinedKernel, OutlineError> {
    let grid = program.launch_grid_operands(launch)?;
    let block = program.launch_block_operands(launch)?;
    let data = program.launch_data_operands(launch)?;

    let declaration = outline_kernel_func(program, launch, options)?;
    let name = symbols.insert(program, declaration, point)?;

    let mut launch_func =
        OpBuilder::before(program, launch).launch_func(&name, grid, block, &data)?;
    program.erase_op(launch)?;
    if options.inline_constants {
        launch_func = inline_constants(program, declaration, launch_func)?;
    }
    let folded = data.len() - program.launch_data_operands(launch_func)?.len();

    let kernel = program.clone_op_without_regions(declaration)?;
    let from = program.func_body(declaration)?;
    let to = program.func_body(kernel)?;
    program.take_body(to, from)?;

    let container = program.create_module(None)?;
    program.set_attr(container, KERNEL_MODULE_ATTR, Attribute::Unit)?;
    program.push_back(container, kernel)?;
    program.insert_op(container, point)?;

    tracing::info!(
        kernel = %name,
        func = program.func_name(func)?,
        folded,
        "outlined gpu.launch"
    );
    Ok(OutlinedKernel {
        name,
        enclosing: func,
        declaration,
        container,
        kernel,
        launch_func,
        folded,
    })
}

/// Pass wrapper around [`outline_module`] for the root module.
#[derive(Debug, Clone, Default)]
pub struct GpuKernelOutliningPass {
    options: OutlineOptions,
}

impl GpuKernelOutliningPass {
    pub const NAME: &'static str = "gpu-kernel-outlining";
    pub const DESCRIPTION: &'static str = "Outline gpu.launch bodies to kernel functions.";

    pub fn new(options: OutlineOptions) -> Self {
        GpuKernelOutliningPass { options }
    }
}

impl Pass for GpuKernelOutliningPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn run(&mut self, program: &mut Program) -> Result<(), PassError> {
        let root = program.root();
        outline_module(program, root, &self.options)?;
        Ok(())
    }
}
