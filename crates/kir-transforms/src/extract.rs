//! Kernel extraction: turning a `gpu.launch` body into a function.

use std::collections::HashSet;

use kir_core::attr::{Attribute, KERNEL_FUNC_ATTR};
use kir_core::builder::OpBuilder;
use kir_core::id::{BlockId, OpId};
use kir_core::ops::{GpuOp, OpKind};
use kir_core::types::{FunctionType, Type};
use kir_core::value::Value;
use kir_core::Program;

use crate::error::OutlineError;
use crate::index_ops::inject_gpu_index_operations;
use crate::OutlineOptions;

/// Moves the body of `launch` into a new detached kernel function.
///
/// The function is named after the enclosing function plus
/// `options.kernel_suffix`, takes the launch's data operand types and
/// returns nothing. It is marked `gpu.kernel`, its 12 leading index
/// arguments are replaced by coordinate ops and every `gpu.return` directly
/// in its body becomes a plain `return`. The launch is left with an empty
/// region; the caller still has to rewrite and erase it.
pub fn outline_kernel_func(
    program: &mut Program,
    launch: OpId,
    options: &OutlineOptions,
) -> Result<OpId, OutlineError> {
    if !program.kind(launch)?.is_launch() {
        return Err(OutlineError::contract(launch, "expected a gpu.launch"));
    }
    if !program.op(launch)?.result_types.is_empty() {
        return Err(OutlineError::contract(launch, "gpu.launch must not produce results"));
    }

    let body = program.launch_body(launch)?;
    let entry = program
        .region(body)?
        .blocks
        .first()
        .copied()
        .ok_or_else(|| OutlineError::contract(launch, "gpu.launch body has no entry block"))?;
    let data = program.launch_data_operands(launch)?;
    let arg_types = program.argument_types(entry)?;
    if arg_types.len() != GpuOp::NUM_INDEX_ARGUMENTS + data.len() {
        return Err(OutlineError::contract(
            launch,
            format!(
                "body takes {} arguments for {} data operands",
                arg_types.len(),
                data.len()
            ),
        ));
    }
    check_body_signature(program, launch, &arg_types, &data)?;
    check_isolated(program, launch)?;

    let enclosing = program
        .enclosing_op_where(launch, OpKind::is_func)?
        .ok_or_else(|| OutlineError::contract(launch, "gpu.launch is not inside a function"))?;
    let name = format!("{}{}", program.func_name(enclosing)?, options.kernel_suffix);

    // Start from the full body signature so it matches the entry block at
    // every step; index injection trims it down to the data operands.
    let mut inputs = vec![Type::Index; GpuOp::NUM_INDEX_ARGUMENTS];
    for value in &data {
        inputs.push(program.value_type(*value)?.clone());
    }
    let kernel = program.create_func(&name, FunctionType::new(inputs, Vec::new()))?;
    let kernel_body = program.func_body(kernel)?;
    program.take_body(kernel_body, body)?;
    program.set_attr(kernel, KERNEL_FUNC_ATTR, Attribute::Unit)?;

    inject_gpu_index_operations(program, kernel)?;
    replace_gpu_returns(program, kernel)?;

    tracing::debug!(kernel = %name, launch = %launch, "extracted launch body");
    Ok(kernel)
}

/// Replaces each `gpu.return` terminating a block of `func` with `return`.
/// Terminators of launches nested in the body are left alone.
fn replace_gpu_returns(program: &mut Program, func: OpId) -> Result<(), OutlineError> {
    let mut terminators = Vec::new();
    for block in program.op_blocks(func)? {
        for &op in &program.block(block)?.ops {
            if matches!(program.kind(op)?, OpKind::Gpu(GpuOp::Return)) {
                terminators.push(op);
            }
        }
    }
    for op in terminators {
        OpBuilder::before(program, op).ret(&[])?;
        program.erase_op(op)?;
    }
    Ok(())
}

/// Fails unless the body takes 12 index arguments followed by exactly the
/// types of the data operands.
fn check_body_signature(
    program: &Program,
    launch: OpId,
    arg_types: &[Type],
    data: &[Value],
) -> Result<(), OutlineError> {
    let (index_args, data_args) = arg_types.split_at(GpuOp::NUM_INDEX_ARGUMENTS);
    if let Some(position) = index_args.iter().position(|ty| *ty != Type::Index) {
        return Err(OutlineError::contract(
            launch,
            format!(
                "body argument #{} has type {}, expected index",
                position, index_args[position]
            ),
        ));
    }
    for (i, (value, arg_type)) in data.iter().zip(data_args).enumerate() {
        let operand_type = program.value_type(*value)?;
        if operand_type != arg_type {
            return Err(OutlineError::contract(
                launch,
                format!(
                    "data operand #{} has type {}, body argument has type {}",
                    i, operand_type, arg_type
                ),
            ));
        }
    }
    Ok(())
}

/// Fails if an op inside `launch` uses a value defined outside of it.
fn check_isolated(program: &Program, launch: OpId) -> Result<(), OutlineError> {
    let nested = program.walk(launch)?;
    let ops: HashSet<OpId> = nested.iter().copied().filter(|&op| op != launch).collect();
    let mut blocks: HashSet<BlockId> = HashSet::new();
    for &op in &nested {
        blocks.extend(program.op_blocks(op)?);
    }

    for &op in &ops {
        for value in program.operands(op)? {
            let inside = match value {
                Value::Result { op: def, .. } => ops.contains(&def),
                Value::Argument(arg) => blocks.contains(&program.argument(arg)?.owner),
            };
            if !inside {
                return Err(OutlineError::contract(
                    op,
                    format!("gpu.launch body uses {:?} defined outside the launch", value),
                ));
            }
        }
    }
    Ok(())
}
