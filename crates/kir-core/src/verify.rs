//! Structural verifier.
//!
//! [`verify_program`] walks the whole program and reports ALL violations at
//! once rather than stopping at the first. An empty `Vec` means the program
//! is well formed. Checks:
//!
//! - function signatures agree with their entry block arguments
//! - terminators: every func and launch body block ends with the matching
//!   terminator, and terminators appear nowhere else
//! - `return` operands match the function's result types
//! - symbol names are unique within each module
//! - `gpu.launch` operand and body layout
//! - `gpu.launch_func` resolves to a `gpu.kernel` function whose inputs
//!   match the data operands
//! - no op inside an isolated op (module, func, launch) uses a value defined
//!   outside of it

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attr::KERNEL_FUNC_ATTR;
use crate::error::CoreError;
use crate::graph::Program;
use crate::id::{BlockId, OpId};
use crate::ops::{GpuOp, OpKind};
use crate::types::Type;
use crate::value::Value;

/// A structural violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum VerifyError {
    /// The `type` attribute disagrees with the entry block arguments.
    #[error("function '{name}' ({func}): signature inputs {signature:?} do not match entry block arguments {entry:?}")]
    SignatureMismatch {
        func: OpId,
        name: String,
        signature: Vec<Type>,
        entry: Vec<Type>,
    },

    /// A body block does not end with a terminator.
    #[error("block {block} of {owner} does not end with a terminator")]
    MissingTerminator { block: BlockId, owner: OpId },

    /// A terminator is not the last op of its block, or sits in the wrong
    /// kind of body.
    #[error("misplaced terminator {op}: {reason}")]
    MisplacedTerminator { op: OpId, reason: String },

    /// `return` operands disagree with the function result types.
    #[error("return {op} yields {actual:?}, function expects {expected:?}")]
    ReturnMismatch {
        op: OpId,
        expected: Vec<Type>,
        actual: Vec<Type>,
    },

    /// Two ops in one module share a symbol name.
    #[error("duplicate symbol '{name}' in module {module}")]
    DuplicateSymbol { module: OpId, name: String },

    /// A `gpu.launch` or `gpu.launch_func` has a bad layout.
    #[error("malformed launch {op}: {reason}")]
    MalformedLaunch { op: OpId, reason: String },

    /// A `gpu.launch_func` names a kernel that cannot be found.
    #[error("launch {op} references unknown kernel '{kernel}'")]
    UnresolvedKernel { op: OpId, kernel: String },

    /// A `gpu.launch_func` targets a function without the kernel marker.
    #[error("launch {op} targets '{kernel}', which is not marked {marker}", marker = KERNEL_FUNC_ATTR)]
    NotAKernel { op: OpId, kernel: String },

    /// A `gpu.launch_func` passes data operands the kernel does not accept.
    #[error("launch {op} passes {actual:?} to kernel '{kernel}' expecting {expected:?}")]
    KernelArgumentMismatch {
        op: OpId,
        kernel: String,
        expected: Vec<Type>,
        actual: Vec<Type>,
    },

    /// An op uses a value defined outside its isolated ancestor.
    #[error("op {user} uses {value:?} defined outside isolated op {isolated}")]
    IsolationViolation {
        user: OpId,
        value: Value,
        isolated: OpId,
    },

    /// The program's own bookkeeping could not be traversed.
    #[error("structure error: {reason}")]
    Structure { reason: String },
}

impl From<CoreError> for VerifyError {
    fn from(err: CoreError) -> Self {
        VerifyError::Structure {
            reason: err.to_string(),
        }
    }
}

/// Verifies the whole program, reporting every violation found.
pub fn verify_program(program: &Program) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    let ops = match program.walk(program.root()) {
        Ok(ops) => ops,
        Err(err) => return vec![err.into()],
    };

    for op in ops {
        if let Err(err) = verify_op(program, op, &mut errors) {
            errors.push(err.into());
        }
    }
    errors
}

fn verify_op(program: &Program, op: OpId, errors: &mut Vec<VerifyError>) -> Result<(), CoreError> {
    let kind = program.kind(op)?.clone();
    match &kind {
        OpKind::Module => verify_symbols(program, op, errors)?,
        OpKind::Func => verify_func(program, op, errors)?,
        OpKind::Return => verify_return(program, op, errors)?,
        OpKind::Gpu(GpuOp::Launch) => verify_launch(program, op, errors)?,
        OpKind::Gpu(GpuOp::LaunchFunc) => verify_launch_func(program, op, errors)?,
        _ => {}
    }

    if kind.is_terminator() {
        verify_terminator_placement(program, op, &kind, errors)?;
    }
    verify_isolation(program, op, errors)
}

fn verify_symbols(
    program: &Program,
    module: OpId,
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    let mut seen: HashMap<&str, OpId> = HashMap::new();
    for op in program.module_ops(module)? {
        if let Some(name) = program.symbol_name(op)? {
            if seen.insert(name, op).is_some() {
                errors.push(VerifyError::DuplicateSymbol {
                    module,
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn verify_func(
    program: &Program,
    func: OpId,
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    let Some(entry) = program.entry_block(func)? else {
        return Ok(());
    };
    let signature = program.func_type(func)?.inputs.clone();
    let entry_types = program.argument_types(entry)?;
    if signature != entry_types {
        errors.push(VerifyError::SignatureMismatch {
            func,
            name: program.func_name(func)?.to_string(),
            signature,
            entry: entry_types,
        });
    }
    verify_body_terminators(program, func, errors)
}

fn verify_body_terminators(
    program: &Program,
    owner: OpId,
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    for block in program.op_blocks(owner)? {
        let last = program.block(block)?.ops.last().copied();
        let terminated = match last {
            Some(op) => program.kind(op)?.is_terminator(),
            None => false,
        };
        if !terminated {
            errors.push(VerifyError::MissingTerminator { block, owner });
        }
    }
    Ok(())
}

fn verify_terminator_placement(
    program: &Program,
    op: OpId,
    kind: &OpKind,
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    let Some(block) = program.parent_block(op)? else {
        return Ok(());
    };
    if program.block(block)?.ops.last() != Some(&op) {
        errors.push(VerifyError::MisplacedTerminator {
            op,
            reason: "terminator is not the last op of its block".into(),
        });
    }

    let Some(owner) = program.parent_op(op)? else {
        return Ok(());
    };
    let owner_kind = program.kind(owner)?;
    let expected = match kind {
        OpKind::Gpu(GpuOp::Return) => owner_kind.is_launch(),
        _ => owner_kind.is_func(),
    };
    if !expected {
        errors.push(VerifyError::MisplacedTerminator {
            op,
            reason: format!("{} cannot terminate a {} body", kind.name(), owner_kind.name()),
        });
    }
    Ok(())
}

fn verify_return(program: &Program, op: OpId, errors: &mut Vec<VerifyError>) -> Result<(), CoreError> {
    let Some(owner) = program.parent_op(op)? else {
        return Ok(());
    };
    if !program.kind(owner)?.is_func() {
        return Ok(());
    }
    let expected = program.func_type(owner)?.results.clone();
    let actual = program
        .operands(op)?
        .into_iter()
        .map(|v| program.value_type(v).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    if expected != actual {
        errors.push(VerifyError::ReturnMismatch {
            op,
            expected,
            actual,
        });
    }
    Ok(())
}

fn verify_launch(program: &Program, op: OpId, errors: &mut Vec<VerifyError>) -> Result<(), CoreError> {
    let operands = program.operands(op)?;
    if operands.len() < GpuOp::NUM_CONFIG_OPERANDS {
        errors.push(VerifyError::MalformedLaunch {
            op,
            reason: format!(
                "{} operands, at least {} required",
                operands.len(),
                GpuOp::NUM_CONFIG_OPERANDS
            ),
        });
        return Ok(());
    }
    check_config_operands(program, op, &operands, errors)?;

    let blocks = program.op_blocks(op)?;
    let Some(&entry) = blocks.first() else {
        errors.push(VerifyError::MalformedLaunch {
            op,
            reason: "body has no entry block".into(),
        });
        return Ok(());
    };

    let data = &operands[GpuOp::NUM_CONFIG_OPERANDS..];
    let arg_types = program.argument_types(entry)?;
    if arg_types.len() != GpuOp::NUM_INDEX_ARGUMENTS + data.len() {
        errors.push(VerifyError::MalformedLaunch {
            op,
            reason: format!(
                "body takes {} arguments, expected {} index arguments and {} data arguments",
                arg_types.len(),
                GpuOp::NUM_INDEX_ARGUMENTS,
                data.len()
            ),
        });
        return Ok(());
    }
    if let Some(position) = arg_types[..GpuOp::NUM_INDEX_ARGUMENTS]
        .iter()
        .position(|ty| *ty != Type::Index)
    {
        errors.push(VerifyError::MalformedLaunch {
            op,
            reason: format!("index argument #{} is not of type index", position),
        });
    }
    for (i, value) in data.iter().enumerate() {
        let operand_type = program.value_type(*value)?;
        let arg_type = &arg_types[GpuOp::NUM_INDEX_ARGUMENTS + i];
        if operand_type != arg_type {
            errors.push(VerifyError::MalformedLaunch {
                op,
                reason: format!(
                    "data operand #{} has type {}, body argument has type {}",
                    i, operand_type, arg_type
                ),
            });
        }
    }

    verify_body_terminators(program, op, errors)
}

fn check_config_operands(
    program: &Program,
    op: OpId,
    operands: &[Value],
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    for (i, value) in operands[..GpuOp::NUM_CONFIG_OPERANDS].iter().enumerate() {
        let ty = program.value_type(*value)?;
        if *ty != Type::Index {
            errors.push(VerifyError::MalformedLaunch {
                op,
                reason: format!("configuration operand #{} has type {}, expected index", i, ty),
            });
        }
    }
    Ok(())
}

/// Resolves a kernel name from the nearest enclosing module outward.
/// Definitions inside nested kernel modules win over same-named
/// declarations at the same level.
pub fn resolve_kernel(program: &Program, op: OpId, kernel: &str) -> Result<Option<OpId>, CoreError> {
    let mut scope = program.enclosing_op_where(op, OpKind::is_module)?;
    while let Some(module) = scope {
        let siblings = program.module_ops(module)?;
        let mut declared = None;
        for &sibling in &siblings {
            if program.kind(sibling)?.is_module() {
                if let Some(found) = program.lookup_function(sibling, kernel)? {
                    return Ok(Some(found));
                }
            } else if declared.is_none()
                && program.kind(sibling)?.is_func()
                && program.symbol_name(sibling)? == Some(kernel)
            {
                declared = Some(sibling);
            }
        }
        if declared.is_some() {
            return Ok(declared);
        }
        scope = program.enclosing_op_where(module, OpKind::is_module)?;
    }
    Ok(None)
}

fn verify_launch_func(
    program: &Program,
    op: OpId,
    errors: &mut Vec<VerifyError>,
) -> Result<(), CoreError> {
    let operands = program.operands(op)?;
    if operands.len() < GpuOp::NUM_CONFIG_OPERANDS {
        errors.push(VerifyError::MalformedLaunch {
            op,
            reason: format!(
                "{} operands, at least {} required",
                operands.len(),
                GpuOp::NUM_CONFIG_OPERANDS
            ),
        });
        return Ok(());
    }
    check_config_operands(program, op, &operands, errors)?;

    let kernel = match program.launch_func_kernel(op) {
        Ok(kernel) => kernel.to_string(),
        Err(_) => {
            errors.push(VerifyError::MalformedLaunch {
                op,
                reason: "missing kernel symbol".into(),
            });
            return Ok(());
        }
    };
    let Some(callee) = resolve_kernel(program, op, &kernel)? else {
        errors.push(VerifyError::UnresolvedKernel { op, kernel });
        return Ok(());
    };

    if !program.has_attr(callee, KERNEL_FUNC_ATTR) {
        errors.push(VerifyError::NotAKernel {
            op,
            kernel: kernel.clone(),
        });
    }
    let expected = program.func_type(callee)?.inputs.clone();
    let actual = operands[GpuOp::NUM_CONFIG_OPERANDS..]
        .iter()
        .map(|v| program.value_type(*v).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    if expected != actual {
        errors.push(VerifyError::KernelArgumentMismatch {
            op,
            kernel,
            expected,
            actual,
        });
    }
    Ok(())
}

/// The op whose region holds the definition of `value`. `None` if the
/// definition is detached.
fn defining_scope(program: &Program, value: Value) -> Result<Option<OpId>, CoreError> {
    match value {
        Value::Result { op, .. } => program.parent_op(op),
        Value::Argument(arg) => {
            let owner = program.argument(arg)?.owner;
            let region = program.block(owner)?.parent;
            Ok(Some(program.region(region)?.parent))
        }
    }
}

fn is_ancestor_or_self(program: &Program, ancestor: OpId, op: OpId) -> Result<bool, CoreError> {
    let mut current = Some(op);
    while let Some(candidate) = current {
        if candidate == ancestor {
            return Ok(true);
        }
        current = program.parent_op(candidate)?;
    }
    Ok(false)
}

fn verify_isolation(program: &Program, op: OpId, errors: &mut Vec<VerifyError>) -> Result<(), CoreError> {
    let Some(isolated) = program.enclosing_op_where(op, OpKind::is_isolated_from_above)? else {
        return Ok(());
    };
    for value in program.operands(op)? {
        let inside = match defining_scope(program, value)? {
            Some(scope) => is_ancestor_or_self(program, isolated, scope)?,
            None => false,
        };
        if !inside {
            errors.push(VerifyError::IsolationViolation {
                user: op,
                value,
                isolated,
            });
        }
    }
    Ok(())
}
