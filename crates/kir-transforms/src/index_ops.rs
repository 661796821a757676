//! Index-operand injection.
//!
//! A freshly extracted kernel still takes the launch body's 12 leading index
//! arguments. [`inject_gpu_index_operations`] replaces them with locally
//! computed coordinates and drops them from the signature.

use kir_core::builder::OpBuilder;
use kir_core::id::OpId;
use kir_core::ops::{Dimension, GpuOp};
use kir_core::types::Type;
use kir_core::value::Value;
use kir_core::Program;
use smallvec::SmallVec;

use crate::error::OutlineError;

/// The 12 coordinate ops in argument order: block id, thread id, grid
/// dimension, block dimension, each along x, y, z.
pub fn index_op_sequence() -> [GpuOp; GpuOp::NUM_INDEX_ARGUMENTS] {
    let categories: [fn(Dimension) -> GpuOp; 4] = [
        |dimension| GpuOp::BlockId { dimension },
        |dimension| GpuOp::ThreadId { dimension },
        |dimension| GpuOp::GridDim { dimension },
        |dimension| GpuOp::BlockDim { dimension },
    ];
    let mut ops = [GpuOp::Return; GpuOp::NUM_INDEX_ARGUMENTS];
    let sequence = categories
        .iter()
        .flat_map(|make| Dimension::ALL.iter().map(move |&dim| make(dim)));
    for (slot, op) in ops.iter_mut().zip(sequence) {
        *slot = op;
    }
    ops
}

/// Inserts the 12 coordinate ops at the head of `func`'s entry block,
/// rewires every use of the first 12 formal arguments to them and erases
/// those arguments.
pub fn inject_gpu_index_operations(program: &mut Program, func: OpId) -> Result<(), OutlineError> {
    let entry = program.expect_entry_block(func)?;
    let args = program.block_arguments(entry)?;
    if args.len() < GpuOp::NUM_INDEX_ARGUMENTS {
        return Err(OutlineError::contract(
            func,
            format!(
                "kernel has {} arguments, expected at least {} index arguments",
                args.len(),
                GpuOp::NUM_INDEX_ARGUMENTS
            ),
        ));
    }
    for (i, arg) in args[..GpuOp::NUM_INDEX_ARGUMENTS].iter().enumerate() {
        let ty = program.value_type(*arg)?;
        if *ty != Type::Index {
            return Err(OutlineError::contract(
                func,
                format!("argument #{} has type {}, expected index", i, ty),
            ));
        }
    }

    let mut builder = OpBuilder::at_block_start(program, entry)?;
    let mut index_values: SmallVec<[Value; GpuOp::NUM_INDEX_ARGUMENTS]> = SmallVec::new();
    for op in index_op_sequence() {
        index_values.push(builder.index_op(op)?);
    }

    for (arg, value) in args.iter().zip(&index_values) {
        program.replace_all_uses_with(*arg, *value)?;
    }
    let indices: Vec<usize> = (0..GpuOp::NUM_INDEX_ARGUMENTS).collect();
    program.erase_function_arguments(func, &indices)?;

    tracing::trace!(func = %func, "injected gpu index operations");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kir_core::ops::{ArithOp, OpKind};
    use kir_core::types::FunctionType;

    fn kernel_with_args(extra: Vec<Type>) -> (Program, OpId) {
        let mut program = Program::new();
        let mut inputs = vec![Type::Index; GpuOp::NUM_INDEX_ARGUMENTS];
        inputs.extend(extra);
        let (func, _) = program
            .create_func_with_body("k", FunctionType::new(inputs, vec![]))
            .unwrap();
        (program, func)
    }

    #[test]
    fn sequence_is_category_major_axis_minor() {
        let seq = index_op_sequence();
        assert_eq!(seq[0], GpuOp::BlockId { dimension: Dimension::X });
        assert_eq!(seq[2], GpuOp::BlockId { dimension: Dimension::Z });
        assert_eq!(seq[3], GpuOp::ThreadId { dimension: Dimension::X });
        assert_eq!(seq[7], GpuOp::GridDim { dimension: Dimension::Y });
        assert_eq!(seq[11], GpuOp::BlockDim { dimension: Dimension::Z });
        assert!(seq.iter().all(GpuOp::is_index_op));
    }

    #[test]
    fn injects_twelve_ops_and_rewires_uses() {
        let (mut program, func) = kernel_with_args(vec![Type::F32]);
        let entry = program.expect_entry_block(func).unwrap();
        let tid_x = program.block_argument(entry, 3).unwrap();
        let bdim_z = program.block_argument(entry, 11).unwrap();
        let data = program.block_argument(entry, 12).unwrap();

        let mut b = OpBuilder::at_block_end(&mut program, entry).unwrap();
        let sum = b.arith(ArithOp::Add, tid_x, bdim_z).unwrap();
        let ret = b.ret(&[]).unwrap();

        inject_gpu_index_operations(&mut program, func).unwrap();

        let ops = program.block(entry).unwrap().ops.clone();
        assert_eq!(ops.len(), 14);
        for (op, expected) in ops.iter().zip(index_op_sequence()) {
            assert_eq!(program.kind(*op).unwrap(), &OpKind::Gpu(expected));
        }
        assert_eq!(ops[13], ret);

        let add = sum.defining_op().unwrap();
        assert_eq!(
            program.operands(add).unwrap(),
            vec![Value::result(ops[3]), Value::result(ops[11])]
        );
        assert_eq!(program.block_arguments(entry).unwrap(), vec![data]);
        assert_eq!(program.func_type(func).unwrap().inputs, vec![Type::F32]);
    }

    #[test]
    fn empty_body_gets_index_ops() {
        let (mut program, func) = kernel_with_args(vec![]);
        inject_gpu_index_operations(&mut program, func).unwrap();
        let entry = program.expect_entry_block(func).unwrap();
        assert_eq!(program.block(entry).unwrap().ops.len(), 12);
        assert!(program.func_type(func).unwrap().inputs.is_empty());
    }

    #[test]
    fn too_few_arguments_is_a_contract_violation() {
        let mut program = Program::new();
        let (func, entry) = program
            .create_func_with_body("k", FunctionType::new(vec![Type::Index; 11], vec![]))
            .unwrap();
        let err = inject_gpu_index_operations(&mut program, func).unwrap_err();
        assert!(matches!(err, OutlineError::ContractViolation { op, .. } if op == func));
        // Nothing was inserted.
        assert!(program.block(entry).unwrap().ops.is_empty());
    }

    #[test]
    fn non_index_leading_argument_is_rejected() {
        let mut program = Program::new();
        let mut inputs = vec![Type::Index; GpuOp::NUM_INDEX_ARGUMENTS];
        inputs[5] = Type::I32;
        let (func, _) = program
            .create_func_with_body("k", FunctionType::new(inputs, vec![]))
            .unwrap();
        assert!(matches!(
            inject_gpu_index_operations(&mut program, func),
            Err(OutlineError::ContractViolation { .. })
        ));
    }

    #[test]
    fn declaration_is_rejected() {
        let mut program = Program::new();
        let func = program
            .create_func("k", FunctionType::new(vec![Type::Index; 12], vec![]))
            .unwrap();
        program.push_back(program.root(), func).unwrap();
        assert!(matches!(
            inject_gpu_index_operations(&mut program, func),
            Err(OutlineError::Core(_))
        ));
    }
}
