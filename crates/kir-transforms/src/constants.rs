//! Folding constant launch operands into the kernel.
//!
//! Every data operand of a `gpu.launch_func` that is produced by a constant
//! op is cloned into the kernel's entry block, and the matching kernel
//! parameter and launch operand are dropped.

use kir_core::builder::OpBuilder;
use kir_core::id::OpId;
use kir_core::value::Value;
use kir_core::Program;
use smallvec::SmallVec;

use crate::error::OutlineError;

/// Folds the constant data operands of `launch_func` into `kernel_func`.
///
/// Operands are visited from last to first so erasing a parameter never
/// shifts one still to be visited. Returns `launch_func` itself when nothing
/// was folded; otherwise a replacement launch with the remaining operands is
/// created right before it and the original is erased.
pub fn inline_constants(
    program: &mut Program,
    kernel_func: OpId,
    launch_func: OpId,
) -> Result<OpId, OutlineError> {
    let entry = program.expect_entry_block(kernel_func)?;
    let data = program.launch_data_operands(launch_func)?;
    let arity = program.block(entry)?.args.len();
    if arity != data.len() {
        return Err(OutlineError::contract(
            launch_func,
            format!(
                "launch passes {} data operands, kernel takes {} arguments",
                data.len(),
                arity
            ),
        ));
    }

    // All types are checked before the kernel is mutated.
    let mut constants = Vec::with_capacity(data.len());
    for (index, operand) in data.iter().enumerate() {
        let constant = program
            .defining_op(*operand)
            .filter(|&op| matches!(program.kind(op), Ok(kind) if kind.as_constant().is_some()));
        if constant.is_some() {
            let operand_type = program.value_type(*operand)?;
            let arg_type = program.value_type(program.block_argument(entry, index)?)?;
            if operand_type != arg_type {
                return Err(OutlineError::contract(
                    launch_func,
                    format!(
                        "constant operand #{} has type {}, kernel argument has type {}",
                        index, operand_type, arg_type
                    ),
                ));
            }
        }
        constants.push(constant);
    }

    let mut kept: SmallVec<[Value; 8]> = SmallVec::new();
    let mut folded = 0usize;
    for (index, operand) in data.iter().enumerate().rev() {
        let Some(constant) = constants[index] else {
            kept.push(*operand);
            continue;
        };

        let arg = program.block_argument(entry, index)?;
        let clone = OpBuilder::at_block_start(program, entry)?.clone_op(constant)?;
        program.replace_all_uses_with(arg, Value::result(clone))?;
        program.erase_function_argument(kernel_func, index)?;
        folded += 1;
    }

    if folded == 0 {
        return Ok(launch_func);
    }

    kept.reverse();
    program.sync_function_type_from_entry(kernel_func)?;

    let grid = program.launch_grid_operands(launch_func)?;
    let block = program.launch_block_operands(launch_func)?;
    let kernel = program.launch_func_kernel(launch_func)?.to_string();
    let replacement = OpBuilder::before(program, launch_func).launch_func(&kernel, grid, block, &kept)?;
    program.erase_op(launch_func)?;

    let remaining = program.func_type(kernel_func)?.arity();
    if remaining != kept.len() {
        return Err(OutlineError::contract(
            replacement,
            format!(
                "launch passes {} data operands after folding, kernel takes {}",
                kept.len(),
                remaining
            ),
        ));
    }

    tracing::debug!(kernel = %kernel, folded, remaining, "inlined constant launch operands");
    Ok(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kir_core::ops::OpKind;
    use kir_core::types::{ConstValue, FunctionType, ScalarType, Type};
    use proptest::prelude::*;

    /// A kernel `k` taking one argument per entry of `consts`, each returned
    /// through a store so every argument has a use, and a caller `f` whose
    /// launch passes a constant where `consts[i]` is `Some` and an `f`
    /// parameter otherwise.
    struct Fixture {
        program: Program,
        kernel: OpId,
        launch: OpId,
        caller_args: Vec<Value>,
    }

    fn fixture(consts: &[Option<i32>]) -> Fixture {
        let mut program = Program::new();
        let root = program.root();
        let buffer = Type::dynamic_memref(ScalarType::I32);

        let inputs = vec![Type::I32; consts.len()];
        let mut kernel_inputs = inputs.clone();
        kernel_inputs.push(buffer.clone());
        let (kernel, kernel_entry) = program
            .create_func_with_body("k", FunctionType::new(kernel_inputs, vec![]))
            .unwrap();
        program.push_back(root, kernel).unwrap();
        let out = program.block_argument(kernel_entry, consts.len()).unwrap();
        let kernel_args = program.block_arguments(kernel_entry).unwrap();
        let mut b = OpBuilder::at_block_end(&mut program, kernel_entry).unwrap();
        let zero = b.constant(ConstValue::Index(0)).unwrap();
        for arg in &kernel_args[..consts.len()] {
            b.store(*arg, out, &[zero]).unwrap();
        }
        b.ret(&[]).unwrap();

        let mut caller_inputs = inputs;
        caller_inputs.push(buffer);
        let (caller, entry) = program
            .create_func_with_body("f", FunctionType::new(caller_inputs, vec![]))
            .unwrap();
        program.push_back(root, caller).unwrap();
        let params = program.block_arguments(entry).unwrap();
        let mut b = OpBuilder::at_block_end(&mut program, entry).unwrap();
        let one = b.constant(ConstValue::Index(1)).unwrap();
        let mut caller_args = Vec::new();
        for (i, c) in consts.iter().enumerate() {
            let value = match c {
                Some(v) => b.constant(ConstValue::I32(*v)).unwrap(),
                None => params[i],
            };
            caller_args.push(value);
        }
        caller_args.push(params[consts.len()]);
        let launch = b
            .launch_func("k", [one, one, one], [one, one, one], &caller_args)
            .unwrap();
        b.ret(&[]).unwrap();

        Fixture {
            program,
            kernel,
            launch,
            caller_args,
        }
    }

    #[test]
    fn no_constants_returns_same_launch() {
        let Fixture {
            mut program,
            kernel,
            launch,
            caller_args,
        } = fixture(&[None, None]);
        let before = program.op_count();

        let result = inline_constants(&mut program, kernel, launch).unwrap();
        assert_eq!(result, launch);
        assert_eq!(program.op_count(), before);
        assert_eq!(program.launch_data_operands(result).unwrap(), caller_args);

        // Idempotent.
        assert_eq!(inline_constants(&mut program, kernel, result).unwrap(), launch);
    }

    #[test]
    fn folds_constants_and_preserves_order() {
        let Fixture {
            mut program,
            kernel,
            launch,
            caller_args,
        } = fixture(&[None, Some(42), None, Some(7)]);
        let grid = program.launch_grid_operands(launch).unwrap();

        let result = inline_constants(&mut program, kernel, launch).unwrap();
        assert_ne!(result, launch);
        assert!(!program.contains_op(launch));
        assert_eq!(
            program.launch_data_operands(result).unwrap(),
            vec![caller_args[0], caller_args[2], caller_args[4]]
        );
        assert_eq!(program.launch_grid_operands(result).unwrap(), grid);
        assert_eq!(program.launch_func_kernel(result).unwrap(), "k");

        let ty = program.func_type(kernel).unwrap();
        assert_eq!(
            ty.inputs,
            vec![Type::I32, Type::I32, Type::dynamic_memref(ScalarType::I32)]
        );

        // The cloned constants sit at the head of the kernel entry block and
        // feed the stores that used the folded arguments.
        let entry = program.expect_entry_block(kernel).unwrap();
        let ops = program.block(entry).unwrap().ops.clone();
        let literals: Vec<ConstValue> = ops[..2]
            .iter()
            .map(|op| program.kind(*op).unwrap().as_constant().cloned().unwrap())
            .collect();
        assert_eq!(literals, vec![ConstValue::I32(42), ConstValue::I32(7)]);
        let stored: Vec<Value> = ops
            .iter()
            .filter(|op| matches!(program.kind(**op).unwrap(), OpKind::Store))
            .map(|op| program.operands(*op).unwrap()[0])
            .collect();
        assert_eq!(stored[1], Value::result(ops[0]));
        assert_eq!(stored[3], Value::result(ops[1]));
    }

    #[test]
    fn mismatched_arity_is_a_contract_violation() {
        let Fixture {
            mut program,
            kernel,
            launch,
            ..
        } = fixture(&[Some(1)]);
        program.erase_op(launch).unwrap();
        let root = program.root();
        let caller = program.lookup_function(root, "f").unwrap().unwrap();
        let entry = program.expect_entry_block(caller).unwrap();
        let ret = *program.block(entry).unwrap().ops.last().unwrap();
        let mut b = OpBuilder::before(&mut program, ret);
        let one = b.constant(ConstValue::Index(1)).unwrap();
        let short = b.launch_func("k", [one, one, one], [one, one, one], &[]).unwrap();

        assert!(matches!(
            inline_constants(&mut program, kernel, short),
            Err(OutlineError::ContractViolation { .. })
        ));
    }

    #[test]
    fn constant_type_mismatch_is_a_contract_violation() {
        let Fixture {
            mut program,
            kernel,
            launch,
            ..
        } = fixture(&[None]);
        program.erase_op(launch).unwrap();
        let root = program.root();
        let caller = program.lookup_function(root, "f").unwrap().unwrap();
        let entry = program.expect_entry_block(caller).unwrap();
        let buf = program.block_argument(entry, 1).unwrap();
        let ret = *program.block(entry).unwrap().ops.last().unwrap();
        let mut b = OpBuilder::before(&mut program, ret);
        let one = b.constant(ConstValue::Index(1)).unwrap();
        let wide = b.constant(ConstValue::I64(5)).unwrap();
        let bad = b
            .launch_func("k", [one, one, one], [one, one, one], &[wide, buf])
            .unwrap();

        assert!(matches!(
            inline_constants(&mut program, kernel, bad),
            Err(OutlineError::ContractViolation { .. })
        ));
    }

    #[test]
    fn type_mismatch_folds_nothing() {
        let Fixture {
            mut program,
            kernel,
            launch,
            ..
        } = fixture(&[None, Some(7)]);
        let seven = program.launch_data_operands(launch).unwrap()[1];
        program.erase_op(launch).unwrap();
        let root = program.root();
        let caller = program.lookup_function(root, "f").unwrap().unwrap();
        let entry = program.expect_entry_block(caller).unwrap();
        let buf = program.block_argument(entry, 2).unwrap();
        let ret = *program.block(entry).unwrap().ops.last().unwrap();
        let mut b = OpBuilder::before(&mut program, ret);
        let one = b.constant(ConstValue::Index(1)).unwrap();
        let wide = b.constant(ConstValue::I64(5)).unwrap();
        let bad = b
            .launch_func("k", [one, one, one], [one, one, one], &[wide, seven, buf])
            .unwrap();

        let kernel_entry = program.expect_entry_block(kernel).unwrap();
        let kernel_ops = program.block(kernel_entry).unwrap().ops.len();
        let inputs = program.func_type(kernel).unwrap().inputs.clone();

        assert!(matches!(
            inline_constants(&mut program, kernel, bad),
            Err(OutlineError::ContractViolation { .. })
        ));
        assert!(program.contains_op(bad));
        assert_eq!(program.func_type(kernel).unwrap().inputs, inputs);
        assert_eq!(program.argument_types(kernel_entry).unwrap(), inputs);
        assert_eq!(program.block(kernel_entry).unwrap().ops.len(), kernel_ops);
    }

    proptest! {
        #[test]
        fn argument_reduction(consts in prop::collection::vec(prop::option::of(any::<i32>()), 0..8)) {
            let Fixture { mut program, kernel, launch, caller_args } = fixture(&consts);
            let k = consts.iter().filter(|c| c.is_some()).count();
            let original_arity = program.func_type(kernel).unwrap().arity();

            let result = inline_constants(&mut program, kernel, launch).unwrap();
            let data = program.launch_data_operands(result).unwrap();

            prop_assert_eq!(data.len(), caller_args.len() - k);
            prop_assert_eq!(program.func_type(kernel).unwrap().arity(), original_arity - k);

            let expected: Vec<Value> = caller_args
                .iter()
                .zip(consts.iter().map(Some).chain(std::iter::once(None)))
                .filter(|(_, c)| !matches!(c, Some(Some(_))))
                .map(|(v, _)| *v)
                .collect();
            prop_assert_eq!(&data, &expected);

            let entry = program.expect_entry_block(kernel).unwrap();
            prop_assert_eq!(
                program.argument_types(entry).unwrap(),
                program.func_type(kernel).unwrap().inputs.clone()
            );
            if k == 0 {
                prop_assert_eq!(result, launch);
            }
        }
    }
}
