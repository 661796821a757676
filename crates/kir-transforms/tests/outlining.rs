//! End-to-end outlining over whole programs.

use kir_core::attr::{KERNEL_FUNC_ATTR, KERNEL_MODULE_ATTR};
use kir_core::ops::{ArithOp, GpuOp, OpKind};
use kir_core::{
    print_program, verify_program, BlockId, ConstValue, FunctionType, OpBuilder, OpId, Program,
    ScalarType, Type, Value,
};
use kir_transforms::index_ops::index_op_sequence;
use kir_transforms::{
    outline_module, register_builtin_passes, OutlineOptions, PassManager, PassRegistry,
};
use proptest::prelude::*;

/// Adds `func @name(%buf: memref<?xf32>, %x: f32)` to the root module.
fn add_func(program: &mut Program, name: &str) -> (OpId, BlockId) {
    let root = program.root();
    let ty = FunctionType::new(vec![Type::dynamic_memref(ScalarType::F32), Type::F32], vec![]);
    let (func, entry) = program.create_func_with_body(name, ty).unwrap();
    program.push_back(root, func).unwrap();
    (func, entry)
}

/// Appends a launch passing `[%buf, 42 : i32, %x]` to `entry`. The body
/// stores `%x` into `%buf` at thread id x and adds the constant to itself.
fn add_launch(program: &mut Program, entry: BlockId) -> (OpId, [Value; 3]) {
    let buf = program.block_argument(entry, 0).unwrap();
    let x = program.block_argument(entry, 1).unwrap();
    let mut b = OpBuilder::at_block_end(program, entry).unwrap();
    let grid = b.constant(ConstValue::Index(4)).unwrap();
    let threads = b.constant(ConstValue::Index(32)).unwrap();
    let c42 = b.constant(ConstValue::I32(42)).unwrap();
    let (launch, body) = b
        .launch([grid, grid, grid], [threads, threads, threads], &[buf, c42, x])
        .unwrap();

    let tid = program.block_argument(body, 3).unwrap();
    let inner_buf = program.block_argument(body, 12).unwrap();
    let inner_c = program.block_argument(body, 13).unwrap();
    let inner_x = program.block_argument(body, 14).unwrap();
    let mut b = OpBuilder::at_block_end(program, body).unwrap();
    b.arith(ArithOp::Add, inner_c, inner_c).unwrap();
    b.store(inner_x, inner_buf, &[tid]).unwrap();
    b.gpu_return().unwrap();
    (launch, [buf, c42, x])
}

fn terminate(program: &mut Program, entry: BlockId) {
    OpBuilder::at_block_end(program, entry).unwrap().ret(&[]).unwrap();
}

fn launch_funcs(program: &Program, func: OpId) -> Vec<OpId> {
    program
        .walk(func)
        .unwrap()
        .into_iter()
        .filter(|op| program.kind(*op).unwrap().is_launch_func())
        .collect()
}

fn single_launch_program() -> (Program, OpId, OpId, [Value; 3]) {
    let mut program = Program::new();
    let (func, entry) = add_func(&mut program, "f");
    let (launch, data) = add_launch(&mut program, entry);
    terminate(&mut program, entry);
    (program, func, launch, data)
}

#[test]
fn outlines_single_launch_end_to_end() {
    let (mut program, f, launch, data) = single_launch_program();
    let grid = program.launch_grid_operands(launch).unwrap();
    let block = program.launch_block_operands(launch).unwrap();
    let root = program.root();

    let outlined = outline_module(&mut program, root, &OutlineOptions::default()).unwrap();
    assert_eq!(outlined.len(), 1);
    let kernel = &outlined[0];
    assert_eq!(kernel.name, "f_kernel");
    assert_eq!(kernel.enclosing, f);
    assert_eq!(kernel.folded, 1);
    assert!(!program.contains_op(launch));

    // f, the top-level declaration, then the container.
    assert_eq!(
        program.module_ops(root).unwrap(),
        vec![f, kernel.declaration, kernel.container]
    );
    assert!(!program.is_declaration(f).unwrap());
    assert!(program.is_declaration(kernel.declaration).unwrap());
    let expected_type = FunctionType::new(
        vec![Type::dynamic_memref(ScalarType::F32), Type::F32],
        vec![],
    );
    assert_eq!(program.func_type(kernel.declaration).unwrap(), &expected_type);

    assert!(program.has_attr(kernel.container, KERNEL_MODULE_ATTR));
    assert_eq!(program.symbol_name(kernel.container).unwrap(), None);
    assert_eq!(program.module_ops(kernel.container).unwrap(), vec![kernel.kernel]);
    assert_eq!(program.func_name(kernel.kernel).unwrap(), "f_kernel");
    assert!(program.has_attr(kernel.kernel, KERNEL_FUNC_ATTR));
    assert_eq!(program.func_type(kernel.kernel).unwrap(), &expected_type);

    // Kernel body: cloned constant, the 12 coordinate ops, then the original body.
    let entry = program.expect_entry_block(kernel.kernel).unwrap();
    assert_eq!(program.block(entry).unwrap().args.len(), 2);
    let ops = program.block(entry).unwrap().ops.clone();
    assert_eq!(ops.len(), 16);
    assert_eq!(
        program.kind(ops[0]).unwrap().as_constant(),
        Some(&ConstValue::I32(42))
    );
    for (op, expected) in ops[1..13].iter().zip(index_op_sequence()) {
        assert_eq!(program.kind(*op).unwrap(), &OpKind::Gpu(expected));
    }
    let add = ops[13];
    assert_eq!(
        program.operands(add).unwrap(),
        vec![Value::result(ops[0]), Value::result(ops[0])]
    );
    let store = ops[14];
    let args = program.block_arguments(entry).unwrap();
    assert_eq!(
        program.operands(store).unwrap(),
        vec![args[1], args[0], Value::result(ops[4])]
    );
    assert_eq!(program.kind(ops[15]).unwrap(), &OpKind::Return);

    // f now launches the kernel with the non-constant operands only.
    assert_eq!(launch_funcs(&program, f), vec![kernel.launch_func]);
    assert_eq!(program.launch_func_kernel(kernel.launch_func).unwrap(), "f_kernel");
    assert_eq!(program.launch_grid_operands(kernel.launch_func).unwrap(), grid);
    assert_eq!(program.launch_block_operands(kernel.launch_func).unwrap(), block);
    assert_eq!(
        program.launch_data_operands(kernel.launch_func).unwrap(),
        vec![data[0], data[2]]
    );

    assert_eq!(verify_program(&program), vec![]);
}

#[test]
fn two_launches_get_unique_names_in_order() {
    let mut program = Program::new();
    let (f, entry) = add_func(&mut program, "f");
    add_launch(&mut program, entry);
    add_launch(&mut program, entry);
    terminate(&mut program, entry);
    let (next, next_entry) = add_func(&mut program, "next");
    terminate(&mut program, next_entry);
    let root = program.root();

    let outlined = outline_module(&mut program, root, &OutlineOptions::default()).unwrap();
    let names: Vec<&str> = outlined.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["f_kernel", "f_kernel_0"]);

    assert_eq!(
        program.module_ops(root).unwrap(),
        vec![
            f,
            outlined[0].declaration,
            outlined[0].container,
            outlined[1].declaration,
            outlined[1].container,
            next,
        ]
    );
    // Each container keeps the final name of its kernel.
    for k in &outlined {
        assert_eq!(program.func_name(k.kernel).unwrap(), k.name);
        assert_eq!(program.launch_func_kernel(k.launch_func).unwrap(), k.name);
    }
    assert_eq!(
        launch_funcs(&program, f),
        vec![outlined[0].launch_func, outlined[1].launch_func]
    );
    assert_eq!(verify_program(&program), vec![]);
}

#[test]
fn existing_symbol_forces_renaming() {
    let mut program = Program::new();
    let (_, entry) = add_func(&mut program, "f");
    add_launch(&mut program, entry);
    terminate(&mut program, entry);
    let root = program.root();
    let taken = program
        .create_func("f_kernel", FunctionType::new(vec![], vec![]))
        .unwrap();
    program.push_back(root, taken).unwrap();

    let outlined = outline_module(&mut program, root, &OutlineOptions::default()).unwrap();
    assert_eq!(outlined[0].name, "f_kernel_0");
    assert_eq!(program.func_name(taken).unwrap(), "f_kernel");
    assert_eq!(program.lookup_function(root, "f_kernel_0").unwrap(), Some(outlined[0].declaration));
    assert_eq!(verify_program(&program), vec![]);
}

#[test]
fn functions_are_processed_independently() {
    let mut program = Program::new();
    let (f, f_entry) = add_func(&mut program, "f");
    add_launch(&mut program, f_entry);
    terminate(&mut program, f_entry);
    let (g, g_entry) = add_func(&mut program, "g");
    add_launch(&mut program, g_entry);
    terminate(&mut program, g_entry);
    let root = program.root();

    let outlined = outline_module(&mut program, root, &OutlineOptions::default()).unwrap();
    assert_eq!(outlined[0].name, "f_kernel");
    assert_eq!(outlined[0].enclosing, f);
    assert_eq!(outlined[1].name, "g_kernel");
    assert_eq!(outlined[1].enclosing, g);
    assert_eq!(
        program.module_ops(root).unwrap(),
        vec![
            f,
            outlined[0].declaration,
            outlined[0].container,
            g,
            outlined[1].declaration,
            outlined[1].container,
        ]
    );
}

#[test]
fn nested_launches_are_outlined_innermost_first() {
    let (mut program, f, launch, _) = single_launch_program();
    let body = program.op_blocks(launch).unwrap()[0];
    let terminator = *program.block(body).unwrap().ops.last().unwrap();
    let mut b = OpBuilder::before(&mut program, terminator);
    let one = b.constant(ConstValue::Index(1)).unwrap();
    let (middle, middle_body) = b.launch([one, one, one], [one, one, one], &[]).unwrap();
    let mut b = OpBuilder::at_block_end(&mut program, middle_body).unwrap();
    let two = b.constant(ConstValue::Index(2)).unwrap();
    let (inner, inner_body) = b.launch([two, two, two], [two, two, two], &[]).unwrap();
    b.gpu_return().unwrap();
    OpBuilder::at_block_end(&mut program, inner_body)
        .unwrap()
        .gpu_return()
        .unwrap();
    let root = program.root();

    let outlined = outline_module(&mut program, root, &OutlineOptions::default()).unwrap();
    let names: Vec<&str> = outlined.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["f_kernel", "f_kernel_0", "f_kernel_1"]);
    assert!(outlined.iter().all(|k| k.enclosing == f));
    for op in [launch, middle, inner] {
        assert!(!program.contains_op(op));
    }

    let remaining: Vec<OpId> = program
        .walk(root)
        .unwrap()
        .into_iter()
        .filter(|op| matches!(program.kind(*op).unwrap(), OpKind::Gpu(GpuOp::Launch)))
        .collect();
    assert_eq!(remaining, vec![]);

    // Each outer kernel launches the one nested directly inside it.
    assert_eq!(launch_funcs(&program, f).len(), 1);
    let launched_by = |kernel: OpId| -> Vec<String> {
        launch_funcs(&program, kernel)
            .into_iter()
            .map(|op| program.launch_func_kernel(op).unwrap().to_string())
            .collect()
    };
    assert_eq!(launched_by(outlined[0].kernel), Vec::<String>::new());
    assert_eq!(launched_by(outlined[1].kernel), vec!["f_kernel".to_string()]);
    assert_eq!(launched_by(outlined[2].kernel), vec!["f_kernel_0".to_string()]);

    assert_eq!(verify_program(&program), vec![]);
}

#[test]
fn without_constant_inlining_all_operands_stay() {
    let (mut program, _, _, data) = single_launch_program();
    let root = program.root();
    let options = OutlineOptions {
        inline_constants: false,
        ..OutlineOptions::default()
    };

    let outlined = outline_module(&mut program, root, &options).unwrap();
    let kernel = &outlined[0];
    assert_eq!(kernel.folded, 0);
    assert_eq!(
        program.launch_data_operands(kernel.launch_func).unwrap(),
        data.to_vec()
    );
    assert_eq!(program.func_type(kernel.kernel).unwrap().arity(), 3);
    assert_eq!(program.func_type(kernel.declaration).unwrap().arity(), 3);
    assert_eq!(verify_program(&program), vec![]);
}

#[test]
fn pass_pipeline_with_verification() {
    let (mut program, _, _, _) = single_launch_program();
    let mut registry = PassRegistry::new();
    register_builtin_passes(
        &mut registry,
        &OutlineOptions {
            kernel_suffix: "_gpu".into(),
            ..OutlineOptions::default()
        },
    );

    let mut manager = PassManager::from_pipeline(&registry, &["gpu-kernel-outlining"]).unwrap();
    manager.set_verify_each(true);
    manager.run(&mut program).unwrap();

    let text = print_program(&program);
    assert!(text.contains("gpu.launch_func @f_gpu"));
    assert!(text.contains("module attributes {gpu.kernel_module}"));
    assert!(text.contains("attributes {gpu.kernel}"));
    assert!(!text.contains("gpu.launch blocks"));

    // Running again finds nothing left to outline.
    let ops = program.op_count();
    manager.run(&mut program).unwrap();
    assert_eq!(program.op_count(), ops);
}

#[test]
fn outlined_program_survives_json() {
    let (mut program, _, _, _) = single_launch_program();
    let root = program.root();
    outline_module(&mut program, root, &OutlineOptions::default()).unwrap();

    let json = serde_json::to_string(&program).unwrap();
    let restored: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(print_program(&restored), print_program(&program));
    assert_eq!(verify_program(&restored), vec![]);
}

proptest! {
    #[test]
    fn kernel_signatures_match_their_launches(
        launches in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..5), 1..4),
        inline in any::<bool>(),
    ) {
        let mut program = Program::new();
        let root = program.root();
        let (func, entry) = program
            .create_func_with_body("f", FunctionType::new(vec![Type::I64], vec![]))
            .unwrap();
        program.push_back(root, func).unwrap();
        let param = program.block_argument(entry, 0).unwrap();

        // One launch per entry, passing a constant where the flag is set and
        // the function parameter otherwise.
        let mut expected_arity = Vec::new();
        for flags in &launches {
            let mut b = OpBuilder::at_block_end(&mut program, entry).unwrap();
            let one = b.constant(ConstValue::Index(1)).unwrap();
            let mut data = Vec::new();
            for (i, is_const) in flags.iter().enumerate() {
                data.push(if *is_const {
                    b.constant(ConstValue::I64(i as i64)).unwrap()
                } else {
                    param
                });
            }
            let (_, body) = b.launch([one, one, one], [one, one, one], &data).unwrap();
            OpBuilder::at_block_end(&mut program, body).unwrap().gpu_return().unwrap();
            let folded = if inline { flags.iter().filter(|c| **c).count() } else { 0 };
            expected_arity.push(flags.len() - folded);
        }
        OpBuilder::at_block_end(&mut program, entry).unwrap().ret(&[]).unwrap();

        let options = OutlineOptions { inline_constants: inline, ..OutlineOptions::default() };
        let outlined = outline_module(&mut program, root, &options).unwrap();
        prop_assert_eq!(outlined.len(), launches.len());

        for (k, arity) in outlined.iter().zip(expected_arity) {
            let ty = program.func_type(k.kernel).unwrap().clone();
            let entry = program.expect_entry_block(k.kernel).unwrap();
            prop_assert_eq!(ty.arity(), arity);
            prop_assert_eq!(program.argument_types(entry).unwrap(), ty.inputs.clone());
            prop_assert_eq!(program.func_type(k.declaration).unwrap(), &ty);
            let data = program.launch_data_operands(k.launch_func).unwrap();
            let actual: Vec<Type> = data
                .iter()
                .map(|v| program.value_type(*v).unwrap().clone())
                .collect();
            prop_assert_eq!(actual, ty.inputs);
        }
        prop_assert!(verify_program(&program).is_empty());
        prop_assert!(program
            .walk(root)
            .unwrap()
            .iter()
            .all(|op| !matches!(program.kind(*op).unwrap(), OpKind::Gpu(GpuOp::Launch))));
    }
}
