//! Insertion-point builder.
//!
//! [`OpBuilder`] creates operations and attaches them at a moving insertion
//! point, so a sequence of `create` calls appears in the block in call
//! order. Convenience constructors cover the op vocabulary used by the GPU
//! pipeline and by tests.

use smallvec::SmallVec;

use crate::attr::{Attribute, AttributeMap, CALLEE_ATTR, KERNEL_ATTR};
use crate::error::CoreError;
use crate::graph::{InsertPoint, Program};
use crate::id::{BlockId, OpId};
use crate::ops::{ArithOp, GpuOp, OpKind};
use crate::types::{ConstValue, FunctionType, Type};
use crate::value::Value;

/// Launch operands: grid x,y,z, block x,y,z, then data.
type LaunchOperands = SmallVec<[Value; 8]>;

pub struct OpBuilder<'p> {
    program: &'p mut Program,
    point: InsertPoint,
}

impl<'p> OpBuilder<'p> {
    pub fn new(program: &'p mut Program, point: InsertPoint) -> Self {
        OpBuilder { program, point }
    }

    /// Inserts before the current first op of `block`, or at its end when
    /// the block is empty.
    pub fn at_block_start(program: &'p mut Program, block: BlockId) -> Result<Self, CoreError> {
        let point = match program.block(block)?.ops.first() {
            Some(&first) => InsertPoint::Before(first),
            None => InsertPoint::End(block),
        };
        Ok(OpBuilder { program, point })
    }

    pub fn at_block_end(program: &'p mut Program, block: BlockId) -> Result<Self, CoreError> {
        program.block(block)?;
        Ok(OpBuilder {
            program,
            point: InsertPoint::End(block),
        })
    }

    pub fn before(program: &'p mut Program, op: OpId) -> Self {
        OpBuilder {
            program,
            point: InsertPoint::Before(op),
        }
    }

    pub fn program(&mut self) -> &mut Program {
        self.program
    }

    pub fn insertion_point(&self) -> InsertPoint {
        self.point
    }

    pub fn set_insertion_point(&mut self, point: InsertPoint) {
        self.point = point;
    }

    /// Attaches a detached op at the insertion point and advances past it.
    pub fn insert(&mut self, op: OpId) -> Result<OpId, CoreError> {
        self.program.insert_op(op, self.point)?;
        if matches!(self.point, InsertPoint::Start(_) | InsertPoint::After(_)) {
            self.point = InsertPoint::After(op);
        }
        Ok(op)
    }

    pub fn create(
        &mut self,
        kind: OpKind,
        operands: &[Value],
        result_types: Vec<Type>,
        attributes: AttributeMap,
        num_regions: usize,
    ) -> Result<OpId, CoreError> {
        let op = self
            .program
            .create_op(kind, operands, result_types, attributes, num_regions)?;
        self.insert(op)
    }

    /// Deep-copies `op` to the insertion point.
    pub fn clone_op(&mut self, op: OpId) -> Result<OpId, CoreError> {
        let copy = self.program.clone_op(op)?;
        self.insert(copy)
    }

    fn single(&mut self, kind: OpKind, operands: &[Value], ty: Type) -> Result<Value, CoreError> {
        let op = self.create(kind, operands, vec![ty], AttributeMap::new(), 0)?;
        Ok(Value::result(op))
    }

    pub fn constant(&mut self, value: ConstValue) -> Result<Value, CoreError> {
        let ty = value.ty();
        self.single(OpKind::Constant { value }, &[], ty)
    }

    /// Binary arithmetic; the result takes the type of `lhs`.
    pub fn arith(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Result<Value, CoreError> {
        let ty = self.program.value_type(lhs)?.clone();
        self.single(OpKind::Arith { op }, &[lhs, rhs], ty)
    }

    /// Loads one element of `memref`.
    pub fn load(&mut self, memref: Value, indices: &[Value]) -> Result<Value, CoreError> {
        let element = match self.program.value_type(memref)? {
            Type::MemRef { element, .. } => Type::Scalar(*element),
            other => {
                return Err(CoreError::UnexpectedType {
                    value: memref,
                    expected: "memref".into(),
                    found: other.clone(),
                })
            }
        };
        let mut operands: SmallVec<[Value; 4]> = SmallVec::new();
        operands.push(memref);
        operands.extend_from_slice(indices);
        self.single(OpKind::Load, &operands, element)
    }

    pub fn store(&mut self, value: Value, memref: Value, indices: &[Value]) -> Result<OpId, CoreError> {
        let mut operands: SmallVec<[Value; 4]> = SmallVec::new();
        operands.push(value);
        operands.push(memref);
        operands.extend_from_slice(indices);
        self.create(OpKind::Store, &operands, Vec::new(), AttributeMap::new(), 0)
    }

    /// A parallel-execution coordinate such as `gpu.thread_id x`.
    pub fn index_op(&mut self, op: GpuOp) -> Result<Value, CoreError> {
        self.single(OpKind::Gpu(op), &[], Type::Index)
    }

    pub fn ret(&mut self, values: &[Value]) -> Result<OpId, CoreError> {
        self.create(OpKind::Return, values, Vec::new(), AttributeMap::new(), 0)
    }

    pub fn gpu_return(&mut self) -> Result<OpId, CoreError> {
        self.create(OpKind::Gpu(GpuOp::Return), &[], Vec::new(), AttributeMap::new(), 0)
    }

    pub fn call(
        &mut self,
        callee: &str,
        args: &[Value],
        result_types: Vec<Type>,
    ) -> Result<OpId, CoreError> {
        let mut attributes = AttributeMap::new();
        attributes.insert(CALLEE_ATTR.into(), Attribute::Symbol(callee.into()));
        self.create(OpKind::Call, args, result_types, attributes, 0)
    }

    /// Creates a function with an entry block at the insertion point.
    pub fn func(&mut self, name: &str, ty: FunctionType) -> Result<(OpId, BlockId), CoreError> {
        let (func, entry) = self.program.create_func_with_body(name, ty)?;
        self.insert(func)?;
        Ok((func, entry))
    }

    /// Creates a `gpu.launch` whose body block takes the 12 index arguments
    /// followed by one argument per data operand. The body is left empty.
    pub fn launch(
        &mut self,
        grid: [Value; 3],
        block: [Value; 3],
        data: &[Value],
    ) -> Result<(OpId, BlockId), CoreError> {
        let operands = launch_operands(grid, block, data);
        let mut arg_types = vec![Type::Index; GpuOp::NUM_INDEX_ARGUMENTS];
        for value in data {
            arg_types.push(self.program.value_type(*value)?.clone());
        }

        let launch = self.create(
            OpKind::Gpu(GpuOp::Launch),
            &operands,
            Vec::new(),
            AttributeMap::new(),
            1,
        )?;
        let region = self.program.op(launch)?.regions[0];
        let body = self.program.add_block(region, arg_types)?;
        Ok((launch, body))
    }

    /// Creates a `gpu.launch_func` of the kernel named `kernel`.
    pub fn launch_func(
        &mut self,
        kernel: &str,
        grid: [Value; 3],
        block: [Value; 3],
        data: &[Value],
    ) -> Result<OpId, CoreError> {
        let operands = launch_operands(grid, block, data);
        let mut attributes = AttributeMap::new();
        attributes.insert(KERNEL_ATTR.into(), Attribute::Symbol(kernel.into()));
        self.create(
            OpKind::Gpu(GpuOp::LaunchFunc),
            &operands,
            Vec::new(),
            attributes,
            0,
        )
    }
}

fn launch_operands(grid: [Value; 3], block: [Value; 3], data: &[Value]) -> LaunchOperands {
    let mut operands = LaunchOperands::new();
    operands.extend_from_slice(&grid);
    operands.extend_from_slice(&block);
    operands.extend_from_slice(data);
    operands
}
