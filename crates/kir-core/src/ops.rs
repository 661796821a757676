//! Operation vocabulary.
//!
//! Defines the op kinds the IR understands, in three groups:
//! - **Structural** ops: `module`, `func`, `return`, `call`.
//! - **Standard** compute ops: constants, arithmetic, memory access.
//! - **GPU dialect** ops ([`GpuOp`]): launch constructs, launch calls,
//!   parallel-execution coordinates, and the kernel-style return.
//!
//! # Design: capability queries
//!
//! Transformations never match on concrete constant ops. They ask
//! [`OpKind::as_constant`] whether an op materializes a compile-time literal,
//! and [`OpKind::is_terminator`] whether it ends a block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ConstValue;

/// A spatial axis of the launch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    X,
    Y,
    Z,
}

impl Dimension {
    /// All axes in canonical order.
    pub const ALL: [Dimension; 3] = [Dimension::X, Dimension::Y, Dimension::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::X => "x",
            Dimension::Y => "y",
            Dimension::Z => "z",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Rem => "rem",
        }
    }
}

/// GPU dialect operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuOp {
    /// In-line kernel launch. Operands: grid x,y,z, block x,y,z, then the
    /// kernel data operands. Owns one region; its entry block takes the 12
    /// index arguments followed by one argument per data operand.
    Launch,
    /// Launch of an outlined kernel referenced by the `kernel` symbol
    /// attribute. Operands laid out as for [`GpuOp::Launch`]; no region.
    LaunchFunc,
    /// Id of the current block along one axis.
    BlockId { dimension: Dimension },
    /// Id of the current thread within its block along one axis.
    ThreadId { dimension: Dimension },
    /// Number of blocks in the grid along one axis.
    GridDim { dimension: Dimension },
    /// Number of threads in a block along one axis.
    BlockDim { dimension: Dimension },
    /// Terminator of a `gpu.launch` body.
    Return,
}

impl GpuOp {
    /// Number of launch-configuration operands (grid x,y,z + block x,y,z)
    /// leading the operand list of `gpu.launch` and `gpu.launch_func`.
    pub const NUM_CONFIG_OPERANDS: usize = 6;

    /// Number of index arguments leading a `gpu.launch` body.
    pub const NUM_INDEX_ARGUMENTS: usize = 12;

    /// Returns `true` for the coordinate-producing ops.
    pub fn is_index_op(&self) -> bool {
        matches!(
            self,
            GpuOp::BlockId { .. }
                | GpuOp::ThreadId { .. }
                | GpuOp::GridDim { .. }
                | GpuOp::BlockDim { .. }
        )
    }
}

/// The kind of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    // -- Structural --
    /// Symbol container. One region with a single block, no terminator.
    Module,
    /// Function. Attributes `sym_name` and `type`; one region which is
    /// empty for declarations.
    Func,
    /// Function return.
    Return,
    /// Direct call to the symbol in the `callee` attribute.
    Call,

    // -- Standard compute --
    /// Materializes a compile-time literal.
    Constant { value: ConstValue },
    /// Binary arithmetic.
    Arith { op: ArithOp },
    /// Load from a memref at the given indices.
    Load,
    /// Store a value into a memref at the given indices.
    Store,

    // -- GPU dialect --
    Gpu(GpuOp),
}

impl OpKind {
    /// Fully-qualified op name used by the printer and diagnostics.
    pub fn name(&self) -> String {
        match self {
            OpKind::Module => "module".into(),
            OpKind::Func => "func".into(),
            OpKind::Return => "return".into(),
            OpKind::Call => "call".into(),
            OpKind::Constant { .. } => "constant".into(),
            OpKind::Arith { op } => op.as_str().into(),
            OpKind::Load => "load".into(),
            OpKind::Store => "store".into(),
            OpKind::Gpu(op) => match op {
                GpuOp::Launch => "gpu.launch".into(),
                GpuOp::LaunchFunc => "gpu.launch_func".into(),
                GpuOp::BlockId { dimension } => format!("gpu.block_id {}", dimension),
                GpuOp::ThreadId { dimension } => format!("gpu.thread_id {}", dimension),
                GpuOp::GridDim { dimension } => format!("gpu.grid_dim {}", dimension),
                GpuOp::BlockDim { dimension } => format!("gpu.block_dim {}", dimension),
                GpuOp::Return => "gpu.return".into(),
            },
        }
    }

    /// If this op materializes a compile-time literal, returns it.
    pub fn as_constant(&self) -> Option<&ConstValue> {
        match self {
            OpKind::Constant { value } => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if this op ends a block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, OpKind::Return | OpKind::Gpu(GpuOp::Return))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, OpKind::Func)
    }

    pub fn is_module(&self) -> bool {
        matches!(self, OpKind::Module)
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, OpKind::Gpu(GpuOp::Launch))
    }

    pub fn is_launch_func(&self) -> bool {
        matches!(self, OpKind::Gpu(GpuOp::LaunchFunc))
    }

    /// Returns `true` if the op's regions may not reference values defined
    /// outside of it.
    pub fn is_isolated_from_above(&self) -> bool {
        matches!(self, OpKind::Module | OpKind::Func | OpKind::Gpu(GpuOp::Launch))
    }

    /// Returns `true` if this op defines a symbol through `sym_name`.
    pub fn is_symbol(&self) -> bool {
        matches!(self, OpKind::Module | OpKind::Func)
    }
}
