//! Core IR for kir: an arena program graph of nested operations, blocks and
//! regions, with the GPU dialect ops consumed by the kernel outlining
//! transforms.

pub mod attr;
pub mod builder;
pub mod error;
pub mod function;
pub mod gpu;
pub mod graph;
pub mod id;
pub mod ops;
pub mod printer;
pub mod symbol;
pub mod types;
pub mod value;
pub mod verify;

// Re-export commonly used types
pub use attr::{Attribute, AttributeMap};
pub use builder::OpBuilder;
pub use error::CoreError;
pub use graph::{InsertPoint, Program};
pub use id::{ArgId, BlockId, OpId, RegionId};
pub use ops::{ArithOp, Dimension, GpuOp, OpKind};
pub use printer::print_program;
pub use symbol::SymbolTable;
pub use types::{ConstValue, FunctionType, ScalarType, Type};
pub use value::Value;
pub use verify::{verify_program, VerifyError};
