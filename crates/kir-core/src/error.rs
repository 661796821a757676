//! Core error types for kir-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! misuse of the program graph API.

use crate::id::{ArgId, BlockId, OpId, RegionId};
use crate::types::Type;
use crate::value::Value;
use thiserror::Error;

/// Core errors produced by the kir-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An operation ID was not found in the graph.
    #[error("operation not found: OpId({id})", id = id.0)]
    OpNotFound { id: OpId },

    /// A block argument ID was not found in the graph.
    #[error("block argument not found: ArgId({id})", id = id.0)]
    ArgNotFound { id: ArgId },

    /// A block ID was not found.
    #[error("block not found: BlockId({id})", id = id.0)]
    BlockNotFound { id: BlockId },

    /// A region ID was not found.
    #[error("region not found: RegionId({id})", id = id.0)]
    RegionNotFound { id: RegionId },

    /// An operation has no result at the requested port.
    #[error("operation {op} has no result #{index}")]
    ResultOutOfRange { op: OpId, index: u16 },

    /// A block has no argument at the requested position.
    #[error("block {block} has {count} arguments, no argument #{index}")]
    ArgumentOutOfRange {
        block: BlockId,
        index: usize,
        count: usize,
    },

    /// A value would be destroyed while still being used.
    #[error("value {value:?} still has {uses} use(s)")]
    ValueInUse { value: Value, uses: usize },

    /// Attaching an operation that already lives in a block.
    #[error("operation {id} is already attached to a block")]
    AlreadyAttached { id: OpId },

    /// The requested insertion point is invalid.
    #[error("invalid insertion point: {reason}")]
    InvalidInsertPoint { reason: String },

    /// An operation's operand or region layout does not match its kind.
    #[error("malformed operation {op}: {reason}")]
    MalformedOp { op: OpId, reason: String },

    /// More operands or results than a use edge can address.
    #[error("operation would have {count} {what}, at most {max} are supported")]
    TooManyValues {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Moving blocks into a region that already has some.
    #[error("region {id} is not empty")]
    RegionNotEmpty { id: RegionId },

    /// A value does not have the type an operation requires.
    #[error("value {value:?} has type {found}, expected {expected}")]
    UnexpectedType {
        value: Value,
        expected: String,
        found: Type,
    },

    /// A function-only query was made on another kind of op.
    #[error("operation {id} is not a function")]
    NotAFunction { id: OpId },

    /// A module-only query was made on another kind of op.
    #[error("operation {id} is not a module")]
    NotAModule { id: OpId },

    /// A required attribute is missing or has the wrong shape.
    #[error("operation {op}: attribute '{name}' is missing or malformed")]
    BadAttribute { op: OpId, name: String },

    /// Internal bookkeeping disagrees with the graph.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
