//! SSA values and use edges.
//!
//! A [`Value`] is produced either by an operation result or by a block
//! argument. Uses are edges of the program's def-use graph: the source node
//! is the producer, the target node is the consuming operation, and the
//! [`Use`] weight records which result feeds which operand slot.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::id::{ArgId, OpId};

/// A reference to a produced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// The `index`-th result of an operation.
    Result { op: OpId, index: u16 },
    /// A block argument.
    Argument(ArgId),
}

impl Value {
    /// Shorthand for the first result of `op`.
    pub fn result(op: OpId) -> Self {
        Value::Result { op, index: 0 }
    }

    /// The graph node producing this value.
    pub fn node(&self) -> NodeIndex<u32> {
        match self {
            Value::Result { op, .. } => (*op).into(),
            Value::Argument(arg) => (*arg).into(),
        }
    }

    /// The output port on the producing node.
    pub fn port(&self) -> u16 {
        match self {
            Value::Result { index, .. } => *index,
            Value::Argument(_) => 0,
        }
    }

    /// The defining operation, if this is an op result.
    pub fn defining_op(&self) -> Option<OpId> {
        match self {
            Value::Result { op, .. } => Some(*op),
            Value::Argument(_) => None,
        }
    }
}

/// Use edge weight: result port of the producer feeding an operand slot of
/// the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Use {
    /// Which result of the producer (always 0 for block arguments).
    pub result: u16,
    /// Which operand slot of the consumer.
    pub operand: u16,
}
