//! Stable ID newtypes for IR entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that an `OpId` cannot be accidentally used where a `BlockId` is expected.
//! Operations and block arguments both live as nodes of the program's
//! def-use graph, so [`OpId`] and [`ArgId`] bridge to petgraph's `NodeIndex`.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable operation identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId(pub u32);

/// Stable block argument identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArgId(pub u32);

/// Block identity within the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Region identity within the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ArgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridges between graph-resident IDs and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for OpId {
    fn from(idx: NodeIndex<u32>) -> Self {
        OpId(idx.index() as u32)
    }
}

impl From<OpId> for NodeIndex<u32> {
    fn from(id: OpId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl From<NodeIndex<u32>> for ArgId {
    fn from(idx: NodeIndex<u32>) -> Self {
        ArgId(idx.index() as u32)
    }
}

impl From<ArgId> for NodeIndex<u32> {
    fn from(id: ArgId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let op = OpId::from(idx);
        assert_eq!(op.0, 42);

        let back: NodeIndex<u32> = op.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn arg_id_to_node_index_roundtrip() {
        let arg = ArgId(9);
        let idx: NodeIndex<u32> = arg.into();
        assert_eq!(ArgId::from(idx), arg);
    }

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(format!("{}", OpId(7)), "7");
        assert_eq!(format!("{}", BlockId(3)), "3");
        assert_eq!(format!("{}", RegionId(0)), "0");
    }

    #[test]
    fn serde_roundtrip() {
        let op = OpId(42);
        let json = serde_json::to_string(&op).unwrap();
        let back: OpId = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
