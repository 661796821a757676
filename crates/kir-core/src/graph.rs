//! Program: the arena holding every operation, block and region.
//!
//! [`Program`] is the single entry point for constructing, querying and
//! rewriting IR. Operations and block arguments are nodes of one
//! `StableGraph`; every operand is an edge from the producing node to the
//! consuming operation, so a value's uses are exactly its outgoing edges and
//! "replace all uses" or "erase if unused" are O(uses).
//!
//! # Structure
//!
//! - An [`Operation`] owns zero or more regions and lives in at most one
//!   block (`parent`). Freshly created ops are *detached* until inserted.
//! - A [`Region`] is an ordered list of blocks owned by one operation.
//! - A [`Block`] holds ordered formal arguments and an ordered op list.
//!
//! Node indices are stable across removals, so [`OpId`] and [`ArgId`]
//! handles never dangle silently: lookups of erased entities return
//! [`CoreError`].

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::attr::{Attribute, AttributeMap};
use crate::error::CoreError;
use crate::id::{ArgId, BlockId, OpId, RegionId};
use crate::ops::OpKind;
use crate::types::Type;
use crate::value::{Use, Value};

/// An operation node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    /// Types of the produced results, by result port.
    pub result_types: Vec<Type>,
    pub attributes: AttributeMap,
    /// Owned regions, in order.
    pub regions: Vec<RegionId>,
    /// Containing block. `None` while detached.
    pub parent: Option<BlockId>,
}

/// A block formal argument node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockArgument {
    pub ty: Type,
    pub owner: BlockId,
}

/// A node of the def-use graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Op(Operation),
    Arg(BlockArgument),
}

/// A basic block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub args: Vec<ArgId>,
    pub ops: Vec<OpId>,
    pub parent: RegionId,
}

/// An ordered list of blocks owned by an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub blocks: Vec<BlockId>,
    pub parent: OpId,
}

/// Where to attach an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    /// Before the first op of the block.
    Start(BlockId),
    /// After the last op of the block.
    End(BlockId),
    /// Immediately before a sibling.
    Before(OpId),
    /// Immediately after a sibling.
    After(OpId),
}

/// The program container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Ops and block arguments, connected by use edges.
    graph: StableGraph<Node, Use, Directed, u32>,
    blocks: HashMap<BlockId, Block>,
    regions: HashMap<RegionId, Region>,
    /// The top-level module.
    root: OpId,
    next_block_id: u32,
    next_region_id: u32,
}

/// Most operands or results a single operation may have.
pub const MAX_PORTS: usize = u16::MAX as usize + 1;

fn check_port_count(what: &'static str, count: usize) -> Result<(), CoreError> {
    if count > MAX_PORTS {
        return Err(CoreError::TooManyValues {
            what,
            count,
            max: MAX_PORTS,
        });
    }
    Ok(())
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// Creates a program holding an empty top-level module.
    pub fn new() -> Self {
        let mut program = Program {
            graph: StableGraph::new(),
            blocks: HashMap::new(),
            regions: HashMap::new(),
            root: OpId(0),
            next_block_id: 0,
            next_region_id: 0,
        };
        let root = program.add_detached(OpKind::Module, Vec::new(), AttributeMap::new());
        let body = program.new_region(root);
        program.push_region(root, body);
        program.append_block(body, Vec::new());
        program.root = root;
        program
    }

    /// The top-level module.
    pub fn root(&self) -> OpId {
        self.root
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns a read-only reference to the def-use graph.
    pub fn graph(&self) -> &StableGraph<Node, Use, Directed, u32> {
        &self.graph
    }

    pub fn op(&self, id: OpId) -> Result<&Operation, CoreError> {
        match self.graph.node_weight(id.into()) {
            Some(Node::Op(op)) => Ok(op),
            _ => Err(CoreError::OpNotFound { id }),
        }
    }

    fn op_mut(&mut self, id: OpId) -> Result<&mut Operation, CoreError> {
        match self.graph.node_weight_mut(id.into()) {
            Some(Node::Op(op)) => Ok(op),
            _ => Err(CoreError::OpNotFound { id }),
        }
    }

    pub fn contains_op(&self, id: OpId) -> bool {
        self.op(id).is_ok()
    }

    pub fn kind(&self, id: OpId) -> Result<&OpKind, CoreError> {
        Ok(&self.op(id)?.kind)
    }

    pub fn argument(&self, id: ArgId) -> Result<&BlockArgument, CoreError> {
        match self.graph.node_weight(id.into()) {
            Some(Node::Arg(arg)) => Ok(arg),
            _ => Err(CoreError::ArgNotFound { id }),
        }
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, CoreError> {
        self.blocks.get(&id).ok_or(CoreError::BlockNotFound { id })
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, CoreError> {
        self.blocks.get_mut(&id).ok_or(CoreError::BlockNotFound { id })
    }

    pub fn region(&self, id: RegionId) -> Result<&Region, CoreError> {
        self.regions.get(&id).ok_or(CoreError::RegionNotFound { id })
    }

    /// Number of live operations, attached or not.
    pub fn op_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| matches!(self.graph.node_weight(idx), Some(Node::Op(_))))
            .count()
    }

    /// Number of use edges.
    pub fn use_count(&self) -> usize {
        self.graph.edge_count()
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    fn add_detached(
        &mut self,
        kind: OpKind,
        result_types: Vec<Type>,
        attributes: AttributeMap,
    ) -> OpId {
        let idx = self.graph.add_node(Node::Op(Operation {
            kind,
            result_types,
            attributes,
            regions: Vec::new(),
            parent: None,
        }));
        OpId::from(idx)
    }

    fn new_region(&mut self, parent: OpId) -> RegionId {
        let id = RegionId(self.next_region_id);
        self.next_region_id += 1;
        self.regions.insert(
            id,
            Region {
                blocks: Vec::new(),
                parent,
            },
        );
        id
    }

    fn push_region(&mut self, op: OpId, region: RegionId) {
        if let Some(Node::Op(operation)) = self.graph.node_weight_mut(op.into()) {
            operation.regions.push(region);
        }
    }

    fn append_block(&mut self, region: RegionId, arg_types: Vec<Type>) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        let args = arg_types
            .into_iter()
            .map(|ty| ArgId::from(self.graph.add_node(Node::Arg(BlockArgument { ty, owner: id }))))
            .collect();
        self.blocks.insert(
            id,
            Block {
                args,
                ops: Vec::new(),
                parent: region,
            },
        );
        if let Some(r) = self.regions.get_mut(&region) {
            r.blocks.push(id);
        }
        id
    }

    /// Creates a detached operation.
    ///
    /// Every operand must refer to a live value; one use edge is added per
    /// operand. `num_regions` empty regions are attached to the new op.
    /// Operand slots and result ports are `u16`, so both counts are capped
    /// at [`MAX_PORTS`].
    pub fn create_op(
        &mut self,
        kind: OpKind,
        operands: &[Value],
        result_types: Vec<Type>,
        attributes: AttributeMap,
        num_regions: usize,
    ) -> Result<OpId, CoreError> {
        check_port_count("operands", operands.len())?;
        check_port_count("results", result_types.len())?;
        for operand in operands {
            self.value_type(*operand)?;
        }

        let op = self.add_detached(kind, result_types, attributes);
        for (slot, operand) in operands.iter().enumerate() {
            self.graph.add_edge(
                operand.node(),
                op.into(),
                Use {
                    result: operand.port(),
                    operand: slot as u16, // bounded by check_port_count
                },
            );
        }
        for _ in 0..num_regions {
            let region = self.new_region(op);
            self.push_region(op, region);
        }
        Ok(op)
    }

    /// Appends a new block with the given argument types to `region`.
    pub fn add_block(
        &mut self,
        region: RegionId,
        arg_types: Vec<Type>,
    ) -> Result<BlockId, CoreError> {
        self.region(region)?;
        Ok(self.append_block(region, arg_types))
    }

    /// Appends a formal argument to `block`.
    pub fn add_block_argument(&mut self, block: BlockId, ty: Type) -> Result<Value, CoreError> {
        self.block(block)?;
        let arg = ArgId::from(self.graph.add_node(Node::Arg(BlockArgument { ty, owner: block })));
        self.block_mut(block)?.args.push(arg);
        Ok(Value::Argument(arg))
    }

    /// Attaches a detached operation at `point`.
    pub fn insert_op(&mut self, op: OpId, point: InsertPoint) -> Result<(), CoreError> {
        if self.op(op)?.parent.is_some() {
            return Err(CoreError::AlreadyAttached { id: op });
        }

        let (block, position) = match point {
            InsertPoint::Start(block) => {
                self.block(block)?;
                (block, 0)
            }
            InsertPoint::End(block) => (block, self.block(block)?.ops.len()),
            InsertPoint::Before(sibling) | InsertPoint::After(sibling) => {
                let block = self.op(sibling)?.parent.ok_or_else(|| {
                    CoreError::InvalidInsertPoint {
                        reason: format!("anchor operation {} is detached", sibling),
                    }
                })?;
                let position = self.position_in_block(block, sibling)?;
                match point {
                    InsertPoint::After(_) => (block, position + 1),
                    _ => (block, position),
                }
            }
        };

        self.block_mut(block)?.ops.insert(position, op);
        self.op_mut(op)?.parent = Some(block);
        Ok(())
    }

    /// Removes an operation from its block without destroying it.
    pub fn detach_op(&mut self, op: OpId) -> Result<(), CoreError> {
        let Some(block) = self.op(op)?.parent else {
            return Ok(());
        };
        let position = self.position_in_block(block, op)?;
        self.block_mut(block)?.ops.remove(position);
        self.op_mut(op)?.parent = None;
        Ok(())
    }

    fn position_in_block(&self, block: BlockId, op: OpId) -> Result<usize, CoreError> {
        self.block(block)?
            .ops
            .iter()
            .position(|&o| o == op)
            .ok_or_else(|| CoreError::GraphInconsistency {
                reason: format!("operation {} not listed in its parent block {}", op, block),
            })
    }

    // -----------------------------------------------------------------------
    // Values and uses
    // -----------------------------------------------------------------------

    /// Returns the type of a live value.
    pub fn value_type(&self, value: Value) -> Result<&Type, CoreError> {
        match value {
            Value::Result { op, index } => self
                .op(op)?
                .result_types
                .get(index as usize)
                .ok_or(CoreError::ResultOutOfRange { op, index }),
            Value::Argument(arg) => Ok(&self.argument(arg)?.ty),
        }
    }

    /// The `index`-th result of `op`.
    pub fn result(&self, op: OpId, index: u16) -> Result<Value, CoreError> {
        let value = Value::Result { op, index };
        self.value_type(value)?;
        Ok(value)
    }

    pub fn results(&self, op: OpId) -> Result<Vec<Value>, CoreError> {
        let count = self.op(op)?.result_types.len();
        Ok((0..count)
            .map(|index| Value::Result {
                op,
                index: index as u16, // bounded by check_port_count
            })
            .collect())
    }

    fn node_value(&self, node: NodeIndex<u32>, port: u16) -> Value {
        match self.graph.node_weight(node) {
            Some(Node::Arg(_)) => Value::Argument(ArgId::from(node)),
            _ => Value::Result {
                op: OpId::from(node),
                index: port,
            },
        }
    }

    /// Operands of `op`, ordered by operand slot.
    pub fn operands(&self, op: OpId) -> Result<Vec<Value>, CoreError> {
        self.op(op)?;
        let mut slots: Vec<(u16, Value)> = self
            .graph
            .edges_directed(op.into(), Direction::Incoming)
            .map(|edge| {
                let weight = edge.weight();
                (weight.operand, self.node_value(edge.source(), weight.result))
            })
            .collect();
        slots.sort_by_key(|(slot, _)| *slot);
        Ok(slots.into_iter().map(|(_, value)| value).collect())
    }

    /// Consumers of `value` as `(operation, operand slot)`, in ascending order.
    pub fn uses(&self, value: Value) -> Vec<(OpId, u16)> {
        let mut uses: Vec<(OpId, u16)> = self
            .graph
            .edges_directed(value.node(), Direction::Outgoing)
            .filter(|edge| edge.weight().result == value.port())
            .map(|edge| (OpId::from(edge.target()), edge.weight().operand))
            .collect();
        uses.sort();
        uses
    }

    pub fn has_uses(&self, value: Value) -> bool {
        self.graph
            .edges_directed(value.node(), Direction::Outgoing)
            .any(|edge| edge.weight().result == value.port())
    }

    /// Operation producing `value`, `None` for block arguments.
    pub fn defining_op(&self, value: Value) -> Option<OpId> {
        value.defining_op().filter(|&op| self.contains_op(op))
    }

    /// Retargets every use of `from` to `to`. Returns the number of uses
    /// rewritten.
    pub fn replace_all_uses_with(&mut self, from: Value, to: Value) -> Result<usize, CoreError> {
        self.value_type(from)?;
        self.value_type(to)?;
        if from == to {
            return Ok(0);
        }

        let uses: Vec<_> = self
            .graph
            .edges_directed(from.node(), Direction::Outgoing)
            .filter(|edge| edge.weight().result == from.port())
            .map(|edge| (edge.id(), edge.target(), edge.weight().operand))
            .collect();

        for (edge, target, operand) in &uses {
            self.graph.remove_edge(*edge);
            self.graph.add_edge(
                to.node(),
                *target,
                Use {
                    result: to.port(),
                    operand: *operand,
                },
            );
        }
        Ok(uses.len())
    }

    // -----------------------------------------------------------------------
    // Block arguments
    // -----------------------------------------------------------------------

    pub fn block_arguments(&self, block: BlockId) -> Result<Vec<Value>, CoreError> {
        Ok(self
            .block(block)?
            .args
            .iter()
            .map(|&arg| Value::Argument(arg))
            .collect())
    }

    pub fn block_argument(&self, block: BlockId, index: usize) -> Result<Value, CoreError> {
        let args = &self.block(block)?.args;
        args.get(index)
            .map(|&arg| Value::Argument(arg))
            .ok_or(CoreError::ArgumentOutOfRange {
                block,
                index,
                count: args.len(),
            })
    }

    pub fn argument_types(&self, block: BlockId) -> Result<Vec<Type>, CoreError> {
        self.block(block)?
            .args
            .iter()
            .map(|&arg| Ok(self.argument(arg)?.ty.clone()))
            .collect()
    }

    /// Removes the `index`-th formal argument of `block`. Arguments after it
    /// shift down by one. Fails if the argument still has uses.
    pub fn erase_block_argument(&mut self, block: BlockId, index: usize) -> Result<(), CoreError> {
        let value = self.block_argument(block, index)?;
        let uses = self.uses(value).len();
        if uses > 0 {
            return Err(CoreError::ValueInUse { value, uses });
        }
        self.graph.remove_node(value.node());
        self.block_mut(block)?.args.remove(index);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Structure queries
    // -----------------------------------------------------------------------

    pub fn parent_block(&self, op: OpId) -> Result<Option<BlockId>, CoreError> {
        Ok(self.op(op)?.parent)
    }

    /// The operation owning the region that contains `op`.
    pub fn parent_op(&self, op: OpId) -> Result<Option<OpId>, CoreError> {
        match self.op(op)?.parent {
            Some(block) => {
                let region = self.block(block)?.parent;
                Ok(Some(self.region(region)?.parent))
            }
            None => Ok(None),
        }
    }

    /// Innermost strict ancestor of `op` whose kind satisfies `pred`.
    pub fn enclosing_op_where(
        &self,
        op: OpId,
        pred: impl Fn(&OpKind) -> bool,
    ) -> Result<Option<OpId>, CoreError> {
        let mut current = self.parent_op(op)?;
        while let Some(ancestor) = current {
            if pred(self.kind(ancestor)?) {
                return Ok(Some(ancestor));
            }
            current = self.parent_op(ancestor)?;
        }
        Ok(None)
    }

    /// Outermost strict ancestor of `op` whose kind satisfies `pred`.
    pub fn outermost_op_where(
        &self,
        op: OpId,
        pred: impl Fn(&OpKind) -> bool,
    ) -> Result<Option<OpId>, CoreError> {
        let mut found = None;
        let mut current = self.parent_op(op)?;
        while let Some(ancestor) = current {
            if pred(self.kind(ancestor)?) {
                found = Some(ancestor);
            }
            current = self.parent_op(ancestor)?;
        }
        Ok(found)
    }

    /// The sibling following `op` in its block.
    pub fn next_op(&self, op: OpId) -> Result<Option<OpId>, CoreError> {
        match self.op(op)?.parent {
            Some(block) => {
                let position = self.position_in_block(block, op)?;
                Ok(self.block(block)?.ops.get(position + 1).copied())
            }
            None => Ok(None),
        }
    }

    /// Ops directly inside the regions of `op`, in program order.
    pub fn nested_ops(&self, op: OpId) -> Result<Vec<OpId>, CoreError> {
        let mut nested = Vec::new();
        for &region in &self.op(op)?.regions {
            for &block in &self.region(region)?.blocks {
                nested.extend_from_slice(&self.block(block)?.ops);
            }
        }
        Ok(nested)
    }

    /// Pre-order walk: `op` itself followed by every op nested in it.
    ///
    /// Returns a snapshot, so callers may mutate the program while iterating.
    pub fn walk(&self, op: OpId) -> Result<Vec<OpId>, CoreError> {
        let mut order = Vec::new();
        self.walk_into(op, &mut order)?;
        Ok(order)
    }

    fn walk_into(&self, op: OpId, order: &mut Vec<OpId>) -> Result<(), CoreError> {
        order.push(op);
        for nested in self.nested_ops(op)? {
            self.walk_into(nested, order)?;
        }
        Ok(())
    }

    /// Blocks in all regions of `op`, not descending further.
    pub fn op_blocks(&self, op: OpId) -> Result<Vec<BlockId>, CoreError> {
        let mut blocks = Vec::new();
        for &region in &self.op(op)?.regions {
            blocks.extend_from_slice(&self.region(region)?.blocks);
        }
        Ok(blocks)
    }

    // -----------------------------------------------------------------------
    // Erasure
    // -----------------------------------------------------------------------

    /// Destroys `op` together with everything nested in its regions.
    ///
    /// Fails with [`CoreError::ValueInUse`] if a result of `op` or of a
    /// nested op, or a nested block argument, is used outside the erased
    /// subtree.
    pub fn erase_op(&mut self, op: OpId) -> Result<(), CoreError> {
        let nested = self.walk(op)?;
        let mut doomed: HashSet<NodeIndex<u32>> = nested.iter().map(|&o| o.into()).collect();
        let mut blocks = Vec::new();
        let mut regions = Vec::new();
        for &o in &nested {
            for &region in &self.op(o)?.regions {
                regions.push(region);
                for &block in &self.region(region)?.blocks {
                    blocks.push(block);
                    doomed.extend(self.block(block)?.args.iter().map(|&a| NodeIndex::from(a)));
                }
            }
        }

        for &node in &doomed {
            let escaping: Vec<u16> = self
                .graph
                .edges_directed(node, Direction::Outgoing)
                .filter(|edge| !doomed.contains(&edge.target()))
                .map(|edge| edge.weight().result)
                .collect();
            if let Some(&port) = escaping.first() {
                return Err(CoreError::ValueInUse {
                    value: self.node_value(node, port),
                    uses: escaping.len(),
                });
            }
        }

        self.detach_op(op)?;
        for node in doomed {
            self.graph.remove_node(node);
        }
        for block in blocks {
            self.blocks.remove(&block);
        }
        for region in regions {
            self.regions.remove(&region);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cloning and region transfer
    // -----------------------------------------------------------------------

    /// Creates a detached copy of `op` with the same kind, attributes,
    /// result types and operands, and the same number of empty regions.
    pub fn clone_op_without_regions(&mut self, op: OpId) -> Result<OpId, CoreError> {
        let source = self.op(op)?.clone();
        let operands = self.operands(op)?;
        self.create_op(
            source.kind,
            &operands,
            source.result_types,
            source.attributes,
            source.regions.len(),
        )
    }

    /// Creates a detached deep copy of `op`, including its regions. Values
    /// defined inside the copied subtree are remapped to their copies;
    /// values from outside are shared.
    pub fn clone_op(&mut self, op: OpId) -> Result<OpId, CoreError> {
        let mut mapping = HashMap::new();
        self.clone_op_mapped(op, &mut mapping)
    }

    fn clone_op_mapped(
        &mut self,
        op: OpId,
        mapping: &mut HashMap<Value, Value>,
    ) -> Result<OpId, CoreError> {
        let source = self.op(op)?.clone();
        let operands: Vec<Value> = self
            .operands(op)?
            .into_iter()
            .map(|v| mapping.get(&v).copied().unwrap_or(v))
            .collect();
        let copy = self.create_op(
            source.kind,
            &operands,
            source.result_types.clone(),
            source.attributes,
            0,
        )?;
        // `copy` passed check_port_count, so every index fits.
        for index in 0..source.result_types.len() {
            let index = index as u16;
            mapping.insert(Value::Result { op, index }, Value::Result { op: copy, index });
        }

        for region in source.regions {
            let new_region = self.new_region(copy);
            self.push_region(copy, new_region);

            let mut pairs = Vec::new();
            for block in self.region(region)?.blocks.clone() {
                let arg_types = self.argument_types(block)?;
                let new_block = self.append_block(new_region, arg_types);
                for (old, new) in self
                    .block_arguments(block)?
                    .into_iter()
                    .zip(self.block_arguments(new_block)?)
                {
                    mapping.insert(old, new);
                }
                pairs.push((block, new_block));
            }
            for (block, new_block) in pairs {
                for inner in self.block(block)?.ops.clone() {
                    let inner_copy = self.clone_op_mapped(inner, mapping)?;
                    self.insert_op(inner_copy, InsertPoint::End(new_block))?;
                }
            }
        }
        Ok(copy)
    }

    /// Moves every block of `src` to the empty region `dst`. No op or value
    /// is copied; `src` is left without blocks.
    pub fn take_body(&mut self, dst: RegionId, src: RegionId) -> Result<(), CoreError> {
        if !self.region(dst)?.blocks.is_empty() {
            return Err(CoreError::RegionNotEmpty { id: dst });
        }
        let blocks = std::mem::take(
            &mut self
                .regions
                .get_mut(&src)
                .ok_or(CoreError::RegionNotFound { id: src })?
                .blocks,
        );
        for &block in &blocks {
            self.block_mut(block)?.parent = dst;
        }
        if let Some(region) = self.regions.get_mut(&dst) {
            region.blocks = blocks;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    pub fn attr(&self, op: OpId, name: &str) -> Result<Option<&Attribute>, CoreError> {
        Ok(self.op(op)?.attributes.get(name))
    }

    pub fn has_attr(&self, op: OpId, name: &str) -> bool {
        matches!(self.attr(op, name), Ok(Some(_)))
    }

    pub fn set_attr(
        &mut self,
        op: OpId,
        name: impl Into<String>,
        value: Attribute,
    ) -> Result<(), CoreError> {
        self.op_mut(op)?.attributes.insert(name.into(), value);
        Ok(())
    }

    pub fn remove_attr(&mut self, op: OpId, name: &str) -> Result<Option<Attribute>, CoreError> {
        Ok(self.op_mut(op)?.attributes.shift_remove(name))
    }
}
