//! Symbol table over the ops directly inside one module.
//!
//! [`SymbolTable::insert`] attaches a symbol op and guarantees its name is
//! unique in the module, renaming it to `<name>_<n>` on collision. The
//! counter `n` belongs to the table: it starts at 0 and only increases, so
//! repeated collisions on the same base name yield `_0`, `_1`, ... in
//! insertion order.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::graph::{InsertPoint, Program};
use crate::id::OpId;

#[derive(Debug, Clone)]
pub struct SymbolTable {
    module: OpId,
    names: HashMap<String, OpId>,
    uniquing_counter: u32,
}

impl SymbolTable {
    /// Indexes every named op in the body of `module`.
    pub fn build(program: &Program, module: OpId) -> Result<Self, CoreError> {
        let mut names = HashMap::new();
        for op in program.module_ops(module)? {
            if let Some(name) = program.symbol_name(op)? {
                names.entry(name.to_string()).or_insert(op);
            }
        }
        Ok(SymbolTable {
            module,
            names,
            uniquing_counter: 0,
        })
    }

    /// The module this table indexes.
    pub fn module(&self) -> OpId {
        self.module
    }

    pub fn lookup(&self, name: &str) -> Option<OpId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Attaches the detached symbol op `op` at `point` inside the module body
    /// and records it. Returns the final, possibly renamed, symbol name.
    ///
    /// `point` must resolve to the module's body block.
    pub fn insert(
        &mut self,
        program: &mut Program,
        op: OpId,
        point: InsertPoint,
    ) -> Result<String, CoreError> {
        let base = program
            .symbol_name(op)?
            .map(str::to_string)
            .ok_or_else(|| CoreError::BadAttribute {
                op,
                name: crate::attr::SYM_NAME_ATTR.into(),
            })?;

        let body = program.module_body(self.module)?;
        let target = match point {
            InsertPoint::Start(block) | InsertPoint::End(block) => Some(block),
            InsertPoint::Before(anchor) | InsertPoint::After(anchor) => {
                program.parent_block(anchor)?
            }
        };
        if target != Some(body) {
            return Err(CoreError::InvalidInsertPoint {
                reason: format!("insertion point is outside module {}", self.module),
            });
        }

        let mut name = base.clone();
        while self.names.contains_key(&name) {
            name = format!("{}_{}", base, self.uniquing_counter);
            self.uniquing_counter += 1;
        }
        if name != base {
            program.set_symbol_name(op, &name)?;
        }

        program.insert_op(op, point)?;
        self.names.insert(name.clone(), op);
        Ok(name)
    }
}
