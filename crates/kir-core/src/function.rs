//! Functions and modules as operations.
//!
//! A function is a `func` op carrying a `sym_name` and a `type` attribute and
//! owning one region. The region's entry block arguments are the function's
//! formal parameters, so every signature edit here keeps the `type`
//! attribute and the entry block in step.
//!
//! A module is a `module` op with one region holding a single block and no
//! terminator.

use crate::attr::{Attribute, AttributeMap, FUNCTION_TYPE_ATTR, SYM_NAME_ATTR};
use crate::error::CoreError;
use crate::graph::{InsertPoint, Program};
use crate::id::{BlockId, OpId, RegionId};
use crate::ops::OpKind;
use crate::types::{FunctionType, Type};

impl Program {
    /// Creates a detached function declaration (empty body).
    pub fn create_func(&mut self, name: &str, ty: FunctionType) -> Result<OpId, CoreError> {
        let mut attributes = AttributeMap::new();
        attributes.insert(SYM_NAME_ATTR.into(), Attribute::String(name.into()));
        attributes.insert(FUNCTION_TYPE_ATTR.into(), Attribute::Type(Type::Function(ty)));
        self.create_op(OpKind::Func, &[], Vec::new(), attributes, 1)
    }

    /// Creates a detached function whose entry block takes the signature's
    /// inputs as arguments.
    pub fn create_func_with_body(
        &mut self,
        name: &str,
        ty: FunctionType,
    ) -> Result<(OpId, BlockId), CoreError> {
        let inputs = ty.inputs.clone();
        let func = self.create_func(name, ty)?;
        let body = self.func_body(func)?;
        let entry = self.add_block(body, inputs)?;
        Ok((func, entry))
    }

    /// Creates a detached module with an empty body block.
    pub fn create_module(&mut self, name: Option<&str>) -> Result<OpId, CoreError> {
        let mut attributes = AttributeMap::new();
        if let Some(name) = name {
            attributes.insert(SYM_NAME_ATTR.into(), Attribute::String(name.into()));
        }
        let module = self.create_op(OpKind::Module, &[], Vec::new(), attributes, 1)?;
        let region = self.op(module)?.regions[0];
        self.add_block(region, Vec::new())?;
        Ok(module)
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    /// The `sym_name` of a symbol op, if it has one.
    pub fn symbol_name(&self, op: OpId) -> Result<Option<&str>, CoreError> {
        Ok(self.attr(op, SYM_NAME_ATTR)?.and_then(Attribute::as_str))
    }

    pub fn set_symbol_name(&mut self, op: OpId, name: &str) -> Result<(), CoreError> {
        self.set_attr(op, SYM_NAME_ATTR, Attribute::String(name.into()))
    }

    fn expect_func(&self, func: OpId) -> Result<(), CoreError> {
        if self.kind(func)?.is_func() {
            Ok(())
        } else {
            Err(CoreError::NotAFunction { id: func })
        }
    }

    /// The name of a function. Functions must be named.
    pub fn func_name(&self, func: OpId) -> Result<&str, CoreError> {
        self.expect_func(func)?;
        self.symbol_name(func)?.ok_or_else(|| CoreError::BadAttribute {
            op: func,
            name: SYM_NAME_ATTR.into(),
        })
    }

    pub fn func_type(&self, func: OpId) -> Result<&FunctionType, CoreError> {
        self.expect_func(func)?;
        self.attr(func, FUNCTION_TYPE_ATTR)?
            .and_then(Attribute::as_type)
            .and_then(Type::as_function)
            .ok_or_else(|| CoreError::BadAttribute {
                op: func,
                name: FUNCTION_TYPE_ATTR.into(),
            })
    }

    pub fn set_func_type(&mut self, func: OpId, ty: FunctionType) -> Result<(), CoreError> {
        self.expect_func(func)?;
        self.set_attr(func, FUNCTION_TYPE_ATTR, Attribute::Type(Type::Function(ty)))
    }

    /// The body region of a function.
    pub fn func_body(&self, func: OpId) -> Result<RegionId, CoreError> {
        self.expect_func(func)?;
        self.op(func)?
            .regions
            .first()
            .copied()
            .ok_or_else(|| CoreError::MalformedOp {
                op: func,
                reason: "function has no body region".into(),
            })
    }

    /// The entry block, `None` for declarations.
    pub fn entry_block(&self, func: OpId) -> Result<Option<BlockId>, CoreError> {
        let body = self.func_body(func)?;
        Ok(self.region(body)?.blocks.first().copied())
    }

    /// The entry block of a function that must have a body.
    pub fn expect_entry_block(&self, func: OpId) -> Result<BlockId, CoreError> {
        self.entry_block(func)?.ok_or_else(|| CoreError::MalformedOp {
            op: func,
            reason: "function is a declaration".into(),
        })
    }

    pub fn is_declaration(&self, func: OpId) -> Result<bool, CoreError> {
        Ok(self.entry_block(func)?.is_none())
    }

    // -----------------------------------------------------------------------
    // Signature edits
    // -----------------------------------------------------------------------

    /// Erases the `index`-th formal parameter from the entry block and the
    /// signature. The parameter must be unused, and the signature must have
    /// an input at `index`; nothing is changed otherwise.
    pub fn erase_function_argument(&mut self, func: OpId, index: usize) -> Result<(), CoreError> {
        let entry = self.expect_entry_block(func)?;
        let mut ty = self.func_type(func)?.clone();
        if index >= ty.inputs.len() {
            return Err(CoreError::MalformedOp {
                op: func,
                reason: format!(
                    "signature has {} inputs, cannot erase argument #{}",
                    ty.inputs.len(),
                    index
                ),
            });
        }
        self.erase_block_argument(entry, index)?;
        ty.inputs.remove(index);
        self.set_func_type(func, ty)
    }

    /// Erases several formal parameters at once.
    ///
    /// Indices refer to positions before any erasure. They are processed in
    /// descending order so earlier removals never shift a pending index;
    /// duplicates are ignored.
    pub fn erase_function_arguments(
        &mut self,
        func: OpId,
        indices: &[usize],
    ) -> Result<(), CoreError> {
        let mut indices = indices.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        for index in indices {
            self.erase_function_argument(func, index)?;
        }
        Ok(())
    }

    /// Rebuilds the signature inputs from the entry block argument types,
    /// keeping the results.
    pub fn sync_function_type_from_entry(&mut self, func: OpId) -> Result<(), CoreError> {
        let entry = self.expect_entry_block(func)?;
        let inputs = self.argument_types(entry)?;
        let results = self.func_type(func)?.results.clone();
        self.set_func_type(func, FunctionType::new(inputs, results))
    }

    // -----------------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------------

    /// The single body block of a module.
    pub fn module_body(&self, module: OpId) -> Result<BlockId, CoreError> {
        if !self.kind(module)?.is_module() {
            return Err(CoreError::NotAModule { id: module });
        }
        self.op_blocks(module)?
            .first()
            .copied()
            .ok_or_else(|| CoreError::MalformedOp {
                op: module,
                reason: "module has no body block".into(),
            })
    }

    /// Appends a detached op at the end of a module body.
    pub fn push_back(&mut self, module: OpId, op: OpId) -> Result<(), CoreError> {
        let body = self.module_body(module)?;
        self.insert_op(op, InsertPoint::End(body))
    }

    /// Ops directly inside a module body.
    pub fn module_ops(&self, module: OpId) -> Result<Vec<OpId>, CoreError> {
        Ok(self.block(self.module_body(module)?)?.ops.clone())
    }

    /// Functions directly inside a module body, in order.
    pub fn module_functions(&self, module: OpId) -> Result<Vec<OpId>, CoreError> {
        let mut funcs = Vec::new();
        for op in self.module_ops(module)? {
            if self.kind(op)?.is_func() {
                funcs.push(op);
            }
        }
        Ok(funcs)
    }

    /// Looks up a function directly inside `module` by name.
    pub fn lookup_function(&self, module: OpId, name: &str) -> Result<Option<OpId>, CoreError> {
        for func in self.module_functions(module)? {
            if self.symbol_name(func)? == Some(name) {
                return Ok(Some(func));
            }
        }
        Ok(None)
    }
}
