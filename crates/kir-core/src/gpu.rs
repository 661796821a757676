//! Accessors for the GPU dialect launch ops.
//!
//! Both `gpu.launch` and `gpu.launch_func` lead their operand list with the
//! six launch-configuration values (grid x,y,z then block x,y,z); the rest
//! are kernel data operands.

use crate::attr::{Attribute, KERNEL_ATTR};
use crate::error::CoreError;
use crate::graph::Program;
use crate::id::{OpId, RegionId};
use crate::ops::GpuOp;
use crate::value::Value;

impl Program {
    fn launch_operands_checked(&self, op: OpId) -> Result<Vec<Value>, CoreError> {
        let kind = self.kind(op)?;
        if !kind.is_launch() && !kind.is_launch_func() {
            return Err(CoreError::MalformedOp {
                op,
                reason: format!("expected a launch op, found {}", kind.name()),
            });
        }
        let operands = self.operands(op)?;
        if operands.len() < GpuOp::NUM_CONFIG_OPERANDS {
            return Err(CoreError::MalformedOp {
                op,
                reason: format!(
                    "launch has {} operands, needs at least {}",
                    operands.len(),
                    GpuOp::NUM_CONFIG_OPERANDS
                ),
            });
        }
        Ok(operands)
    }

    /// Grid sizes x, y, z.
    pub fn launch_grid_operands(&self, op: OpId) -> Result<[Value; 3], CoreError> {
        let operands = self.launch_operands_checked(op)?;
        Ok([operands[0], operands[1], operands[2]])
    }

    /// Block sizes x, y, z.
    pub fn launch_block_operands(&self, op: OpId) -> Result<[Value; 3], CoreError> {
        let operands = self.launch_operands_checked(op)?;
        Ok([operands[3], operands[4], operands[5]])
    }

    /// Operands after the launch configuration.
    pub fn launch_data_operands(&self, op: OpId) -> Result<Vec<Value>, CoreError> {
        let mut operands = self.launch_operands_checked(op)?;
        Ok(operands.split_off(GpuOp::NUM_CONFIG_OPERANDS))
    }

    /// The kernel symbol referenced by a `gpu.launch_func`.
    pub fn launch_func_kernel(&self, op: OpId) -> Result<&str, CoreError> {
        if !self.kind(op)?.is_launch_func() {
            return Err(CoreError::MalformedOp {
                op,
                reason: "expected gpu.launch_func".into(),
            });
        }
        match self.attr(op, KERNEL_ATTR)? {
            Some(Attribute::Symbol(name)) => Ok(name),
            _ => Err(CoreError::BadAttribute {
                op,
                name: KERNEL_ATTR.into(),
            }),
        }
    }

    /// The body region of a `gpu.launch`.
    pub fn launch_body(&self, op: OpId) -> Result<RegionId, CoreError> {
        if !self.kind(op)?.is_launch() {
            return Err(CoreError::MalformedOp {
                op,
                reason: "expected gpu.launch".into(),
            });
        }
        self.op(op)?
            .regions
            .first()
            .copied()
            .ok_or_else(|| CoreError::MalformedOp {
                op,
                reason: "gpu.launch has no body region".into(),
            })
    }
}
