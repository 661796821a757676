//! MLIR-flavoured textual dump of a program.
//!
//! Result values print as `%N` and block arguments as `%argN`, numbered in
//! program order across the whole dump so the output is deterministic.
//! Entry block arguments of functions and launches are printed in the op
//! header; any further blocks get a `^bbN(...)` label.
//!
//! ```text
//! module {
//!   func @f(%arg0 : memref<?xf32>) {
//!     %0 = constant 1 : index
//!     gpu.launch_func @f_kernel blocks in (%0, %0, %0) threads in (%0, %0, %0) args(%arg0 : memref<?xf32>)
//!     return
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::attr::{Attribute, FUNCTION_TYPE_ATTR, SYM_NAME_ATTR};
use crate::graph::Program;
use crate::id::{BlockId, OpId};
use crate::ops::{GpuOp, OpKind};
use crate::value::Value;

/// Displays a program, or a single op and everything nested in it.
pub struct ProgramDisplay<'a> {
    program: &'a Program,
    top: OpId,
}

impl Program {
    pub fn display(&self) -> ProgramDisplay<'_> {
        self.display_op(self.root())
    }

    pub fn display_op(&self, op: OpId) -> ProgramDisplay<'_> {
        ProgramDisplay {
            program: self,
            top: op,
        }
    }
}

/// Renders the whole program as text.
pub fn print_program(program: &Program) -> String {
    program.display().to_string()
}

impl fmt::Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer {
            program: self.program,
            names: HashMap::new(),
            labels: HashMap::new(),
        };
        printer.assign_names(self.top)?;
        printer.fmt_op(f, self.top, 0)
    }
}

struct Printer<'a> {
    program: &'a Program,
    names: HashMap<Value, String>,
    labels: HashMap<BlockId, usize>,
}

impl<'a> Printer<'a> {
    fn assign_names(&mut self, top: OpId) -> fmt::Result {
        let program = self.program;
        let mut results = 0usize;
        let mut args = 0usize;
        let mut labels = 0usize;
        for op in program.walk(top).map_err(|_| fmt::Error)? {
            for value in program.results(op).map_err(|_| fmt::Error)? {
                self.names.insert(value, format!("%{}", results));
                results += 1;
            }
            for (i, block) in program.op_blocks(op).map_err(|_| fmt::Error)?.into_iter().enumerate() {
                if i > 0 {
                    self.labels.insert(block, labels);
                    labels += 1;
                }
                for value in program.block_arguments(block).map_err(|_| fmt::Error)? {
                    self.names.insert(value, format!("%arg{}", args));
                    args += 1;
                }
            }
        }
        Ok(())
    }

    fn name(&self, value: &Value) -> &str {
        self.names.get(value).map(String::as_str).unwrap_or("%<undef>")
    }

    fn fmt_values(&self, f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.name(value))?;
        }
        Ok(())
    }

    fn fmt_typed_values(&self, f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let ty = self.program.value_type(*value).map_err(|_| fmt::Error)?;
            write!(f, "{} : {}", self.name(value), ty)?;
        }
        Ok(())
    }

    /// `attributes {a, b = 1}` for every attribute not already shown in the
    /// op syntax.
    fn fmt_extra_attrs(&self, f: &mut fmt::Formatter<'_>, op: OpId, skip: &[&str]) -> fmt::Result {
        let operation = self.program.op(op).map_err(|_| fmt::Error)?;
        let extra: Vec<(&String, &Attribute)> = operation
            .attributes
            .iter()
            .filter(|(name, _)| !skip.contains(&name.as_str()))
            .collect();
        if extra.is_empty() {
            return Ok(());
        }
        write!(f, " attributes {{")?;
        for (i, (name, value)) in extra.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Attribute::Unit => write!(f, "{}", name)?,
                other => write!(f, "{} = {}", name, other)?,
            }
        }
        write!(f, "}}")
    }

    fn fmt_body(&self, f: &mut fmt::Formatter<'_>, op: OpId, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        let blocks = self.program.op_blocks(op).map_err(|_| fmt::Error)?;
        writeln!(f, " {{")?;
        for (i, block) in blocks.into_iter().enumerate() {
            if i > 0 {
                let label = self.labels.get(&block).copied().unwrap_or_default();
                let args = self.program.block_arguments(block).map_err(|_| fmt::Error)?;
                write!(f, "{pad}^bb{}", label)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    self.fmt_typed_values(f, &args)?;
                    write!(f, ")")?;
                }
                writeln!(f, ":")?;
            }
            let ops = &self.program.block(block).map_err(|_| fmt::Error)?.ops;
            for &inner in ops {
                self.fmt_op(f, inner, indent + 1)?;
            }
        }
        write!(f, "{pad}}}")
    }

    fn fmt_op(&self, f: &mut fmt::Formatter<'_>, op: OpId, indent: usize) -> fmt::Result {
        let program = self.program;
        let pad = "  ".repeat(indent);
        let kind = program.kind(op).map_err(|_| fmt::Error)?;
        let operands = program.operands(op).map_err(|_| fmt::Error)?;
        let results = program.results(op).map_err(|_| fmt::Error)?;

        write!(f, "{pad}")?;
        if !results.is_empty() {
            self.fmt_values(f, &results)?;
            write!(f, " = ")?;
        }

        match kind {
            OpKind::Module => {
                write!(f, "module")?;
                if let Some(name) = program.symbol_name(op).map_err(|_| fmt::Error)? {
                    write!(f, " @{}", name)?;
                }
                self.fmt_extra_attrs(f, op, &[SYM_NAME_ATTR])?;
                self.fmt_body(f, op, indent)?;
            }
            OpKind::Func => {
                let name = program.func_name(op).map_err(|_| fmt::Error)?;
                let ty = program.func_type(op).map_err(|_| fmt::Error)?;
                write!(f, "func @{}(", name)?;
                match program.entry_block(op).map_err(|_| fmt::Error)? {
                    Some(entry) => {
                        let args = program.block_arguments(entry).map_err(|_| fmt::Error)?;
                        self.fmt_typed_values(f, &args)?;
                    }
                    None => {
                        for (i, input) in ty.inputs.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", input)?;
                        }
                    }
                }
                write!(f, ")")?;
                if !ty.results.is_empty() {
                    write!(f, " -> (")?;
                    for (i, result) in ty.results.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", result)?;
                    }
                    write!(f, ")")?;
                }
                self.fmt_extra_attrs(f, op, &[SYM_NAME_ATTR, FUNCTION_TYPE_ATTR])?;
                if !program.is_declaration(op).map_err(|_| fmt::Error)? {
                    self.fmt_body(f, op, indent)?;
                }
            }
            OpKind::Return => {
                write!(f, "return")?;
                if !operands.is_empty() {
                    write!(f, " ")?;
                    self.fmt_typed_values(f, &operands)?;
                }
            }
            OpKind::Call => {
                let callee = program
                    .attr(op, crate::attr::CALLEE_ATTR)
                    .map_err(|_| fmt::Error)?
                    .and_then(Attribute::as_str)
                    .unwrap_or("<unknown>");
                write!(f, "call @{}(", callee)?;
                self.fmt_typed_values(f, &operands)?;
                write!(f, ")")?;
            }
            OpKind::Constant { value } => {
                write!(f, "constant {} : {}", value, value.ty())?;
            }
            OpKind::Arith { op: arith } => {
                write!(f, "{} ", arith.as_str())?;
                self.fmt_values(f, &operands)?;
                if let Some(first) = operands.first() {
                    let ty = program.value_type(*first).map_err(|_| fmt::Error)?;
                    write!(f, " : {}", ty)?;
                }
            }
            OpKind::Load => {
                if let Some((memref, indices)) = operands.split_first() {
                    write!(f, "load {}[", self.name(memref))?;
                    self.fmt_values(f, indices)?;
                    let ty = program.value_type(*memref).map_err(|_| fmt::Error)?;
                    write!(f, "] : {}", ty)?;
                }
            }
            OpKind::Store => {
                if let [value, memref, indices @ ..] = operands.as_slice() {
                    write!(f, "store {}, {}[", self.name(value), self.name(memref))?;
                    self.fmt_values(f, indices)?;
                    let ty = program.value_type(*memref).map_err(|_| fmt::Error)?;
                    write!(f, "] : {}", ty)?;
                }
            }
            OpKind::Gpu(GpuOp::Launch) => self.fmt_launch(f, op, &operands, indent)?,
            OpKind::Gpu(GpuOp::LaunchFunc) => {
                let kernel = program.launch_func_kernel(op).unwrap_or("<unknown>");
                write!(f, "gpu.launch_func @{}", kernel)?;
                self.fmt_launch_config(f, &operands)?;
                let data = operands.get(GpuOp::NUM_CONFIG_OPERANDS..).unwrap_or(&[]);
                if !data.is_empty() {
                    write!(f, " args(")?;
                    self.fmt_typed_values(f, data)?;
                    write!(f, ")")?;
                }
            }
            OpKind::Gpu(_) => write!(f, "{}", kind.name())?,
        }
        writeln!(f)
    }

    /// ` blocks in (...) threads in (...)`
    fn fmt_launch_config(&self, f: &mut fmt::Formatter<'_>, operands: &[Value]) -> fmt::Result {
        if operands.len() < GpuOp::NUM_CONFIG_OPERANDS {
            return write!(f, " <malformed>");
        }
        write!(f, " blocks in (")?;
        self.fmt_values(f, &operands[0..3])?;
        write!(f, ") threads in (")?;
        self.fmt_values(f, &operands[3..6])?;
        write!(f, ")")
    }

    /// `gpu.launch blocks(%bx, ..) in (%gx = %g0, ..) threads(..) in (..)
    /// args(%a = %v : ty, ..)` followed by the body.
    fn fmt_launch(
        &self,
        f: &mut fmt::Formatter<'_>,
        op: OpId,
        operands: &[Value],
        indent: usize,
    ) -> fmt::Result {
        let program = self.program;
        write!(f, "gpu.launch")?;
        let entry = program
            .op_blocks(op)
            .map_err(|_| fmt::Error)?
            .first()
            .copied();
        let args = match entry {
            Some(entry) => program.block_arguments(entry).map_err(|_| fmt::Error)?,
            None => Vec::new(),
        };
        if operands.len() < GpuOp::NUM_CONFIG_OPERANDS || args.len() < GpuOp::NUM_INDEX_ARGUMENTS {
            write!(f, " <malformed>")?;
            return self.fmt_body(f, op, indent);
        }

        // Entry args: block ids, thread ids, grid dims, block dims.
        for (label, ids, dims, sizes) in [
            ("blocks", &args[0..3], &args[6..9], &operands[0..3]),
            ("threads", &args[3..6], &args[9..12], &operands[3..6]),
        ] {
            write!(f, " {}(", label)?;
            self.fmt_values(f, ids)?;
            write!(f, ") in (")?;
            for (i, (dim, size)) in dims.iter().zip(sizes).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} = {}", self.name(dim), self.name(size))?;
            }
            write!(f, ")")?;
        }

        let data = &operands[GpuOp::NUM_CONFIG_OPERANDS..];
        let data_args = &args[GpuOp::NUM_INDEX_ARGUMENTS..];
        if !data.is_empty() {
            write!(f, " args(")?;
            for (i, (arg, value)) in data_args.iter().zip(data).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let ty = program.value_type(*value).map_err(|_| fmt::Error)?;
                write!(f, "{} = {} : {}", self.name(arg), self.name(value), ty)?;
            }
            write!(f, ")")?;
        }
        self.fmt_body(f, op, indent)
    }
}
