//! Attributes: compile-time metadata attached to operations by name.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Name of the symbol attribute on functions and modules.
pub const SYM_NAME_ATTR: &str = "sym_name";
/// Name of the signature attribute on functions.
pub const FUNCTION_TYPE_ATTR: &str = "type";
/// Unit attribute marking a function as a kernel entry point.
pub const KERNEL_FUNC_ATTR: &str = "gpu.kernel";
/// Unit attribute marking a module as a kernel container.
pub const KERNEL_MODULE_ATTR: &str = "gpu.kernel_module";
/// Symbol reference from `gpu.launch_func` to its kernel.
pub const KERNEL_ATTR: &str = "kernel";
/// Symbol reference from `call` to its callee.
pub const CALLEE_ATTR: &str = "callee";

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    /// Presence-only marker.
    Unit,
    Bool(bool),
    Integer(i64),
    String(String),
    /// Reference to a symbol by name.
    Symbol(String),
    Type(Type),
}

impl Attribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(s) | Attribute::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Attribute::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Unit => Ok(()),
            Attribute::Bool(b) => write!(f, "{}", b),
            Attribute::Integer(i) => write!(f, "{}", i),
            Attribute::String(s) => write!(f, "{:?}", s),
            Attribute::Symbol(s) => write!(f, "@{}", s),
            Attribute::Type(ty) => write!(f, "{}", ty),
        }
    }
}

/// Insertion-ordered attribute dictionary.
pub type AttributeMap = IndexMap<String, Attribute>;
