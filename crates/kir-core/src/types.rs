//! The kir type system.
//!
//! Values carry structural types: scalars, the machine-sized `index` type
//! used for parallel-execution coordinates, ranked memrefs for device
//! buffers, and function signatures. Types compare structurally.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar (primitive) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::I1 => "i1",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }
}

/// A function signature: ordered parameter types and result types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionType {
    pub inputs: Vec<Type>,
    pub results: Vec<Type>,
}

impl FunctionType {
    pub fn new(inputs: Vec<Type>, results: Vec<Type>) -> Self {
        FunctionType { inputs, results }
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

/// The kir type system. Each variant represents a distinct kind of type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Scalar types.
    Scalar(ScalarType),

    /// Target-sized integer used for ids and dimensions.
    Index,

    /// Buffer of scalars. `None` extents are dynamic (`?`).
    MemRef {
        element: ScalarType,
        shape: Vec<Option<u64>>,
    },

    /// Function signature.
    Function(FunctionType),
}

impl Type {
    pub const I1: Type = Type::Scalar(ScalarType::I1);
    pub const I32: Type = Type::Scalar(ScalarType::I32);
    pub const I64: Type = Type::Scalar(ScalarType::I64);
    pub const F32: Type = Type::Scalar(ScalarType::F32);
    pub const F64: Type = Type::Scalar(ScalarType::F64);

    /// One-dimensional buffer with a dynamic extent.
    pub fn dynamic_memref(element: ScalarType) -> Type {
        Type::MemRef {
            element,
            shape: vec![None],
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(s) => write!(f, "{}", s.as_str()),
            Type::Index => write!(f, "index"),
            Type::MemRef { element, shape } => {
                write!(f, "memref<")?;
                for extent in shape {
                    match extent {
                        Some(n) => write!(f, "{}x", n)?,
                        None => write!(f, "?x")?,
                    }
                }
                write!(f, "{}>", element.as_str())
            }
            Type::Function(ty) => write!(f, "{}", ty),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", input)?;
        }
        write!(f, ") -> (")?;
        for (i, result) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", result)?;
        }
        write!(f, ")")
    }
}

/// Constant literal values carried by `constant` ops.
///
/// Note: `F32` stores its value as `f64` internally so the enum can derive
/// `PartialEq` without a separate float wrapper; narrowing happens when the
/// constant is lowered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    Index(i64),
    /// Stored as f64 internally. See type docs.
    F32(f64),
    F64(f64),
}

impl ConstValue {
    /// The type of the value this literal materializes.
    pub fn ty(&self) -> Type {
        match self {
            ConstValue::Bool(_) => Type::I1,
            ConstValue::I32(_) => Type::I32,
            ConstValue::I64(_) => Type::I64,
            ConstValue::Index(_) => Type::Index,
            ConstValue::F32(_) => Type::F32,
            ConstValue::F64(_) => Type::F64,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{}", v),
            ConstValue::I32(v) => write!(f, "{}", v),
            ConstValue::I64(v) => write!(f, "{}", v),
            ConstValue::Index(v) => write!(f, "{}", v),
            ConstValue::F32(v) | ConstValue::F64(v) => write!(f, "{:?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_value_types() {
        assert_eq!(ConstValue::I32(42).ty(), Type::I32);
        assert_eq!(ConstValue::Index(3).ty(), Type::Index);
        assert_eq!(ConstValue::F32(1.5).ty(), Type::F32);
        assert_eq!(ConstValue::Bool(true).ty(), Type::I1);
    }

    #[test]
    fn display_memref_and_function() {
        assert_eq!(Type::dynamic_memref(ScalarType::F32).to_string(), "memref<?xf32>");
        let fixed = Type::MemRef {
            element: ScalarType::I32,
            shape: vec![Some(4), Some(8)],
        };
        assert_eq!(fixed.to_string(), "memref<4x8xi32>");

        let sig = FunctionType::new(vec![Type::Index, Type::F32], vec![]);
        assert_eq!(sig.to_string(), "(index, f32) -> ()");
    }

    #[test]
    fn display_float_constants_keep_decimal_point() {
        assert_eq!(ConstValue::F32(2.0).to_string(), "2.0");
        assert_eq!(ConstValue::I32(-7).to_string(), "-7");
    }

    #[test]
    fn structural_equality() {
        assert_eq!(
            Type::Function(FunctionType::new(vec![Type::Index], vec![])),
            Type::Function(FunctionType::new(vec![Type::Index], vec![]))
        );
        assert_ne!(Type::I32, Type::I64);
    }

    #[test]
    fn serde_roundtrip_type() {
        let ty = Type::Function(FunctionType::new(
            vec![Type::dynamic_memref(ScalarType::F32), Type::Index],
            vec![],
        ));
        let json = serde_json::to_string(&ty).unwrap();
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }
}
