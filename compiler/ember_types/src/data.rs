//! Type representations.

use ember_ir::Name;

use crate::TypeId;

/// Array capacity classification.
///
/// An array is `Dynamic` iff any growth operation (push/unshift/splice/
/// insert) is observed against it anywhere in its defining scope chain;
/// otherwise it stays `Fixed` at its literal length and lives in a plain
/// C array with no heap buffer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Capacity {
    Fixed(u32),
    Dynamic,
}

impl Capacity {
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Capacity::Dynamic)
    }
}

/// The concrete low-level representation of a binding or expression.
///
/// Struct shapes carry their fields only — structural equality through
/// the interner is what deduplicates identical object shapes across the
/// whole program. The emitted typedef name derives from the `TypeId`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    /// 16-bit signed integer.
    Number,
    Bool,
    /// Heap string buffer.
    Str,
    Void,
    /// Inference failure placeholder.
    Error,
    Array {
        elem: TypeId,
        capacity: Capacity,
    },
    /// String-keyed dict with a homogeneous value type.
    Dict {
        value: TypeId,
    },
    /// Fixed object shape: ordered `(field, type)` pairs.
    Struct {
        fields: Vec<(Name, TypeId)>,
    },
    /// Forward-declarable function signature.
    Prototype {
        params: Vec<TypeId>,
        ret: TypeId,
    },
}

impl TypeData {
    /// True when values of this type own a heap buffer that must be
    /// freed exactly once.
    pub fn is_heap(&self) -> bool {
        match self {
            TypeData::Str | TypeData::Dict { .. } => true,
            TypeData::Array { capacity, .. } => capacity.is_dynamic(),
            _ => false,
        }
    }
}
