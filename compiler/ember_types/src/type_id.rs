//! Interned type identifier.

use std::fmt;

/// Interned type identifier.
///
/// Scalars are pre-interned at fixed indices so the common cases compare
/// without touching the interner. Compound types get ids in interning
/// order starting at [`TypeId::FIRST_COMPOUND`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// 16-bit signed integer, the subset's only numeric type.
    pub const NUMBER: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    /// Heap string.
    pub const STR: TypeId = TypeId(2);
    pub const VOID: TypeId = TypeId(3);
    /// Placeholder where inference failed; never emitted as a C type.
    pub const ERROR: TypeId = TypeId(4);

    /// First id available for compound types.
    pub const FIRST_COMPOUND: u32 = 5;

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// True for the pre-interned scalar/void/error ids.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::FIRST_COMPOUND
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TypeId::NUMBER => write!(f, "TypeId(number)"),
            TypeId::BOOL => write!(f, "TypeId(bool)"),
            TypeId::STR => write!(f, "TypeId(str)"),
            TypeId::VOID => write!(f, "TypeId(void)"),
            TypeId::ERROR => write!(f, "TypeId(error)"),
            TypeId(raw) => write!(f, "TypeId({raw})"),
        }
    }
}
