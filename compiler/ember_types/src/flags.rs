//! Classification flags derived from a type.

use bitflags::bitflags;

bitflags! {
    /// Storage classification of a type, derived once by the interner
    /// and consumed by the memory manager and lifetime tracker.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct TypeFlags: u8 {
        /// Values own a heap buffer.
        const HEAP = 1 << 0;
        /// The buffer can grow; capacity is not known at compile time.
        const DYNAMIC = 1 << 1;
        /// Values must be released exactly once when their owner dies.
        const NEEDS_FREE = 1 << 2;
    }
}

impl TypeFlags {
    pub fn is_heap(self) -> bool {
        self.contains(TypeFlags::HEAP)
    }

    pub fn needs_free(self) -> bool {
        self.contains(TypeFlags::NEEDS_FREE)
    }
}
