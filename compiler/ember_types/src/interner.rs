//! Deduplicating type interner.
//!
//! Provides O(1) type interning, lookup, and equality comparison via
//! `TypeId`. Follows the same pattern as `StringInterner` in `ember_ir`.
//! Struct shapes hash by their field list, so two object literals with
//! the same shape anywhere in the program intern to the same id — that
//! is the whole-program struct deduplication the emitter relies on.

use ember_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{Capacity, TypeData, TypeFlags, TypeId};

struct InternState {
    /// Map from type data to id for deduplication.
    map: FxHashMap<TypeData, u32>,
    /// Storage indexed by `TypeId::index()`.
    types: Vec<TypeData>,
}

impl InternState {
    fn with_primitives() -> Self {
        // Pre-intern primitives at fixed indices matching TypeId constants.
        let primitives = [
            TypeData::Number, // 0 = TypeId::NUMBER
            TypeData::Bool,   // 1 = TypeId::BOOL
            TypeData::Str,    // 2 = TypeId::STR
            TypeData::Void,   // 3 = TypeId::VOID
            TypeData::Error,  // 4 = TypeId::ERROR
        ];

        let mut map = FxHashMap::default();
        let mut types = Vec::with_capacity(64);
        for (idx, data) in primitives.into_iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "primitives count is fixed and small"
            )]
            let idx_u32 = idx as u32;
            map.insert(data.clone(), idx_u32);
            types.push(data);
        }

        InternState { map, types }
    }
}

/// Deduplicating type interner.
pub struct TypeInterner {
    state: RwLock<InternState>,
}

impl TypeInterner {
    /// Create a new interner with pre-interned primitives.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(InternState::with_primitives()),
        }
    }

    /// Intern a type, returning its id. Structurally equal types always
    /// return the same id.
    pub fn intern(&self, data: TypeData) -> TypeId {
        {
            let state = self.state.read();
            if let Some(&idx) = state.map.get(&data) {
                return TypeId::from_raw(idx);
            }
        }

        let mut state = self.state.write();
        if let Some(&idx) = state.map.get(&data) {
            return TypeId::from_raw(idx);
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "one script never interns 4 billion types"
        )]
        let idx = state.types.len() as u32;
        state.types.push(data.clone());
        state.map.insert(data, idx);
        TypeId::from_raw(idx)
    }

    /// Look up the data for an id.
    pub fn lookup(&self, id: TypeId) -> TypeData {
        let state = self.state.read();
        state
            .types
            .get(id.index())
            .cloned()
            .unwrap_or(TypeData::Error)
    }

    // Convenience constructors

    pub fn array(&self, elem: TypeId, capacity: Capacity) -> TypeId {
        self.intern(TypeData::Array { elem, capacity })
    }

    pub fn dict(&self, value: TypeId) -> TypeId {
        self.intern(TypeData::Dict { value })
    }

    pub fn struct_type(&self, fields: Vec<(Name, TypeId)>) -> TypeId {
        self.intern(TypeData::Struct { fields })
    }

    pub fn prototype(&self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeData::Prototype { params, ret })
    }

    /// Derive classification flags for an id.
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        match self.lookup(id) {
            TypeData::Str | TypeData::Dict { .. } => {
                TypeFlags::HEAP | TypeFlags::NEEDS_FREE
            }
            TypeData::Array { capacity, .. } if capacity.is_dynamic() => {
                TypeFlags::HEAP | TypeFlags::DYNAMIC | TypeFlags::NEEDS_FREE
            }
            _ => TypeFlags::empty(),
        }
    }

    /// True when values of this type own a heap buffer.
    pub fn is_heap(&self, id: TypeId) -> bool {
        self.flags(id).is_heap()
    }

    /// Every interned struct shape, in first-interned order, with its id.
    pub fn struct_catalog(&self) -> Vec<(TypeId, Vec<(Name, TypeId)>)> {
        let state = self.state.read();
        state
            .types
            .iter()
            .enumerate()
            .filter_map(|(idx, data)| match data {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "index originates from a u32-bounded vector"
                )]
                TypeData::Struct { fields } => {
                    Some((TypeId::from_raw(idx as u32), fields.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives_preinterned() {
        let interner = TypeInterner::new();
        assert_eq!(interner.intern(TypeData::Number), TypeId::NUMBER);
        assert_eq!(interner.intern(TypeData::Str), TypeId::STR);
        assert_eq!(interner.lookup(TypeId::BOOL), TypeData::Bool);
    }

    #[test]
    fn arrays_dedupe_by_shape() {
        let interner = TypeInterner::new();
        let a = interner.array(TypeId::NUMBER, Capacity::Fixed(3));
        let b = interner.array(TypeId::NUMBER, Capacity::Fixed(3));
        let c = interner.array(TypeId::NUMBER, Capacity::Dynamic);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn structs_dedupe_structurally() {
        let interner = TypeInterner::new();
        let x = Name::from_raw(1);
        let y = Name::from_raw(2);

        let a = interner.struct_type(vec![(x, TypeId::NUMBER), (y, TypeId::STR)]);
        let b = interner.struct_type(vec![(x, TypeId::NUMBER), (y, TypeId::STR)]);
        let c = interner.struct_type(vec![(y, TypeId::STR), (x, TypeId::NUMBER)]);

        assert_eq!(a, b);
        // Field order is part of the shape.
        assert_ne!(a, c);
        assert_eq!(interner.struct_catalog().len(), 2);
    }

    #[test]
    fn heap_flags() {
        let interner = TypeInterner::new();
        let fixed = interner.array(TypeId::NUMBER, Capacity::Fixed(4));
        let dynamic = interner.array(TypeId::NUMBER, Capacity::Dynamic);
        let dict = interner.dict(TypeId::STR);

        assert!(!interner.is_heap(TypeId::NUMBER));
        assert!(!interner.is_heap(fixed));
        assert!(interner.is_heap(TypeId::STR));
        assert!(interner.is_heap(dynamic));
        assert!(interner.flags(dynamic).contains(TypeFlags::DYNAMIC));
        assert!(interner.flags(dict).needs_free());
    }

    #[test]
    fn unknown_id_is_error() {
        let interner = TypeInterner::new();
        assert_eq!(interner.lookup(TypeId::from_raw(9999)), TypeData::Error);
    }
}
