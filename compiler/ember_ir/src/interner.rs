//! String interner for identifier storage.
//!
//! Provides O(1) interning and lookup. Interned strings live for the
//! lifetime of the interner; lookups hand out `&'static str` slices that
//! are only ever created from leaked boxes owned by the interner itself.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct InternState {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::index()`.
    strings: Vec<&'static str>,
}

/// String interner.
///
/// A compilation creates one interner and threads a shared reference
/// through every stage. The lock keeps the read path (`lookup`) cheap;
/// compilation itself is single-threaded, the lock is there so the
/// interner can be held behind `&self` everywhere.
pub struct StringInterner {
    state: RwLock<InternState>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        let empty: &'static str = "";
        map.insert(empty, 0);
        Self {
            state: RwLock::new(InternState {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its `Name`.
    ///
    /// Interning the same content twice returns the same `Name`.
    pub fn intern(&self, s: &str) -> Name {
        {
            let state = self.state.read();
            if let Some(&idx) = state.map.get(s) {
                return Name::from_raw(idx);
            }
        }

        let mut state = self.state.write();
        // Re-check under the write lock.
        if let Some(&idx) = state.map.get(s) {
            return Name::from_raw(idx);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        #[expect(
            clippy::cast_possible_truncation,
            reason = "a single compilation never interns 4 billion identifiers"
        )]
        let idx = state.strings.len() as u32;
        state.strings.push(leaked);
        state.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Resolve a `Name` back to its string content.
    pub fn lookup(&self, name: Name) -> &'static str {
        let state = self.state.read();
        state.strings.get(name.index()).copied().unwrap_or("")
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.state.read().strings.len()
    }

    /// True when only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
