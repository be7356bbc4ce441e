//! Registries for runtime fragments, entry snippets, and trailer blocks.
//!
//! Resolvers never write helper C directly; they *declare* a dependency
//! by key while building a node, and the assembler drains the registry
//! once at the end to lay the fragments out ahead of user code. Keys
//! marked unique collapse to a single emission at their *latest*
//! declaration position, so a helper that many call sites need still
//! appears exactly once, after everything declared before its final use.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// A catalog entry: a named fragment of support C.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub key: &'static str,
    /// Collapse repeated declarations to one emission at the latest
    /// declaration position.
    pub unique: bool,
    /// Keys that must be emitted before this one.
    pub requires: &'static [&'static str],
    pub code: &'static str,
}

/// Declaration of a key absent from the catalog. Fatal: the translation
/// unit would reference a helper that does not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDependency {
    pub key: String,
}

impl fmt::Display for UnknownDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unregistered dependency `{}`", self.key)
    }
}

impl std::error::Error for UnknownDependency {}

/// Accumulates dependency declarations during emission; drained exactly
/// once by the assembler.
pub struct DependencyRegistry {
    catalog: FxHashMap<&'static str, Fragment>,
    /// Declaration order. Unique keys move to the end on redeclaration.
    order: Vec<&'static str>,
    drained: bool,
}

impl DependencyRegistry {
    pub fn new(catalog: &[Fragment]) -> Self {
        let mut map = FxHashMap::default();
        for fragment in catalog {
            debug_assert!(
                !map.contains_key(fragment.key),
                "duplicate catalog key `{}`",
                fragment.key
            );
            map.insert(fragment.key, *fragment);
        }
        DependencyRegistry {
            catalog: map,
            order: Vec::new(),
            drained: false,
        }
    }

    /// Record that emitted code needs `key`'s fragment.
    pub fn declare(&mut self, key: &str) -> Result<(), UnknownDependency> {
        debug_assert!(!self.drained, "declaration after drain");
        let Some(fragment) = self.catalog.get(key) else {
            return Err(UnknownDependency {
                key: key.to_owned(),
            });
        };
        let key = fragment.key;

        if fragment.unique {
            // Latest declaration wins the position.
            self.order.retain(|&existing| existing != key);
        }
        self.order.push(key);
        tracing::trace!(key, "dependency declared");
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drain in emission order: declaration order, with each fragment's
    /// prerequisites hoisted in front of its first emission. One-shot.
    pub fn drain(&mut self) -> Vec<Fragment> {
        debug_assert!(!self.drained, "registry drained twice");
        self.drained = true;

        let mut emitted: FxHashSet<&'static str> = FxHashSet::default();
        let mut out = Vec::new();
        let order = std::mem::take(&mut self.order);

        for key in order {
            self.emit_with_requires(key, &mut emitted, &mut out);
        }
        out
    }

    fn emit_with_requires(
        &self,
        key: &'static str,
        emitted: &mut FxHashSet<&'static str>,
        out: &mut Vec<Fragment>,
    ) {
        let Some(fragment) = self.catalog.get(key) else {
            // declare() already vetted every key.
            return;
        };
        if fragment.unique && emitted.contains(key) {
            return;
        }
        emitted.insert(key);

        for &required in fragment.requires {
            self.emit_with_requires(required, emitted, out);
        }
        out.push(*fragment);
    }
}

/// Snippets to run at the top of `main`, before user statements.
/// Declared by resolvers at construction time, drained once.
#[derive(Default)]
pub struct EntryRegistry {
    snippets: Vec<String>,
    drained: bool,
}

impl EntryRegistry {
    pub fn push(&mut self, snippet: impl Into<String>) {
        debug_assert!(!self.drained, "entry snippet after drain");
        self.snippets.push(snippet.into());
    }

    /// Push unless an identical snippet is already queued.
    pub fn push_unique(&mut self, snippet: impl Into<String>) {
        let snippet = snippet.into();
        if !self.snippets.contains(&snippet) {
            self.push(snippet);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn drain(&mut self) -> Vec<String> {
        debug_assert!(!self.drained, "entry registry drained twice");
        self.drained = true;
        std::mem::take(&mut self.snippets)
    }
}

/// Blocks appended after the whole translation unit, in declaration
/// order. Used for support code that must follow every definition.
#[derive(Default)]
pub struct PostProgramRegistry {
    blocks: Vec<String>,
    drained: bool,
}

impl PostProgramRegistry {
    pub fn push(&mut self, block: impl Into<String>) {
        debug_assert!(!self.drained, "trailer block after drain");
        self.blocks.push(block.into());
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn drain(&mut self) -> Vec<String> {
        debug_assert!(!self.drained, "trailer registry drained twice");
        self.drained = true;
        std::mem::take(&mut self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &[Fragment] = &[
        Fragment {
            key: "alpha",
            unique: true,
            requires: &[],
            code: "/* alpha */",
        },
        Fragment {
            key: "beta",
            unique: true,
            requires: &["alpha"],
            code: "/* beta */",
        },
        Fragment {
            key: "gamma",
            unique: false,
            requires: &[],
            code: "/* gamma */",
        },
    ];

    fn keys(fragments: &[Fragment]) -> Vec<&'static str> {
        fragments.iter().map(|f| f.key).collect()
    }

    #[test]
    fn unique_key_emits_once_at_latest_position() {
        let mut registry = DependencyRegistry::new(CATALOG);
        assert_eq!(registry.declare("alpha"), Ok(()));
        assert_eq!(registry.declare("gamma"), Ok(()));
        assert_eq!(registry.declare("alpha"), Ok(()));

        assert_eq!(keys(&registry.drain()), vec!["gamma", "alpha"]);
    }

    #[test]
    fn requires_hoisted_before_dependent() {
        let mut registry = DependencyRegistry::new(CATALOG);
        assert_eq!(registry.declare("beta"), Ok(()));

        assert_eq!(keys(&registry.drain()), vec!["alpha", "beta"]);
    }

    #[test]
    fn required_key_not_duplicated_by_later_declaration() {
        let mut registry = DependencyRegistry::new(CATALOG);
        assert_eq!(registry.declare("beta"), Ok(()));
        assert_eq!(registry.declare("alpha"), Ok(()));

        // alpha's latest declaration comes after beta, but the
        // prerequisite edge keeps it in front; the later declaration
        // does not re-emit it.
        assert_eq!(keys(&registry.drain()), vec!["alpha", "beta"]);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut registry = DependencyRegistry::new(CATALOG);
        assert_eq!(
            registry.declare("delta"),
            Err(UnknownDependency {
                key: "delta".to_owned()
            })
        );
    }

    #[test]
    fn non_unique_key_repeats() {
        let mut registry = DependencyRegistry::new(CATALOG);
        assert_eq!(registry.declare("gamma"), Ok(()));
        assert_eq!(registry.declare("gamma"), Ok(()));

        assert_eq!(keys(&registry.drain()), vec!["gamma", "gamma"]);
    }

    #[test]
    fn entry_registry_preserves_order() {
        let mut entries = EntryRegistry::default();
        entries.push("regex_clear_matches();");
        entries.push("srand(0);");
        assert_eq!(
            entries.drain(),
            vec!["regex_clear_matches();".to_owned(), "srand(0);".to_owned()]
        );
    }
}
