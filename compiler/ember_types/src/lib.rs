//! Low-level type model and inference for the Ember compiler.
//!
//! The script source is dynamically typed; the target is ANSI C without a
//! collector. This crate bridges the two: every binding and expression is
//! assigned exactly one concrete low-level representation ([`TypeData`],
//! interned as a [`TypeId`]) before any code is emitted.
//!
//! - [`TypeInterner`] — deduplicating storage; struct shapes are
//!   structurally unique across the whole program
//! - [`TypeFlags`] — heap/dynamic classification consumed by the memory
//!   manager and lifetime tracker
//! - [`TypeOracle`] — the single-pass inference walk

mod data;
mod flags;
mod interner;
mod oracle;
mod type_id;

pub use data::{Capacity, TypeData};
pub use flags::TypeFlags;
pub use interner::TypeInterner;
pub use oracle::{BindingId, FunctionSig, OracleResult, TypeOracle};
pub use type_id::TypeId;
