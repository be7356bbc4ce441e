//! Syntax tree and interning types for the Ember compiler.
//!
//! Ember's front end (parser + symbol table) is an external collaborator;
//! this crate defines the tree it hands to the backend:
//!
//! - [`Name`] / [`StringInterner`] — compact interned identifiers
//! - [`Span`] — byte offsets into the original script
//! - [`ExprArena`] — flat storage for expressions, statements and blocks,
//!   addressed by copyable ids
//! - [`ast`] — the node kinds of the constrained script subset
//!
//! The arena layout follows an index-based design: nodes reference each
//! other through `ExprId`/`StmtId`/`BlockId` rather than boxed pointers,
//! so analysis passes can attach side tables indexed by id.

pub mod ast;

mod arena;
mod interner;
mod name;
mod span;

pub use arena::{BlockId, DictEntry, ExprArena, ExprId, ExprRange, StmtId, StmtRange};
pub use ast::{BinaryOp, Block, Expr, ExprKind, Function, Module, Param, Stmt, StmtKind, UnaryOp};
pub use interner::StringInterner;
pub use name::Name;
pub use span::Span;
