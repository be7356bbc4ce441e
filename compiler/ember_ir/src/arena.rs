//! Flat arena storage for the syntax tree.
//!
//! Expressions, statements and blocks live in contiguous vectors and
//! reference each other through copyable index ids. Child lists (call
//! arguments, array elements, dict entries) are stored out-of-line in
//! shared sideband vectors addressed by ranges, so a node stays small
//! and `Copy`-friendly.

use crate::ast::{Block, Expr, ExprKind, Stmt, StmtKind};
use crate::{Name, Span};

/// Index of an expression in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }
}

/// Index of a statement in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct StmtId(u32);

impl StmtId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a block in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A contiguous run of entries in the expression list sideband.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ExprRange {
    start: u32,
    len: u32,
}

impl ExprRange {
    pub const EMPTY: ExprRange = ExprRange { start: 0, len: 0 };

    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// A contiguous run of statements.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StmtRange {
    start: u32,
    len: u32,
}

impl StmtRange {
    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// One `key: value` entry of a dict literal.
///
/// Keys in the supported subset are always string literals, so the key
/// is an interned `Name` rather than an expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct DictEntry {
    pub key: Name,
    pub value: ExprId,
}

/// Arena holding every node of one compilation unit.
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    blocks: Vec<Block>,
    /// Out-of-line expression lists (arguments, array elements).
    expr_lists: Vec<ExprId>,
    /// Out-of-line dict literal entries.
    dict_entries: Vec<DictEntry>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self {
            exprs: Vec::new(),
            stmts: Vec::new(),
            blocks: Vec::new(),
            expr_lists: Vec::new(),
            dict_entries: Vec::new(),
        }
    }

    /// Total number of expressions, for sizing side tables.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Total number of statements, for sizing side tables.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    // Construction (used by the external front end and by tests)

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(u32_len(self.exprs.len()));
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn alloc_expr_list(&mut self, items: &[ExprId]) -> ExprRange {
        let start = u32_len(self.expr_lists.len());
        self.expr_lists.extend_from_slice(items);
        ExprRange {
            start,
            len: u32_len(items.len()),
        }
    }

    pub fn alloc_dict_entries(&mut self, entries: &[DictEntry]) -> ExprRange {
        let start = u32_len(self.dict_entries.len());
        self.dict_entries.extend_from_slice(entries);
        ExprRange {
            start,
            len: u32_len(entries.len()),
        }
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId(u32_len(self.stmts.len()));
        self.stmts.push(Stmt { kind, span });
        id
    }

    /// Group previously allocated statements into a block.
    ///
    /// The statements must have been allocated contiguously; the block
    /// records the run from `first` through the current end of storage.
    pub fn alloc_block(&mut self, stmts: &[StmtId]) -> BlockId {
        let range = match stmts.first() {
            Some(first) => StmtRange {
                start: first.0,
                len: u32_len(stmts.len()),
            },
            None => StmtRange::default(),
        };
        let id = BlockId(u32_len(self.blocks.len()));
        self.blocks.push(Block { stmts: range });
        id
    }

    // Access

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Resolve an expression list range to its ids.
    pub fn expr_list(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.start as usize..(range.start + range.len) as usize]
    }

    /// Resolve a dict entry range.
    pub fn dict_entries(&self, range: ExprRange) -> &[DictEntry] {
        &self.dict_entries[range.start as usize..(range.start + range.len) as usize]
    }

    /// Iterate a block's statements with their ids.
    pub fn block_stmts(&self, id: BlockId) -> impl Iterator<Item = (StmtId, &Stmt)> {
        let range = self.blocks[id.index()].stmts;
        let start = range.start as usize;
        self.stmts[start..start + range.len()]
            .iter()
            .enumerate()
            .map(move |(i, stmt)| (StmtId(range.start + u32_len(i)), stmt))
    }
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "arena sizes are bounded well below u32::MAX for one script"
)]
#[inline]
fn u32_len(len: usize) -> u32 {
    len as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;

    #[test]
    fn expr_roundtrip() {
        let mut arena = ExprArena::new();
        let id = arena.alloc_expr(ExprKind::Number(7), Span::new(0, 1));
        assert!(matches!(arena.expr(id).kind, ExprKind::Number(7)));
        assert_eq!(arena.expr_count(), 1);
    }

    #[test]
    fn expr_list_roundtrip() {
        let mut arena = ExprArena::new();
        let a = arena.alloc_expr(ExprKind::Number(1), Span::DUMMY);
        let b = arena.alloc_expr(ExprKind::Number(2), Span::DUMMY);
        let range = arena.alloc_expr_list(&[a, b]);
        assert_eq!(arena.expr_list(range), &[a, b]);
    }

    #[test]
    fn block_stmts_carry_ids() {
        let mut arena = ExprArena::new();
        let e = arena.alloc_expr(ExprKind::Number(3), Span::DUMMY);
        let s0 = arena.alloc_stmt(StmtKind::Expr(e), Span::DUMMY);
        let s1 = arena.alloc_stmt(StmtKind::Expr(e), Span::DUMMY);
        let block = arena.alloc_block(&[s0, s1]);

        let ids: Vec<StmtId> = arena.block_stmts(block).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![s0, s1]);
    }

    #[test]
    fn empty_block() {
        let mut arena = ExprArena::new();
        let block = arena.alloc_block(&[]);
        assert_eq!(arena.block_stmts(block).count(), 0);
    }
}
