//! Storage classification and temporary-slot planning.
//!
//! A whole-file pre-scan registers every call-site temporary before any
//! emission begins, so forward references resolve consistently.
//! Reservation is deterministic and idempotent: asking for the same
//! expression's temporary twice yields the same name.
//!
//! Slot reuse is deliberately narrow. Within one statement a scalar
//! slot freed by an already-consumed subexpression may back a later
//! temporary of the same type; heap-owning temporaries are never pooled
//! because their pointer must survive to the end-of-statement release.
//! Slots are not shared across statements, and never across loop
//! iterations, since there is no liveness proof spanning a back edge.

use ember_ir::{ExprArena, ExprId, ExprKind, Module, StmtId, StmtKind, StringInterner};
use ember_types::{BindingId, Capacity, OracleResult, TypeData, TypeId, TypeInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resolver::{ReceiverKind, ResolverRegistry};

/// How a binding's value is stored in the emitted C.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StorageClass {
    /// Plain value on the C stack; nothing to release.
    Value,
    /// The binding owns a heap buffer and must be released when it dies.
    HeapOwned,
}

/// One reserved temporary, emitted as a global declaration.
#[derive(Clone, Debug)]
pub struct TempSlot {
    pub name: String,
    pub ty: TypeId,
}

/// Where an expression sits relative to its statement, which decides
/// whether its result needs a temporary at all.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Position {
    /// `let x = <here>;` — the binding adopts the result directly.
    LetInit,
    /// `<here>;` — the result is discarded.
    StmtRoot,
    /// `return <here>;` — ownership transfers to the caller.
    ReturnRoot,
    /// Consumed by an enclosing expression.
    Nested,
}

/// Classifies bindings and plans temporary slots for one module.
pub struct MemoryManager<'a> {
    arena: &'a ExprArena,
    names: &'a StringInterner,
    types: &'a TypeInterner,
    oracle: &'a OracleResult,
    resolvers: &'a ResolverRegistry,
    slots: Vec<TempSlot>,
    reserved: FxHashMap<ExprId, usize>,
    reused: FxHashSet<ExprId>,
    /// Dedicated length slot per shrinking fixed-capacity array.
    fixed_lens: FxHashMap<BindingId, usize>,
}

impl<'a> MemoryManager<'a> {
    pub fn new(
        arena: &'a ExprArena,
        names: &'a StringInterner,
        types: &'a TypeInterner,
        oracle: &'a OracleResult,
        resolvers: &'a ResolverRegistry,
    ) -> Self {
        MemoryManager {
            arena,
            names,
            types,
            oracle,
            resolvers,
            slots: Vec::new(),
            reserved: FxHashMap::default(),
            reused: FxHashSet::default(),
            fixed_lens: FxHashMap::default(),
        }
    }

    /// Storage class of a type.
    pub fn storage_class(&self, ty: TypeId) -> StorageClass {
        if self.types.flags(ty).needs_free() {
            StorageClass::HeapOwned
        } else {
            StorageClass::Value
        }
    }

    /// Whole-file pre-scan: reserve every call-site temporary and a
    /// length slot for each fixed array that shrinks in place.
    pub fn preprocess(&mut self, module: &Module) {
        for &binding in &self.oracle.shrunk {
            let ty = self.oracle.binding_type(binding);
            if let TypeData::Array {
                capacity: Capacity::Fixed(_),
                ..
            } = self.types.lookup(ty)
            {
                let idx = self.slots.len();
                self.slots.push(TempSlot {
                    name: format!("_tmp{idx}"),
                    ty: TypeId::NUMBER,
                });
                self.fixed_lens.insert(binding, idx);
            }
        }

        for function in &module.functions {
            self.scan_block(function.body);
        }
        if let Some(top) = module.top_level {
            self.scan_block(top);
        }
        tracing::debug!(slots = self.slots.len(), "temporary slots planned");
    }

    /// The global slot tracking a shrinking fixed array's live length.
    pub fn fixed_len_name(&self, binding: BindingId) -> Option<&str> {
        self.fixed_lens
            .get(&binding)
            .map(|&slot| self.slots[slot].name.as_str())
    }

    fn scan_block(&mut self, block: ember_ir::BlockId) {
        let stmt_ids: Vec<StmtId> = self
            .arena
            .block_stmts(block)
            .map(|(id, _)| id)
            .collect();
        for id in stmt_ids {
            self.scan_stmt(id);
        }
    }

    /// One statement is one reuse unit: the scalar pool starts empty and
    /// is discarded at the end.
    fn scan_stmt(&mut self, id: StmtId) {
        let kind = self.arena.stmt(id).kind.clone();
        let mut pool: Vec<usize> = Vec::new();
        match kind {
            StmtKind::Let { init, .. } => {
                self.scan_expr(init, Position::LetInit, &mut pool);
            }
            StmtKind::Expr(expr) => {
                self.scan_expr(expr, Position::StmtRoot, &mut pool);
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.scan_expr(cond, Position::Nested, &mut pool);
                self.scan_block(then_block);
                if let Some(else_block) = else_block {
                    self.scan_block(else_block);
                }
            }
            StmtKind::While { cond, body } => {
                self.scan_expr(cond, Position::Nested, &mut pool);
                self.scan_block(body);
            }
            StmtKind::Return(Some(expr)) => {
                self.scan_expr(expr, Position::ReturnRoot, &mut pool);
            }
            StmtKind::Return(None) => {}
        }
    }

    /// Post-order slot assignment. Returns the scalar slots this subtree
    /// holds live for its consumer; the consumer releases them into the
    /// pool only after reserving its own slot, so a parent never shares
    /// storage with a simultaneously live child.
    fn scan_expr(&mut self, id: ExprId, position: Position, pool: &mut Vec<usize>) -> Vec<usize> {
        let kind = self.arena.expr(id).kind.clone();
        let mut child_slots = Vec::new();

        match &kind {
            ExprKind::Array(items) | ExprKind::Call { args: items, .. } => {
                for &item in self.arena.expr_list(*items) {
                    child_slots.extend(self.scan_expr(item, Position::Nested, pool));
                }
            }
            ExprKind::Dict(entries) => {
                let values: Vec<ExprId> = self
                    .arena
                    .dict_entries(*entries)
                    .iter()
                    .map(|e| e.value)
                    .collect();
                for value in values {
                    child_slots.extend(self.scan_expr(value, Position::Nested, pool));
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                child_slots.extend(self.scan_expr(*lhs, Position::Nested, pool));
                child_slots.extend(self.scan_expr(*rhs, Position::Nested, pool));
            }
            ExprKind::Unary { operand, .. } => {
                child_slots.extend(self.scan_expr(*operand, Position::Nested, pool));
            }
            ExprKind::Method { receiver, args, .. } => {
                child_slots.extend(self.scan_expr(*receiver, Position::Nested, pool));
                for &arg in self.arena.expr_list(*args) {
                    child_slots.extend(self.scan_expr(arg, Position::Nested, pool));
                }
            }
            ExprKind::Member { receiver, .. } => {
                child_slots.extend(self.scan_expr(*receiver, Position::Nested, pool));
            }
            ExprKind::Index { receiver, index } => {
                child_slots.extend(self.scan_expr(*receiver, Position::Nested, pool));
                child_slots.extend(self.scan_expr(*index, Position::Nested, pool));
            }
            ExprKind::Assign { target, value } => {
                child_slots.extend(self.scan_expr(*target, Position::Nested, pool));
                child_slots.extend(self.scan_expr(*value, Position::Nested, pool));
            }
            ExprKind::Number(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_)
            | ExprKind::Error => {}
        }

        if self.wants_temp(id, &kind, position) {
            let own = self.reserve(id, self.oracle.expr_type(id), pool);
            // Children are dead once this node's value is materialized.
            pool.extend(child_slots);
            if self.types.flags(self.slots[own].ty).needs_free() {
                Vec::new()
            } else {
                vec![own]
            }
        } else {
            // No materialization here: the children stay live for
            // whichever ancestor finally consumes them.
            child_slots
        }
    }

    /// Does this expression's result need a reserved temporary here?
    fn wants_temp(&self, id: ExprId, kind: &ExprKind, position: Position) -> bool {
        if self.is_out_param_call(kind) {
            match position {
                // The binding itself is the out destination.
                Position::LetInit => false,
                // Result discarded; the shared scratch slot takes it,
                // unless the popped value owns heap and must be freed.
                Position::StmtRoot => {
                    let ty = self.out_param_result_type(kind);
                    self.types.flags(ty).needs_free()
                }
                Position::ReturnRoot | Position::Nested => true,
            }
        } else if self.produces_fresh_heap(id, kind) {
            match position {
                // Adoption: the binding or the caller takes the buffer.
                Position::LetInit | Position::ReturnRoot => false,
                Position::StmtRoot | Position::Nested => true,
            }
        } else {
            false
        }
    }

    /// Calls that emit through an out-parameter macro rather than a
    /// value-returning expression.
    fn is_out_param_call(&self, kind: &ExprKind) -> bool {
        let ExprKind::Method {
            receiver, method, ..
        } = kind
        else {
            return false;
        };
        let receiver_ty = self.oracle.expr_type(*receiver);
        let method = self.names.lookup(*method);
        match self.types.lookup(receiver_ty) {
            TypeData::Array { .. } => matches!(method, "pop" | "shift" | "indexOf"),
            TypeData::Dict { .. } => method == "get",
            _ => false,
        }
    }

    fn out_param_result_type(&self, kind: &ExprKind) -> TypeId {
        let ExprKind::Method {
            receiver, method, ..
        } = kind
        else {
            return TypeId::ERROR;
        };
        let receiver_ty = self.oracle.expr_type(*receiver);
        let method = self.names.lookup(*method);
        match self.types.lookup(receiver_ty) {
            TypeData::Array { elem, .. } => match method {
                "pop" | "shift" => elem,
                _ => TypeId::NUMBER,
            },
            TypeData::Dict { value } => value,
            _ => TypeId::ERROR,
        }
    }

    /// Expressions whose evaluation allocates a fresh heap buffer that
    /// somebody must eventually release.
    fn produces_fresh_heap(&self, id: ExprId, kind: &ExprKind) -> bool {
        match kind {
            ExprKind::Method {
                receiver, method, ..
            } => {
                // The dispatch table is the single authority on which
                // calls hand back a disposable buffer.
                let data = self.types.lookup(self.oracle.expr_type(*receiver));
                let method = self.names.lookup(*method);
                ReceiverKind::of_type(&data)
                    .and_then(|kind| self.resolvers.resolve(kind, method))
                    .is_some_and(|resolver| resolver.disposes)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                // String `+` allocates via str_cat / str_int16_t_cat;
                // string comparison is a plain scalar.
                *op == ember_ir::BinaryOp::Add
                    && (self.oracle.expr_type(*lhs) == TypeId::STR
                        || self.oracle.expr_type(*rhs) == TypeId::STR)
            }
            // Dynamic literals allocate; fixed arrays live in place. A
            // user function returning a heap value hands ownership to
            // the call site.
            ExprKind::Array(_) | ExprKind::Dict(_) | ExprKind::Call { .. } => {
                self.types.flags(self.oracle.expr_type(id)).needs_free()
            }
            _ => false,
        }
    }

    /// Reserve (or reuse) a slot for `id`. Idempotent per expression.
    fn reserve(&mut self, id: ExprId, ty: TypeId, pool: &mut Vec<usize>) -> usize {
        if let Some(&slot) = self.reserved.get(&id) {
            return slot;
        }

        let poolable = !self.types.flags(ty).needs_free();
        let slot = if poolable {
            pool.iter()
                .position(|&candidate| self.slots[candidate].ty == ty)
                .map(|pos| pool.swap_remove(pos))
        } else {
            None
        };

        let slot = match slot {
            Some(reused) => {
                self.reused.insert(id);
                reused
            }
            None => {
                let idx = self.slots.len();
                self.slots.push(TempSlot {
                    name: format!("_tmp{idx}"),
                    ty,
                });
                idx
            }
        };
        self.reserved.insert(id, slot);
        slot
    }

    /// The reserved temporary backing `id`, if the pre-scan gave it one.
    pub fn reserved_temp_name(&self, id: ExprId) -> Option<&str> {
        self.reserved
            .get(&id)
            .map(|&slot| self.slots[slot].name.as_str())
    }

    /// True when `id`'s slot was recycled from an earlier temporary of
    /// the same statement rather than freshly declared.
    pub fn variable_was_reused(&self, id: ExprId) -> bool {
        self.reused.contains(&id)
    }

    /// Every planned slot, in declaration order.
    pub fn temp_declarations(&self) -> &[TempSlot] {
        &self.slots
    }
}
