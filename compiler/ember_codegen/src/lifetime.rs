//! Heap-lifetime analysis: decides where every buffer is released.
//!
//! The target has no collector, so every allocation needs a statically
//! provable single free. The tracker walks each scope once, runs a small
//! ownership state machine per binding (`Unassigned → Owns →
//! Transferred | Escaped → Freed`) and produces an immutable plan the
//! emitter consumes without further analysis.
//!
//! The policy is conservative: when single ownership cannot be proven
//! (an alias created by `let y = x` or by storing a heap binding into an
//! array), the value is retained rather than freed, and a note is
//! recorded. Leaking is preferred to a double free or use-after-free.

use ember_diagnostic::{Diagnostic, DiagnosticReport, ErrorCode};
use ember_ir::{
    BlockId, ExprArena, ExprId, ExprKind, Module, Name, Span, StmtId, StmtKind, StringInterner,
};
use ember_types::{BindingId, OracleResult, TypeData, TypeId, TypeInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::memory::MemoryManager;

/// Ownership state of one binding.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum OwnState {
    /// Owns a heap buffer and is responsible for its release.
    Owns,
    /// Ownership moved out (returned); never released here.
    Transferred,
    /// Aliased or caller-owned; retained, never released here.
    Escaped,
}

/// How a target's buffer is released.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DropKind {
    /// `free(x);`
    Str,
    /// `free(x.data);`
    ArrayData,
    /// `DICT_FREE(x);`
    Dict,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DropTarget {
    Binding(Name),
    Temp(String),
}

/// One scheduled release.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Destructor {
    pub target: DropTarget,
    pub kind: DropKind,
}

/// Declarations and close-of-scope releases for one block.
#[derive(Clone, Debug, Default)]
pub struct ScopePlan {
    /// Locals declared in this block, in statement order.
    pub decls: Vec<(Name, TypeId)>,
    /// Releases at block close, reverse creation order.
    pub destructors: Vec<Destructor>,
}

/// The full lifetime plan for one module. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct LifetimePlan {
    pub scopes: FxHashMap<BlockId, ScopePlan>,
    /// Temporary releases at the end of each statement.
    pub stmt_releases: FxHashMap<StmtId, Vec<Destructor>>,
    /// Release of an overwritten binding's old buffer, keyed by the
    /// assignment expression; runs after the new value is computed and
    /// before it is installed.
    pub assign_releases: FxHashMap<ExprId, Destructor>,
    /// Full unwind (all live owned bindings) at each return statement.
    pub return_unwinds: FxHashMap<StmtId, Vec<Destructor>>,
    /// Value temporaries whose buffer a binding adopts; excluded from
    /// statement releases.
    pub adopted_temps: FxHashSet<ExprId>,
}

impl LifetimePlan {
    pub fn scope(&self, block: BlockId) -> Option<&ScopePlan> {
        self.scopes.get(&block)
    }

    pub fn releases_for(&self, stmt: StmtId) -> &[Destructor] {
        self.stmt_releases.get(&stmt).map_or(&[], Vec::as_slice)
    }
}

struct ScopeFrame {
    block: BlockId,
    decls: Vec<(Name, TypeId)>,
    /// Heap bindings declared here, in creation order.
    owned: Vec<(BindingId, Name)>,
}

/// Flow analysis over assignments; see the module docs.
pub struct LifetimeTracker<'a> {
    arena: &'a ExprArena,
    names: &'a StringInterner,
    types: &'a TypeInterner,
    oracle: &'a OracleResult,
    memory: &'a MemoryManager<'a>,
    report: &'a mut DiagnosticReport,
    stack: Vec<ScopeFrame>,
    states: FxHashMap<BindingId, OwnState>,
    plan: LifetimePlan,
}

impl<'a> LifetimeTracker<'a> {
    pub fn new(
        arena: &'a ExprArena,
        names: &'a StringInterner,
        types: &'a TypeInterner,
        oracle: &'a OracleResult,
        memory: &'a MemoryManager<'a>,
        report: &'a mut DiagnosticReport,
    ) -> Self {
        Self {
            arena,
            names,
            types,
            oracle,
            memory,
            report,
            stack: Vec::new(),
            states: FxHashMap::default(),
            plan: LifetimePlan::default(),
        }
    }

    /// Analyze the whole module.
    pub fn track(mut self, module: &Module) -> LifetimePlan {
        for (idx, function) in module.functions.iter().enumerate() {
            // Heap-typed parameters are caller-owned: retained here.
            let params = self
                .oracle
                .param_bindings
                .get(idx)
                .map_or(&[][..], Vec::as_slice);
            for &binding in params {
                let ty = self.oracle.binding_type(binding);
                if self.types.flags(ty).needs_free() {
                    self.states.insert(binding, OwnState::Escaped);
                }
            }
            self.walk_block(function.body);
        }
        if let Some(top) = module.top_level {
            self.walk_block(top);
        }
        tracing::debug!(scopes = self.plan.scopes.len(), "lifetime plan built");
        self.plan
    }

    fn walk_block(&mut self, block: BlockId) {
        self.stack.push(ScopeFrame {
            block,
            decls: Vec::new(),
            owned: Vec::new(),
        });

        let stmt_ids: Vec<StmtId> = self.arena.block_stmts(block).map(|(id, _)| id).collect();
        for id in stmt_ids {
            self.track_stmt(id);
        }

        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return,
        };
        let mut destructors = Vec::new();
        for &(binding, name) in frame.owned.iter().rev() {
            if self.states.get(&binding) == Some(&OwnState::Owns) {
                if let Some(kind) = self.drop_kind(self.oracle.binding_type(binding)) {
                    destructors.push(Destructor {
                        target: DropTarget::Binding(name),
                        kind,
                    });
                }
            }
            self.states.remove(&binding);
        }
        self.plan.scopes.insert(
            frame.block,
            ScopePlan {
                decls: frame.decls,
                destructors,
            },
        );
    }

    fn track_stmt(&mut self, id: StmtId) {
        let (kind, span) = {
            let stmt = self.arena.stmt(id);
            (stmt.kind.clone(), stmt.span)
        };
        match kind {
            StmtKind::Let { name, init } => {
                self.track_let(id, name, init, span);
            }

            StmtKind::Expr(expr) => {
                self.observe_expr(expr);
                if let ExprKind::Assign { target, value } = self.arena.expr(expr).kind {
                    self.track_assign(expr, target, value, span);
                }
                self.collect_temp_releases(id, expr);
            }

            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.observe_expr(cond);
                self.collect_temp_releases(id, cond);
                self.walk_block(then_block);
                if let Some(else_block) = else_block {
                    self.walk_block(else_block);
                }
            }

            StmtKind::While { cond, body } => {
                self.observe_expr(cond);
                self.collect_temp_releases(id, cond);
                self.walk_block(body);
            }

            StmtKind::Return(value) => {
                if let Some(expr) = value {
                    self.observe_expr(expr);
                    self.collect_temp_releases(id, expr);
                    if let Some(binding) = self.oracle.binding_of_expr(expr) {
                        if self.states.get(&binding) == Some(&OwnState::Owns) {
                            self.states.insert(binding, OwnState::Transferred);
                        }
                    }
                }
                self.record_unwind(id);
            }
        }
    }

    fn track_let(&mut self, stmt: StmtId, name: Name, init: ExprId, span: Span) {
        let Some(binding) = self.oracle.binding_of_let(stmt) else {
            return;
        };
        let ty = self.oracle.binding_type(binding);
        if let Some(frame) = self.stack.last_mut() {
            frame.decls.push((name, ty));
        }
        self.observe_expr(init);
        self.collect_temp_releases(stmt, init);

        if !self.types.flags(ty).needs_free() {
            return;
        }
        if let ExprKind::Ident(source) = self.arena.expr(init).kind {
            // Two owners of one buffer; retain both, note it.
            self.note_aliasing(span, name, source);
            self.states.insert(binding, OwnState::Escaped);
        } else if self.borrows_its_value(init) {
            // Literal text or a dict view: some other owner keeps the
            // storage alive, nothing to release here.
            self.states.insert(binding, OwnState::Escaped);
        } else {
            self.states.insert(binding, OwnState::Owns);
            if let Some(frame) = self.stack.last_mut() {
                frame.owned.push((binding, name));
            }
        }
    }

    /// Assignment to a binding: release the overwritten buffer once the
    /// replacement is computed, or retain on an ambiguous alias.
    fn track_assign(&mut self, expr: ExprId, target: ExprId, value: ExprId, span: Span) {
        let ExprKind::Ident(name) = self.arena.expr(target).kind else {
            // Element/field stores: copy-in for dicts, alias for arrays;
            // observe_expr already handled escape notes.
            return;
        };
        let Some(binding) = self.oracle.binding_of_expr(target) else {
            return;
        };
        let ty = self.oracle.binding_type(binding);
        if !self.types.flags(ty).needs_free() {
            return;
        }

        if let ExprKind::Ident(source) = self.arena.expr(value).kind {
            self.note_aliasing(span, name, source);
            self.states.insert(binding, OwnState::Escaped);
            return;
        }

        if self.states.get(&binding) == Some(&OwnState::Owns) {
            if let Some(kind) = self.drop_kind(ty) {
                self.plan.assign_releases.insert(
                    expr,
                    Destructor {
                        target: DropTarget::Binding(name),
                        kind,
                    },
                );
            }
        }
        let state = if self.borrows_its_value(value) {
            OwnState::Escaped
        } else {
            OwnState::Owns
        };
        self.states.insert(binding, state);

        // The computed value's temporary moves into the binding.
        if self.memory.reserved_temp_name(value).is_some() {
            self.plan.adopted_temps.insert(value);
        }
    }

    /// Values referencing storage some other owner keeps alive: string
    /// literals (static storage) and dict reads, which hand out the
    /// entry's pointer while the dict retains it.
    fn borrows_its_value(&self, value: ExprId) -> bool {
        match &self.arena.expr(value).kind {
            ExprKind::Str(_) => true,
            ExprKind::Method {
                receiver, method, ..
            } => {
                matches!(
                    self.types.lookup(self.oracle.expr_type(*receiver)),
                    TypeData::Dict { .. }
                ) && self.names.lookup(*method) == "get"
            }
            _ => false,
        }
    }

    /// Scan for stores that alias a heap binding into a container.
    fn observe_expr(&mut self, id: ExprId) {
        let kind = self.arena.expr(id).kind.clone();
        match kind {
            ExprKind::Method {
                receiver,
                method,
                args,
            } => {
                self.observe_expr(receiver);
                let arg_ids: Vec<ExprId> = self.arena.expr_list(args).to_vec();
                for &arg in &arg_ids {
                    self.observe_expr(arg);
                }

                let receiver_ty = self.oracle.expr_type(receiver);
                let method = self.names.lookup(method);
                let stores = matches!(self.types.lookup(receiver_ty), TypeData::Array { .. })
                    && matches!(method, "push" | "unshift" | "insert" | "splice");
                if stores {
                    let span = self.arena.expr(id).span;
                    for &arg in &arg_ids {
                        if let ExprKind::Ident(name) = self.arena.expr(arg).kind {
                            let Some(binding) = self.oracle.binding_of_expr(arg) else {
                                continue;
                            };
                            let ty = self.oracle.binding_type(binding);
                            if self.types.flags(ty).needs_free() {
                                self.note_escape(span, name);
                                self.states.insert(binding, OwnState::Escaped);
                            }
                        }
                    }
                }
            }
            ExprKind::Array(items) | ExprKind::Call { args: items, .. } => {
                for &item in &self.arena.expr_list(items).to_vec() {
                    self.observe_expr(item);
                }
            }
            ExprKind::Dict(entries) => {
                let values: Vec<ExprId> = self
                    .arena
                    .dict_entries(entries)
                    .iter()
                    .map(|e| e.value)
                    .collect();
                for value in values {
                    self.observe_expr(value);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.observe_expr(lhs);
                self.observe_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.observe_expr(operand),
            ExprKind::Member { receiver, .. } => self.observe_expr(receiver),
            ExprKind::Index { receiver, index } => {
                self.observe_expr(receiver);
                self.observe_expr(index);
            }
            ExprKind::Assign { target, value } => {
                self.observe_expr(target);
                self.observe_expr(value);
            }
            ExprKind::Number(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_)
            | ExprKind::Error => {}
        }
    }

    /// Every heap-owning temporary reserved inside `expr` is released at
    /// the end of statement `stmt`, newest first, unless adopted.
    fn collect_temp_releases(&mut self, stmt: StmtId, expr: ExprId) {
        let mut temps = Vec::new();
        self.heap_temps_in(expr, &mut temps);
        if temps.is_empty() {
            return;
        }
        temps.reverse();
        let releases: Vec<Destructor> = temps
            .into_iter()
            .filter(|(id, _, _)| !self.plan.adopted_temps.contains(id))
            .filter_map(|(_, name, ty)| {
                self.drop_kind(ty).map(|kind| Destructor {
                    target: DropTarget::Temp(name),
                    kind,
                })
            })
            .collect();
        if !releases.is_empty() {
            self.plan
                .stmt_releases
                .entry(stmt)
                .or_default()
                .extend(releases);
        }
    }

    fn heap_temps_in(&self, id: ExprId, out: &mut Vec<(ExprId, String, TypeId)>) {
        let kind = self.arena.expr(id).kind.clone();
        match &kind {
            ExprKind::Array(items) | ExprKind::Call { args: items, .. } => {
                for &item in self.arena.expr_list(*items) {
                    self.heap_temps_in(item, out);
                }
            }
            ExprKind::Dict(entries) => {
                for entry in self.arena.dict_entries(*entries) {
                    self.heap_temps_in(entry.value, out);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.heap_temps_in(*lhs, out);
                self.heap_temps_in(*rhs, out);
            }
            ExprKind::Unary { operand, .. } => self.heap_temps_in(*operand, out),
            ExprKind::Method { receiver, args, .. } => {
                self.heap_temps_in(*receiver, out);
                for &arg in self.arena.expr_list(*args) {
                    self.heap_temps_in(arg, out);
                }
            }
            ExprKind::Member { receiver, .. } => self.heap_temps_in(*receiver, out),
            ExprKind::Index { receiver, index } => {
                self.heap_temps_in(*receiver, out);
                self.heap_temps_in(*index, out);
            }
            ExprKind::Assign { target, value } => {
                self.heap_temps_in(*target, out);
                self.heap_temps_in(*value, out);
            }
            ExprKind::Number(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_)
            | ExprKind::Error => {}
        }

        let ty = self.oracle.expr_type(id);
        if self.types.flags(ty).needs_free() {
            if let Some(name) = self.memory.reserved_temp_name(id) {
                out.push((id, name.to_owned(), ty));
            }
        }
    }

    /// All currently owned bindings, innermost scope first, for an early
    /// return. The returned binding itself has already been transferred.
    fn record_unwind(&mut self, stmt: StmtId) {
        let mut unwind = Vec::new();
        for frame in self.stack.iter().rev() {
            for &(binding, name) in frame.owned.iter().rev() {
                if self.states.get(&binding) == Some(&OwnState::Owns) {
                    if let Some(kind) = self.drop_kind(self.oracle.binding_type(binding)) {
                        unwind.push(Destructor {
                            target: DropTarget::Binding(name),
                            kind,
                        });
                    }
                }
            }
        }
        self.plan.return_unwinds.insert(stmt, unwind);
    }

    fn drop_kind(&self, ty: TypeId) -> Option<DropKind> {
        match self.types.lookup(ty) {
            TypeData::Str => Some(DropKind::Str),
            TypeData::Array { capacity, .. } if capacity.is_dynamic() => {
                Some(DropKind::ArrayData)
            }
            TypeData::Dict { .. } => Some(DropKind::Dict),
            _ => None,
        }
    }

    fn note_aliasing(&mut self, span: Span, dest: Name, source: Name) {
        self.report.push(
            Diagnostic::note(
                ErrorCode::MemoryAliasing,
                format!(
                    "`{}` and `{}` share one buffer; it is retained, not freed",
                    self.names.lookup(dest),
                    self.names.lookup(source)
                ),
                span,
            )
            .with_note("single ownership could not be proven".to_owned()),
        );
    }

    fn note_escape(&mut self, span: Span, name: Name) {
        self.report.push(
            Diagnostic::note(
                ErrorCode::MemoryAliasing,
                format!(
                    "`{}` is stored in a container and outlives its scope; retained",
                    self.names.lookup(name)
                ),
                span,
            )
            .with_note("single ownership could not be proven".to_owned()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ir::{BinaryOp, ExprRange};
    use ember_types::TypeOracle;
    use pretty_assertions::assert_eq;

    struct World {
        arena: ExprArena,
        names: StringInterner,
        types: TypeInterner,
        module: Module,
    }

    fn analyze(world: &World) -> (LifetimePlan, DiagnosticReport) {
        let mut report = DiagnosticReport::default();
        let oracle = TypeOracle::new(&world.arena, &world.names, &world.types, &mut report)
            .infer(&world.module);
        let resolvers = crate::resolver::ResolverRegistry::standard();
        let mut memory = MemoryManager::new(
            &world.arena,
            &world.names,
            &world.types,
            &oracle,
            &resolvers,
        );
        memory.preprocess(&world.module);
        let plan = LifetimeTracker::new(
            &world.arena,
            &world.names,
            &world.types,
            &oracle,
            &memory,
            &mut report,
        )
        .track(&world.module);
        (plan, report)
    }

    /// `let s = "a" + "b";`
    fn owned_string_world() -> (World, BlockId, Name) {
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let s = names.intern("s");
        let a = arena.alloc_expr(ExprKind::Str(names.intern("a")), Span::DUMMY);
        let b = arena.alloc_expr(ExprKind::Str(names.intern("b")), Span::DUMMY);
        let cat = arena.alloc_expr(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        );
        let stmt = arena.alloc_stmt(StmtKind::Let { name: s, init: cat }, Span::DUMMY);
        let top = arena.alloc_block(&[stmt]);
        let module = Module {
            functions: Vec::new(),
            top_level: Some(top),
        };
        (
            World {
                arena,
                names,
                types,
                module,
            },
            top,
            s,
        )
    }

    #[test]
    fn owned_string_freed_at_scope_close() {
        let (world, top, s) = owned_string_world();
        let (plan, _) = analyze(&world);

        let scope = plan.scope(top).map(|p| p.destructors.clone());
        assert_eq!(
            scope,
            Some(vec![Destructor {
                target: DropTarget::Binding(s),
                kind: DropKind::Str,
            }])
        );
    }

    #[test]
    fn literal_binding_owns_nothing() {
        // let s = "hi"; — static storage, never freed.
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let s = names.intern("s");
        let text = arena.alloc_expr(ExprKind::Str(names.intern("hi")), Span::DUMMY);
        let stmt = arena.alloc_stmt(StmtKind::Let { name: s, init: text }, Span::DUMMY);
        let top = arena.alloc_block(&[stmt]);
        let module = Module {
            functions: Vec::new(),
            top_level: Some(top),
        };
        let world = World {
            arena,
            names,
            types,
            module,
        };
        let (plan, report) = analyze(&world);

        assert_eq!(plan.scope(top).map(|p| p.destructors.clone()), Some(vec![]));
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn alias_is_retained_with_note() {
        // let s = "a" + "b"; let t = s;
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let s = names.intern("s");
        let t = names.intern("t");
        let a = arena.alloc_expr(ExprKind::Str(names.intern("a")), Span::DUMMY);
        let b = arena.alloc_expr(ExprKind::Str(names.intern("b")), Span::DUMMY);
        let cat = arena.alloc_expr(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        );
        let let_s = arena.alloc_stmt(StmtKind::Let { name: s, init: cat }, Span::DUMMY);
        let s_ref = arena.alloc_expr(ExprKind::Ident(s), Span::DUMMY);
        let let_t = arena.alloc_stmt(StmtKind::Let { name: t, init: s_ref }, Span::DUMMY);
        let top = arena.alloc_block(&[let_s, let_t]);
        let module = Module {
            functions: Vec::new(),
            top_level: Some(top),
        };
        let world = World {
            arena,
            names,
            types,
            module,
        };
        let (plan, report) = analyze(&world);

        // Only the original owner is freed; the alias is retained.
        let destructors = plan.scope(top).map(|p| p.destructors.clone());
        assert_eq!(
            destructors,
            Some(vec![Destructor {
                target: DropTarget::Binding(s),
                kind: DropKind::Str,
            }])
        );
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn returned_binding_is_not_freed() {
        // function f() { let s = "a" + "b"; return s; }
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let f = names.intern("f");
        let s = names.intern("s");
        let a = arena.alloc_expr(ExprKind::Str(names.intern("a")), Span::DUMMY);
        let b = arena.alloc_expr(ExprKind::Str(names.intern("b")), Span::DUMMY);
        let cat = arena.alloc_expr(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        );
        let let_s = arena.alloc_stmt(StmtKind::Let { name: s, init: cat }, Span::DUMMY);
        let s_ref = arena.alloc_expr(ExprKind::Ident(s), Span::DUMMY);
        let ret = arena.alloc_stmt(StmtKind::Return(Some(s_ref)), Span::DUMMY);
        let body = arena.alloc_block(&[let_s, ret]);
        let module = Module {
            functions: vec![Function {
                name: f,
                params: Vec::new(),
                body,
                span: Span::DUMMY,
            }],
            top_level: None,
        };
        let world = World {
            arena,
            names,
            types,
            module,
        };
        let (plan, _) = analyze(&world);

        assert_eq!(plan.scope(body).map(|p| p.destructors.clone()), Some(vec![]));
        assert_eq!(plan.return_unwinds.get(&ret), Some(&Vec::new()));
    }

    #[test]
    fn statement_temp_released_at_statement_end() {
        // console.log("a" + "b");
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let console = names.intern("console");
        let log = names.intern("log");
        let a = arena.alloc_expr(ExprKind::Str(names.intern("a")), Span::DUMMY);
        let b = arena.alloc_expr(ExprKind::Str(names.intern("b")), Span::DUMMY);
        let cat = arena.alloc_expr(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        );
        let console_ref = arena.alloc_expr(ExprKind::Ident(console), Span::DUMMY);
        let args = arena.alloc_expr_list(&[cat]);
        let call = arena.alloc_expr(
            ExprKind::Method {
                receiver: console_ref,
                method: log,
                args,
            },
            Span::DUMMY,
        );
        let stmt = arena.alloc_stmt(StmtKind::Expr(call), Span::DUMMY);
        let top = arena.alloc_block(&[stmt]);
        let module = Module {
            functions: Vec::new(),
            top_level: Some(top),
        };
        let world = World {
            arena,
            names,
            types,
            module,
        };
        let (plan, _) = analyze(&world);

        assert_eq!(
            plan.releases_for(stmt),
            &[Destructor {
                target: DropTarget::Temp("_tmp0".to_owned()),
                kind: DropKind::Str,
            }]
        );
    }

    use ember_ir::Function;

    #[test]
    fn empty_method_args_do_not_panic() {
        // let xs = [1]; xs.pop();
        let mut arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();

        let xs = names.intern("xs");
        let pop = names.intern("pop");
        let one = arena.alloc_expr(ExprKind::Number(1), Span::DUMMY);
        let items = arena.alloc_expr_list(&[one]);
        let literal = arena.alloc_expr(ExprKind::Array(items), Span::DUMMY);
        let let_xs = arena.alloc_stmt(StmtKind::Let { name: xs, init: literal }, Span::DUMMY);
        let xs_ref = arena.alloc_expr(ExprKind::Ident(xs), Span::DUMMY);
        let pop_call = arena.alloc_expr(
            ExprKind::Method {
                receiver: xs_ref,
                method: pop,
                args: ExprRange::EMPTY,
            },
            Span::DUMMY,
        );
        let pop_stmt = arena.alloc_stmt(StmtKind::Expr(pop_call), Span::DUMMY);
        let top = arena.alloc_block(&[let_xs, pop_stmt]);
        let module = Module {
            functions: Vec::new(),
            top_level: Some(top),
        };
        let world = World {
            arena,
            names,
            types,
            module,
        };
        let (plan, _) = analyze(&world);

        // Fixed array: nothing to free anywhere.
        assert_eq!(plan.scope(top).map(|p| p.destructors.clone()), Some(vec![]));
    }
}
