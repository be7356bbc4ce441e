//! The type oracle: scope resolution plus single-pass inference over
//! the syntax tree.
//!
//! A resolution pre-pass walks the scope tree first, giving every `let`
//! and parameter a distinct `BindingId` and resolving each `Ident` to
//! the nearest enclosing declaration. Same-named bindings in different
//! scopes therefore never interfere. The same walk records which
//! bindings grow (deciding array dynamism before any literal is typed)
//! and which shrink in place.
//!
//! Inference then assigns every binding and expression one concrete
//! low-level type. A binding keeps its first type for its whole
//! lifetime; re-typing is a `TypeInferenceError`. Failures are
//! non-fatal: the offending node gets `TypeId::ERROR`, a diagnostic is
//! recorded, and siblings continue.

use ember_diagnostic::{Diagnostic, DiagnosticReport, ErrorCode};
use ember_ir::{
    BinaryOp, BlockId, ExprArena, ExprId, ExprKind, Module, Name, Span, StmtId, StmtKind,
    StringInterner, UnaryOp,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Capacity, TypeData, TypeId, TypeInterner};

/// Methods whose presence anywhere in the scope chain makes the receiver
/// array dynamic.
const GROWTH_METHODS: [&str; 4] = ["push", "unshift", "splice", "insert"];

/// Methods that remove elements in place. A fixed-capacity receiver
/// needs a tracked length when one of these targets it.
const SHRINK_METHODS: [&str; 2] = ["pop", "shift"];

/// Identity of one declared binding. Every `let` statement and every
/// function parameter introduces one; same-named bindings in different
/// scopes get distinct ids.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BindingId(u32);

impl BindingId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A function signature needing forward declaration in the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSig {
    pub name: Name,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

/// Everything the oracle learns about one module.
#[derive(Clone, Debug, Default)]
pub struct OracleResult {
    /// Type of every expression, indexed by `ExprId`.
    pub expr_types: Vec<TypeId>,
    /// One type per binding, fixed for the binding's lifetime; indexed
    /// by `BindingId`.
    pub binding_types: Vec<TypeId>,
    /// Resolution of each `Ident` expression to the binding it names.
    pub expr_bindings: FxHashMap<ExprId, BindingId>,
    /// The binding each `let` statement introduces.
    pub let_bindings: FxHashMap<StmtId, BindingId>,
    /// Parameter bindings per function, parallel to `Module::functions`.
    pub param_bindings: Vec<Vec<BindingId>>,
    /// Bindings a `pop`/`shift` targets somewhere, in first-seen order.
    pub shrunk: Vec<BindingId>,
    /// Signatures of user functions, in declaration order.
    pub signatures: Vec<FunctionSig>,
}

impl OracleResult {
    /// Type of an expression; `ERROR` for ids the oracle never saw.
    pub fn expr_type(&self, id: ExprId) -> TypeId {
        self.expr_types
            .get(id.index())
            .copied()
            .unwrap_or(TypeId::ERROR)
    }

    pub fn binding_type(&self, binding: BindingId) -> TypeId {
        self.binding_types
            .get(binding.index())
            .copied()
            .unwrap_or(TypeId::ERROR)
    }

    /// The binding an `Ident` expression resolved to, if any.
    pub fn binding_of_expr(&self, id: ExprId) -> Option<BindingId> {
        self.expr_bindings.get(&id).copied()
    }

    /// The binding a `let` statement introduced.
    pub fn binding_of_let(&self, id: StmtId) -> Option<BindingId> {
        self.let_bindings.get(&id).copied()
    }
}

/// Scope resolution plus single-pass type inference over one module.
pub struct TypeOracle<'a> {
    arena: &'a ExprArena,
    names: &'a StringInterner,
    types: &'a TypeInterner,
    report: &'a mut DiagnosticReport,
    /// Parameter types supplied by the front end's symbol oracle.
    param_hints: FxHashMap<Name, TypeId>,
    /// Lexical scope stack, innermost last. Only live during resolution.
    scopes: Vec<FxHashMap<Name, BindingId>>,
    /// Bindings that a growth operation targets somewhere.
    grown: FxHashSet<BindingId>,
    shrunk_set: FxHashSet<BindingId>,
    shrunk: Vec<BindingId>,
    expr_types: Vec<TypeId>,
    binding_types: Vec<TypeId>,
    expr_bindings: FxHashMap<ExprId, BindingId>,
    let_bindings: FxHashMap<StmtId, BindingId>,
    param_bindings: Vec<Vec<BindingId>>,
    signatures: Vec<FunctionSig>,
    /// Return types observed in the function currently being inferred.
    current_returns: Vec<(TypeId, Span)>,
}

impl<'a> TypeOracle<'a> {
    pub fn new(
        arena: &'a ExprArena,
        names: &'a StringInterner,
        types: &'a TypeInterner,
        report: &'a mut DiagnosticReport,
    ) -> Self {
        Self {
            arena,
            names,
            types,
            report,
            param_hints: FxHashMap::default(),
            scopes: Vec::new(),
            grown: FxHashSet::default(),
            shrunk_set: FxHashSet::default(),
            shrunk: Vec::new(),
            expr_types: vec![TypeId::ERROR; arena.expr_count()],
            binding_types: Vec::new(),
            expr_bindings: FxHashMap::default(),
            let_bindings: FxHashMap::default(),
            param_bindings: Vec::new(),
            signatures: Vec::new(),
            current_returns: Vec::new(),
        }
    }

    /// Supply a parameter type from the external symbol oracle.
    /// Unhinted parameters default to `number`.
    pub fn with_param_hint(mut self, param: Name, ty: TypeId) -> Self {
        self.param_hints.insert(param, ty);
        self
    }

    /// Run inference over the module.
    pub fn infer(mut self, module: &Module) -> OracleResult {
        tracing::debug!(
            functions = module.functions.len(),
            exprs = self.arena.expr_count(),
            "type inference pass"
        );

        // Resolution pre-pass: binding identities, growth and shrink
        // facts, all settled before any expression is typed.
        for function in &module.functions {
            self.scopes.push(FxHashMap::default());
            let params: Vec<BindingId> = function
                .params
                .iter()
                .map(|p| self.declare_binding(p.name))
                .collect();
            self.param_bindings.push(params);
            self.resolve_block(function.body);
            self.scopes.pop();
        }
        if let Some(top) = module.top_level {
            self.scopes.push(FxHashMap::default());
            self.resolve_block(top);
            self.scopes.pop();
        }

        // Register provisional signatures so forward calls resolve.
        for function in &module.functions {
            let params: Vec<TypeId> = function
                .params
                .iter()
                .map(|p| {
                    self.param_hints
                        .get(&p.name)
                        .copied()
                        .unwrap_or(TypeId::NUMBER)
                })
                .collect();
            self.signatures.push(FunctionSig {
                name: function.name,
                params,
                ret: TypeId::VOID,
            });
        }

        // Function bodies in declaration order, then top level.
        for (idx, function) in module.functions.iter().enumerate() {
            let param_types = self.signatures[idx].params.clone();
            let param_ids = self.param_bindings[idx].clone();
            for ((param, ty), binding) in function.params.iter().zip(param_types).zip(param_ids) {
                self.bind(binding, param.name, ty, param.span);
            }

            self.current_returns.clear();
            self.infer_block(function.body);

            let ret = self.unify_returns();
            self.signatures[idx].ret = ret;
        }

        if let Some(top) = module.top_level {
            self.infer_block(top);
        }

        OracleResult {
            expr_types: self.expr_types,
            binding_types: self.binding_types,
            expr_bindings: self.expr_bindings,
            let_bindings: self.let_bindings,
            param_bindings: self.param_bindings,
            shrunk: self.shrunk,
            signatures: self.signatures,
        }
    }

    // Scope resolution

    fn declare_binding(&mut self, name: Name) -> BindingId {
        // Re-declaring a name in the same scope reuses the binding, so
        // the one-type rule still catches a same-scope re-typing.
        if let Some(&existing) = self.scopes.last().and_then(|frame| frame.get(&name)) {
            return existing;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "binding count is bounded by arena size"
        )]
        let id = BindingId(self.binding_types.len() as u32);
        self.binding_types.push(TypeId::ERROR);
        if let Some(frame) = self.scopes.last_mut() {
            frame.insert(name, id);
        }
        id
    }

    fn lookup_binding(&self, name: Name) -> Option<BindingId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name).copied())
    }

    fn resolve_block(&mut self, block: BlockId) {
        self.scopes.push(FxHashMap::default());
        let stmts: Vec<(StmtId, StmtKind)> = self
            .arena
            .block_stmts(block)
            .map(|(id, s)| (id, s.kind.clone()))
            .collect();
        for (id, kind) in stmts {
            match kind {
                StmtKind::Let { name, init } => {
                    // The initializer still sees the outer binding.
                    self.resolve_expr(init);
                    let binding = self.declare_binding(name);
                    self.let_bindings.insert(id, binding);
                }
                StmtKind::Expr(expr) => self.resolve_expr(expr),
                StmtKind::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    self.resolve_expr(cond);
                    self.resolve_block(then_block);
                    if let Some(else_block) = else_block {
                        self.resolve_block(else_block);
                    }
                }
                StmtKind::While { cond, body } => {
                    self.resolve_expr(cond);
                    self.resolve_block(body);
                }
                StmtKind::Return(Some(value)) => self.resolve_expr(value),
                StmtKind::Return(None) => {}
            }
        }
        self.scopes.pop();
    }

    fn resolve_expr(&mut self, id: ExprId) {
        match &self.arena.expr(id).kind.clone() {
            ExprKind::Ident(name) => {
                if let Some(binding) = self.lookup_binding(*name) {
                    self.expr_bindings.insert(id, binding);
                }
            }
            ExprKind::Method {
                receiver,
                method,
                args,
            } => {
                self.resolve_expr(*receiver);
                for &arg in self.arena.expr_list(*args) {
                    self.resolve_expr(arg);
                }
                let method_str = self.names.lookup(*method);
                let target = self.expr_bindings.get(receiver).copied();
                if let Some(binding) = target {
                    if GROWTH_METHODS.contains(&method_str) {
                        tracing::trace!(binding = ?binding, method = method_str, "array grows");
                        self.grown.insert(binding);
                    } else if SHRINK_METHODS.contains(&method_str)
                        && self.shrunk_set.insert(binding)
                    {
                        self.shrunk.push(binding);
                    }
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(*lhs);
                self.resolve_expr(*rhs);
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(*operand),
            ExprKind::Call { args, .. } => {
                for &arg in self.arena.expr_list(*args) {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Array(items) => {
                for &item in self.arena.expr_list(*items) {
                    self.resolve_expr(item);
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
                    self.resolve_expr(value);
                }
            }
            ExprKind::Member { receiver, .. } => self.resolve_expr(*receiver),
            ExprKind::Index { receiver, index } => {
                self.resolve_expr(*receiver);
                self.resolve_expr(*index);
            }
            ExprKind::Assign { target, value } => {
                self.resolve_expr(*target);
                self.resolve_expr(*value);
            }
            ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::Error => {}
        }
    }

    // Statement / block inference

    fn infer_block(&mut self, block: BlockId) {
        let stmts: Vec<(ember_ir::StmtId, StmtKind, Span)> = self
            .arena
            .block_stmts(block)
            .map(|(id, s)| (id, s.kind.clone(), s.span))
            .collect();

        for (id, kind, span) in stmts {
            match kind {
                StmtKind::Let { name, init } => {
                    let mut ty = self.infer_expr(init);
                    let Some(binding) = self.let_bindings.get(&id).copied() else {
                        continue;
                    };
                    // A grown array binding is dynamic from birth.
                    if self.grown.contains(&binding) {
                        if let TypeData::Array { elem, .. } = self.types.lookup(ty) {
                            ty = self.types.array(elem, Capacity::Dynamic);
                            self.expr_types[init.index()] = ty;
                        }
                    }
                    self.bind(binding, name, ty, span);
                }
                StmtKind::Expr(id) => {
                    self.infer_expr(id);
                }
                StmtKind::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    self.check_condition(cond);
                    self.infer_block(then_block);
                    if let Some(else_block) = else_block {
                        self.infer_block(else_block);
                    }
                }
                StmtKind::While { cond, body } => {
                    self.check_condition(cond);
                    self.infer_block(body);
                }
                StmtKind::Return(value) => {
                    let ty = match value {
                        Some(id) => self.infer_expr(id),
                        None => TypeId::VOID,
                    };
                    self.current_returns.push((ty, span));
                }
            }
        }
    }

    fn check_condition(&mut self, cond: ExprId) {
        let ty = self.infer_expr(cond);
        // Truthiness in the subset: booleans and numbers only.
        if ty != TypeId::BOOL && ty != TypeId::NUMBER && !ty.is_error() {
            self.type_error(
                self.arena.expr(cond).span,
                "condition is neither boolean nor number",
            );
        }
    }

    fn bind(&mut self, binding: BindingId, name: Name, ty: TypeId, span: Span) {
        let existing = self.binding_types[binding.index()];
        if !existing.is_error() && existing != ty && !ty.is_error() {
            self.type_error(
                span,
                format!(
                    "binding `{}` cannot change its representation",
                    self.names.lookup(name)
                ),
            );
        } else if existing.is_error() {
            tracing::trace!(binding = self.names.lookup(name), ty = ?ty, "bind");
            self.binding_types[binding.index()] = ty;
        }
    }

    // Expression inference

    fn infer_expr(&mut self, id: ExprId) -> TypeId {
        let expr = self.arena.expr(id).clone();
        let ty = match &expr.kind {
            ExprKind::Number(_) => TypeId::NUMBER,
            ExprKind::Bool(_) => TypeId::BOOL,
            ExprKind::Str(_) => TypeId::STR,
            ExprKind::Error => TypeId::ERROR,

            ExprKind::Ident(name) => match self.expr_bindings.get(&id) {
                Some(binding) => self.binding_types[binding.index()],
                None => {
                    self.type_error(
                        expr.span,
                        format!("unknown binding `{}`", self.names.lookup(*name)),
                    );
                    TypeId::ERROR
                }
            },

            ExprKind::Array(items) => self.infer_array_literal(*items, expr.span),
            ExprKind::Dict(entries) => self.infer_dict_literal(*entries),

            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(*op, *lhs, *rhs, expr.span),

            ExprKind::Unary { op, operand } => {
                let operand_ty = self.infer_expr(*operand);
                match op {
                    UnaryOp::Neg if operand_ty == TypeId::NUMBER => TypeId::NUMBER,
                    UnaryOp::Not if operand_ty == TypeId::BOOL => TypeId::BOOL,
                    _ if operand_ty.is_error() => TypeId::ERROR,
                    _ => {
                        self.type_error(expr.span, "unary operator applied to wrong type");
                        TypeId::ERROR
                    }
                }
            }

            ExprKind::Call { callee, args } => {
                for &arg in self.arena.expr_list(*args) {
                    self.infer_expr(arg);
                }
                match self.signatures.iter().find(|sig| sig.name == *callee) {
                    Some(sig) => sig.ret,
                    None => {
                        self.type_error(
                            expr.span,
                            format!("unknown function `{}`", self.names.lookup(*callee)),
                        );
                        TypeId::ERROR
                    }
                }
            }

            ExprKind::Method {
                receiver,
                method,
                args,
            } => self.infer_method(*receiver, *method, *args, expr.span),

            ExprKind::Member { receiver, property } => {
                let recv_ty = self.infer_expr(*receiver);
                let property_str = self.names.lookup(*property);
                match (self.types.lookup(recv_ty), property_str) {
                    (TypeData::Array { .. } | TypeData::Str, "length") => TypeId::NUMBER,
                    (TypeData::Struct { fields }, _) => fields
                        .iter()
                        .find(|(name, _)| *name == *property)
                        .map_or_else(
                            || {
                                self.type_error(
                                    expr.span,
                                    format!("no field `{property_str}` on object shape"),
                                );
                                TypeId::ERROR
                            },
                            |&(_, ty)| ty,
                        ),
                    (TypeData::Error, _) => TypeId::ERROR,
                    _ => {
                        self.type_error(
                            expr.span,
                            format!("unknown property `{property_str}`"),
                        );
                        TypeId::ERROR
                    }
                }
            }

            ExprKind::Index { receiver, index } => {
                let recv_ty = self.infer_expr(*receiver);
                let index_ty = self.infer_expr(*index);
                match self.types.lookup(recv_ty) {
                    TypeData::Array { elem, .. } => {
                        if index_ty != TypeId::NUMBER && !index_ty.is_error() {
                            self.type_error(expr.span, "array index must be a number");
                        }
                        elem
                    }
                    TypeData::Dict { value } => {
                        if index_ty != TypeId::STR && !index_ty.is_error() {
                            self.type_error(expr.span, "dict key must be a string");
                        }
                        value
                    }
                    TypeData::Str => TypeId::STR,
                    TypeData::Error => TypeId::ERROR,
                    _ => {
                        self.type_error(expr.span, "value is not indexable");
                        TypeId::ERROR
                    }
                }
            }

            ExprKind::Assign { target, value } => {
                let target_ty = self.infer_expr(*target);
                let value_ty = self.infer_expr(*value);
                if target_ty != value_ty && !target_ty.is_error() && !value_ty.is_error() {
                    self.type_error(
                        expr.span,
                        "assignment would change the target's representation",
                    );
                }
                target_ty
            }
        };

        self.expr_types[id.index()] = ty;
        ty
    }

    fn infer_array_literal(&mut self, items: ember_ir::ExprRange, span: Span) -> TypeId {
        let ids: Vec<ExprId> = self.arena.expr_list(items).to_vec();
        let mut elem = TypeId::NUMBER;
        let mut first = true;
        for id in &ids {
            let ty = self.infer_expr(*id);
            if first {
                elem = ty;
                first = false;
            } else if ty != elem && !ty.is_error() && !elem.is_error() {
                self.type_error(span, "array literal elements have incompatible types");
                return TypeId::ERROR;
            }
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "literal length is bounded by arena size"
        )]
        let capacity = Capacity::Fixed(ids.len() as u32);
        self.types.array(elem, capacity)
    }

    /// A homogeneous dict literal is a `Dict`; a heterogeneous one is a
    /// fixed object shape deduplicated through the struct catalog.
    fn infer_dict_literal(&mut self, entries: ember_ir::ExprRange) -> TypeId {
        let pairs: Vec<(Name, ExprId)> = self
            .arena
            .dict_entries(entries)
            .iter()
            .map(|e| (e.key, e.value))
            .collect();

        let mut fields = Vec::with_capacity(pairs.len());
        let mut homogeneous = true;
        let mut value_ty = TypeId::STR;
        for (idx, (key, value)) in pairs.iter().enumerate() {
            let ty = self.infer_expr(*value);
            if idx == 0 {
                value_ty = ty;
            } else if ty != value_ty {
                homogeneous = false;
            }
            fields.push((*key, ty));
        }

        if homogeneous {
            self.types.dict(value_ty)
        } else {
            self.types.struct_type(fields)
        }
    }

    fn infer_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, span: Span) -> TypeId {
        let lhs_ty = self.infer_expr(lhs);
        let rhs_ty = self.infer_expr(rhs);

        if lhs_ty.is_error() || rhs_ty.is_error() {
            return TypeId::ERROR;
        }

        match op {
            // `+` doubles as string concatenation.
            BinaryOp::Add if lhs_ty == TypeId::STR || rhs_ty == TypeId::STR => TypeId::STR,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                if lhs_ty == TypeId::NUMBER && rhs_ty == TypeId::NUMBER {
                    TypeId::NUMBER
                } else {
                    self.type_error(span, "arithmetic on non-numeric operands");
                    TypeId::ERROR
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if lhs_ty == TypeId::BOOL && rhs_ty == TypeId::BOOL {
                    TypeId::BOOL
                } else {
                    self.type_error(span, "logical operator on non-boolean operands");
                    TypeId::ERROR
                }
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt
            | BinaryOp::Ge => {
                if lhs_ty == rhs_ty {
                    TypeId::BOOL
                } else {
                    self.type_error(span, "comparison between incompatible types");
                    TypeId::ERROR
                }
            }
        }
    }

    fn infer_method(
        &mut self,
        receiver: ExprId,
        method: Name,
        args: ember_ir::ExprRange,
        span: Span,
    ) -> TypeId {
        let method_str = self.names.lookup(method);

        // `console.log(...)` — the receiver is a namespace, not a value.
        if let ExprKind::Ident(name) = self.arena.expr(receiver).kind {
            if self.names.lookup(name) == "console" {
                self.expr_types[receiver.index()] = TypeId::VOID;
                for &arg in self.arena.expr_list(args).to_vec().iter() {
                    self.infer_expr(arg);
                }
                return TypeId::VOID;
            }
        }

        let recv_ty = self.infer_expr(receiver);
        for &arg in self.arena.expr_list(args).to_vec().iter() {
            self.infer_expr(arg);
        }

        let resolved = match self.types.lookup(recv_ty) {
            TypeData::Array { elem, .. } => match method_str {
                "push" | "unshift" => Some(TypeId::NUMBER), // new length
                "pop" | "shift" => Some(elem),
                "indexOf" => Some(TypeId::NUMBER),
                "splice" | "insert" => Some(TypeId::VOID),
                _ => None,
            },
            TypeData::Str => match method_str {
                "concat" | "substring" | "charAt" => Some(TypeId::STR),
                "indexOf" | "lastIndexOf" => Some(TypeId::NUMBER),
                "match" => Some(self.types.array(TypeId::STR, Capacity::Dynamic)),
                _ => None,
            },
            TypeData::Dict { value } => match method_str {
                "get" => Some(value),
                "set" => Some(TypeId::VOID),
                _ => None,
            },
            TypeData::Error => Some(TypeId::ERROR),
            _ => None,
        };

        resolved.unwrap_or_else(|| {
            self.type_error(
                span,
                format!("no known lowering for method `{method_str}` on this receiver"),
            );
            TypeId::ERROR
        })
    }

    fn unify_returns(&mut self) -> TypeId {
        let mut ret = TypeId::VOID;
        let mut first = true;
        for (ty, ret_span) in self.current_returns.clone() {
            if first {
                ret = ty;
                first = false;
            } else if ty != ret && !ty.is_error() && !ret.is_error() {
                self.type_error(ret_span, "incompatible return types across branches");
                return TypeId::ERROR;
            }
        }
        ret
    }

    fn type_error(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "type inference failure");
        self.report.push(Diagnostic::error(
            ErrorCode::TypeInference,
            message,
            span,
        ));
    }
}
