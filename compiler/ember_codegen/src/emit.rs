//! Tree-walking emission: statements and expressions to C text.
//!
//! Expressions render to an inline text plus a list of hoisted
//! statements (out-parameter macros, heap assignments into reserved
//! temporaries). Statement emission writes the hoisted lines first, then
//! the statement itself, then the releases the lifetime plan scheduled.
//!
//! Recoverable failures (inference holes, arity mismatches, forms the
//! runtime cannot express) become placeholder comments and a diagnostic;
//! only an unregistered dependency key aborts the compilation.

use ember_diagnostic::{Diagnostic, ErrorCode};
use ember_ir::{
    BinaryOp, BlockId, ExprId, ExprKind, Function, Module, Name, Span, StmtId, StmtKind,
};
use ember_types::{Capacity, FunctionSig, TypeData, TypeId};
use smallvec::SmallVec;

use crate::context::{escape_c_string, CodeBuf, CodegenContext};
use crate::deps::UnknownDependency;
use crate::lifetime::{Destructor, DropKind, DropTarget};
use crate::resolver::{BuildError, CallSite, ReceiverKind, ResolverRegistry};
use crate::runtime::keys;
use crate::template::{FieldValue, Template, TemplateNode};

/// A rendered expression: inline text plus hoisted statement lines.
#[derive(Clone, Debug, Default)]
pub struct EmittedExpr {
    pub text: String,
    pub stmts: Vec<String>,
}

impl EmittedExpr {
    fn plain(text: impl Into<String>) -> Self {
        EmittedExpr {
            text: text.into(),
            stmts: Vec::new(),
        }
    }
}

/// Emits one module's functions and top-level statements.
pub struct Emitter<'a, 'c> {
    ctx: &'c mut CodegenContext<'a>,
    resolvers: &'c ResolverRegistry,
}

impl<'a, 'c> Emitter<'a, 'c> {
    pub fn new(ctx: &'c mut CodegenContext<'a>, resolvers: &'c ResolverRegistry) -> Self {
        Emitter { ctx, resolvers }
    }

    /// C signature for a user function.
    pub fn signature(&self, function: &Function, sig: &FunctionSig) -> String {
        let mapper = self.ctx.mapper();
        let params = if function.params.is_empty() {
            "void".to_owned()
        } else {
            function
                .params
                .iter()
                .zip(&sig.params)
                .map(|(param, &ty)| mapper.declaration(ty, &self.ctx.mangle(param.name)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "{} {}({})",
            mapper.c_type(sig.ret),
            self.ctx.mangle(function.name),
            params
        )
    }

    pub fn emit_function(
        &mut self,
        function: &Function,
        sig: &FunctionSig,
    ) -> Result<String, UnknownDependency> {
        tracing::debug!(name = self.ctx.resolve_name(function.name), "emit function");
        let mut buf = CodeBuf::new();
        buf.writeln(&self.signature(function, sig));
        buf.writeln("{");
        buf.indent();
        self.emit_block(function.body, &mut buf)?;
        buf.dedent();
        buf.writeln("}");
        Ok(buf.finish())
    }

    /// `main()`: registered entry snippets, then the translated
    /// top-level statements. Drains the entry registry.
    pub fn emit_main(&mut self, module: &Module) -> Result<String, UnknownDependency> {
        let mut body = CodeBuf::new();
        body.indent();
        if let Some(top) = module.top_level {
            self.emit_block(top, &mut body)?;
        }
        let body = body.finish();

        let mut buf = CodeBuf::new();
        buf.writeln("int main(void)");
        buf.writeln("{");
        buf.indent();
        for snippet in self.ctx.entries.drain() {
            buf.writeln(&snippet);
        }
        buf.dedent();
        for line in body.lines() {
            buf.writeln(line.trim_end());
        }
        buf.indent();
        buf.writeln("return 0;");
        buf.dedent();
        buf.writeln("}");
        Ok(buf.finish())
    }

    /// Declarations first (the emitted unit is C89-friendly), then the
    /// statements, then the scope's scheduled releases.
    fn emit_block(&mut self, block: BlockId, buf: &mut CodeBuf) -> Result<(), UnknownDependency> {
        let scope = self.ctx.lifetimes.scope(block).cloned().unwrap_or_default();

        for &(name, ty) in &scope.decls {
            self.declare_type_deps(ty)?;
            let decl = self.ctx.mapper().declaration(ty, &self.ctx.mangle(name));
            buf.writeln(&format!("{decl};"));
        }
        if !scope.decls.is_empty() {
            buf.blank();
        }

        let stmt_ids: Vec<StmtId> = self.ctx.arena.block_stmts(block).map(|(id, _)| id).collect();
        let mut ended_in_return = false;
        for id in stmt_ids {
            ended_in_return = matches!(self.ctx.arena.stmt(id).kind, StmtKind::Return(_));
            self.emit_stmt(id, buf)?;
        }

        if !ended_in_return {
            for destructor in &scope.destructors {
                let line = self.destructor_line(destructor)?;
                buf.writeln(&line);
            }
        }
        Ok(())
    }

    fn emit_stmt(&mut self, id: StmtId, buf: &mut CodeBuf) -> Result<(), UnknownDependency> {
        let (kind, span) = {
            let stmt = self.ctx.arena.stmt(id);
            (stmt.kind.clone(), stmt.span)
        };
        match kind {
            StmtKind::Let { name, init } => {
                self.emit_let(id, name, init, buf)?;
            }

            StmtKind::Expr(expr) => {
                let kind_is_method = matches!(self.ctx.arena.expr(expr).kind, ExprKind::Method { .. });
                let release = self.ctx.lifetimes.assign_releases.get(&expr).cloned();
                let rendered = self.emit_expr(expr, None)?;
                for line in &rendered.stmts {
                    buf.writeln(line);
                }
                if let Some(destructor) = release {
                    let line = self.destructor_line(&destructor)?;
                    buf.writeln(&line);
                }
                // Method side effects are already hoisted; the residual
                // text is a pure value not worth a statement.
                if !kind_is_method && !rendered.text.is_empty() {
                    buf.writeln(&format!("{};", rendered.text));
                }
                self.write_releases(id, buf)?;
            }

            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let rendered = self.emit_expr(cond, None)?;
                for line in &rendered.stmts {
                    buf.writeln(line);
                }
                buf.writeln(&format!("if ({}) {{", rendered.text));
                buf.indent();
                self.emit_block(then_block, buf)?;
                buf.dedent();
                if let Some(else_block) = else_block {
                    buf.writeln("} else {");
                    buf.indent();
                    self.emit_block(else_block, buf)?;
                    buf.dedent();
                }
                buf.writeln("}");
                self.write_releases(id, buf)?;
            }

            StmtKind::While { cond, body } => {
                let rendered = self.emit_expr(cond, None)?;
                if rendered.stmts.is_empty() {
                    buf.writeln(&format!("while ({}) {{", rendered.text));
                    buf.indent();
                    self.emit_block(body, buf)?;
                    buf.dedent();
                    buf.writeln("}");
                } else {
                    // The condition needs per-iteration setup; rotate it
                    // into the loop and free its temporaries on every
                    // path out of the evaluation.
                    buf.writeln("for (;;) {");
                    buf.indent();
                    for line in &rendered.stmts {
                        buf.writeln(line);
                    }
                    buf.writeln(&format!("if (!({})) break;", rendered.text));
                    self.emit_block(body, buf)?;
                    self.write_releases(id, buf)?;
                    buf.dedent();
                    buf.writeln("}");
                }
                self.write_releases(id, buf)?;
            }

            StmtKind::Return(value) => {
                self.emit_return(id, value, span, buf)?;
            }
        }
        Ok(())
    }

    fn emit_let(
        &mut self,
        stmt: StmtId,
        name: Name,
        init: ExprId,
        buf: &mut CodeBuf,
    ) -> Result<(), UnknownDependency> {
        let dest = self.ctx.mangle(name);
        let init_kind = self.ctx.arena.expr(init).kind.clone();

        match &init_kind {
            ExprKind::Array(items) => {
                let ty = self.ctx.expr_type(init);
                match self.ctx.types.lookup(ty) {
                    TypeData::Array {
                        capacity: Capacity::Fixed(_),
                        ..
                    } => {
                        let item_ids: Vec<ExprId> = self.ctx.arena.expr_list(*items).to_vec();
                        let count = item_ids.len();
                        for (idx, item) in item_ids.into_iter().enumerate() {
                            let rendered = self.emit_expr(item, None)?;
                            for line in &rendered.stmts {
                                buf.writeln(line);
                            }
                            buf.writeln(&format!("{dest}[{idx}] = {};", rendered.text));
                        }
                        // A shrinking fixed array carries a live length.
                        if let Some(len) = self
                            .ctx
                            .oracle
                            .binding_of_let(stmt)
                            .and_then(|binding| self.ctx.memory.fixed_len_name(binding))
                            .map(str::to_owned)
                        {
                            buf.writeln(&format!("{len} = {count};"));
                        }
                    }
                    _ => {
                        let node = self.dynamic_array_node(init, *items, &dest)?;
                        self.write_node(&node, buf);
                    }
                }
            }

            ExprKind::Dict(entries) => {
                let ty = self.ctx.expr_type(init);
                if let TypeData::Struct { .. } = self.ctx.types.lookup(ty) {
                    let entries: Vec<_> = self.ctx.arena.dict_entries(*entries).to_vec();
                    for entry in entries {
                        let rendered = self.emit_expr(entry.value, None)?;
                        for line in &rendered.stmts {
                            buf.writeln(line);
                        }
                        let field = self.ctx.resolve_name(entry.key).to_owned();
                        buf.writeln(&format!("{dest}.{field} = {};", rendered.text));
                    }
                } else {
                    let node = self.dict_node(*entries, &dest)?;
                    self.write_node(&node, buf);
                }
            }

            _ => {
                let rendered = self.emit_expr(init, Some(&dest))?;
                for line in &rendered.stmts {
                    buf.writeln(line);
                }
                // Out-parameter and assigning resolvers already wrote
                // into the destination; only a residual value needs the
                // explicit store.
                if rendered.text != dest && !rendered.text.is_empty() {
                    buf.writeln(&format!("{dest} = {};", rendered.text));
                }
            }
        }

        self.write_releases(stmt, buf)
    }

    fn emit_return(
        &mut self,
        stmt: StmtId,
        value: Option<ExprId>,
        _span: Span,
        buf: &mut CodeBuf,
    ) -> Result<(), UnknownDependency> {
        let unwind = self
            .ctx
            .lifetimes
            .return_unwinds
            .get(&stmt)
            .cloned()
            .unwrap_or_default();
        let releases = self.ctx.lifetimes.releases_for(stmt).to_vec();

        let Some(value) = value else {
            for destructor in releases.iter().chain(&unwind) {
                let line = self.destructor_line(destructor)?;
                buf.writeln(&line);
            }
            buf.writeln("return;");
            return Ok(());
        };

        let rendered = self.emit_expr(value, None)?;
        for line in &rendered.stmts {
            buf.writeln(line);
        }

        if releases.is_empty() && unwind.is_empty() {
            buf.writeln(&format!("return {};", rendered.text));
            return Ok(());
        }

        // Materialize the value before the frees so the return text
        // cannot read a released temporary.
        let ty = self.ctx.expr_type(value);
        let decl = self.ctx.mapper().declaration(ty, "_ret");
        buf.writeln("{");
        buf.indent();
        buf.writeln(&format!("{decl} = {};", rendered.text));
        for destructor in releases.iter().chain(&unwind) {
            let line = self.destructor_line(destructor)?;
            buf.writeln(&line);
        }
        buf.writeln("return _ret;");
        buf.dedent();
        buf.writeln("}");
        Ok(())
    }

    // Expressions

    fn emit_expr(
        &mut self,
        id: ExprId,
        dest: Option<&str>,
    ) -> Result<EmittedExpr, UnknownDependency> {
        let (kind, span) = {
            let expr = self.ctx.arena.expr(id);
            (expr.kind.clone(), expr.span)
        };
        match kind {
            ExprKind::Number(n) => Ok(EmittedExpr::plain(n.to_string())),
            ExprKind::Bool(b) => Ok(EmittedExpr::plain(if b { "1" } else { "0" })),
            ExprKind::Str(text) => Ok(EmittedExpr::plain(format!(
                "\"{}\"",
                escape_c_string(self.ctx.resolve_name(text))
            ))),
            ExprKind::Ident(name) => Ok(EmittedExpr::plain(self.ctx.mangle(name))),

            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(id, op, lhs, rhs),

            ExprKind::Unary { op, operand } => {
                let inner = self.emit_expr(operand, None)?;
                Ok(EmittedExpr {
                    text: format!("({}{})", op.c_symbol(), inner.text),
                    stmts: inner.stmts,
                })
            }

            ExprKind::Array(items) => {
                let ty = self.ctx.expr_type(id);
                if !self.ctx.types.flags(ty).needs_free() {
                    return Ok(self.placeholder(
                        ErrorCode::TypeInference,
                        "fixed array literal is only expressible as an initializer",
                        span,
                    ));
                }
                let Some(temp) = self.ctx.memory.reserved_temp_name(id).map(str::to_owned)
                else {
                    return Ok(self.placeholder(
                        ErrorCode::TypeInference,
                        "array literal has no destination",
                        span,
                    ));
                };
                let node = self.dynamic_array_node(id, items, &temp)?;
                let mut rendered = self.render_node(&node, span)?;
                rendered.text = temp;
                Ok(rendered)
            }

            ExprKind::Dict(entries) => {
                let Some(temp) = self.ctx.memory.reserved_temp_name(id).map(str::to_owned)
                else {
                    return Ok(self.placeholder(
                        ErrorCode::TypeInference,
                        "dict literal has no destination",
                        span,
                    ));
                };
                let node = self.dict_node(entries, &temp)?;
                let mut rendered = self.render_node(&node, span)?;
                rendered.text = temp;
                Ok(rendered)
            }

            ExprKind::Call { callee, args } => {
                let mut stmts = Vec::new();
                let mut texts: SmallVec<[String; 4]> = SmallVec::new();
                for &arg in &self.ctx.arena.expr_list(args).to_vec() {
                    let rendered = self.emit_expr(arg, None)?;
                    stmts.extend(rendered.stmts);
                    texts.push(rendered.text);
                }
                let call = format!("{}({})", self.ctx.mangle(callee), texts.join(", "));
                match self.ctx.memory.reserved_temp_name(id).map(str::to_owned) {
                    Some(temp) => {
                        stmts.push(format!("{temp} = {call};"));
                        Ok(EmittedExpr { text: temp, stmts })
                    }
                    None => Ok(EmittedExpr { text: call, stmts }),
                }
            }

            ExprKind::Method {
                receiver,
                method,
                args,
            } => self.emit_method(id, receiver, method, args, dest, span),

            ExprKind::Member { receiver, property } => {
                self.emit_member(receiver, property, span)
            }

            ExprKind::Index { receiver, index } => self.emit_index(receiver, index, span),

            ExprKind::Assign { target, value } => {
                let target_rendered = self.emit_expr(target, None)?;
                let value_rendered = self.emit_expr(value, None)?;
                let mut stmts = target_rendered.stmts;
                stmts.extend(value_rendered.stmts);
                Ok(EmittedExpr {
                    text: format!("{} = {}", target_rendered.text, value_rendered.text),
                    stmts,
                })
            }

            ExprKind::Error => Ok(self.placeholder(
                ErrorCode::TypeInference,
                "unresolved expression",
                span,
            )),
        }
    }

    fn emit_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<EmittedExpr, UnknownDependency> {
        let left = self.emit_expr(lhs, None)?;
        let right = self.emit_expr(rhs, None)?;
        let mut stmts = left.stmts;
        stmts.extend(right.stmts);

        let lhs_str = self.ctx.expr_type(lhs) == TypeId::STR;
        let rhs_str = self.ctx.expr_type(rhs) == TypeId::STR;

        let text = if (lhs_str || rhs_str) && op == BinaryOp::Add {
            let call = match (lhs_str, rhs_str) {
                (true, true) => {
                    self.ctx.deps.declare(keys::STR_CAT)?;
                    format!("str_cat({}, {})", left.text, right.text)
                }
                (true, false) => {
                    self.ctx.deps.declare(keys::STR_NUM_CAT)?;
                    format!("str_int16_t_cat({}, {})", left.text, right.text)
                }
                (false, true) => {
                    self.ctx.deps.declare(keys::NUM_STR_CAT)?;
                    format!("int16_t_str_cat({}, {})", left.text, right.text)
                }
                (false, false) => String::new(),
            };
            match self.ctx.memory.reserved_temp_name(id).map(str::to_owned) {
                Some(temp) => {
                    stmts.push(format!("{temp} = {call};"));
                    temp
                }
                None => call,
            }
        } else if (lhs_str || rhs_str) && matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            self.ctx.deps.declare(keys::STR_CMP)?;
            let bang = if op == BinaryOp::Ne { "!" } else { "" };
            format!("{bang}str_int16_t_cmp({}, {})", left.text, right.text)
        } else {
            format!("({} {} {})", left.text, op.c_symbol(), right.text)
        };

        Ok(EmittedExpr { text, stmts })
    }

    fn emit_method(
        &mut self,
        id: ExprId,
        receiver: ExprId,
        method: Name,
        args: ember_ir::ExprRange,
        dest: Option<&str>,
        span: Span,
    ) -> Result<EmittedExpr, UnknownDependency> {
        let method_name = self.ctx.resolve_name(method).to_owned();
        let Some(kind) = ReceiverKind::of(self.ctx, receiver) else {
            return Ok(self.placeholder(
                ErrorCode::TypeInference,
                &format!("no receiver for `.{method_name}()`"),
                span,
            ));
        };

        let Some(resolver) = self.resolvers.resolve(kind, &method_name) else {
            return Ok(self.placeholder(
                ErrorCode::TypeInference,
                &format!("unrecognized method `.{method_name}()`"),
                span,
            ));
        };
        let arity = resolver.arity;
        let build = resolver.build;

        let arg_ids: Vec<ExprId> = self.ctx.arena.expr_list(args).to_vec();
        if arg_ids.len() < arity.0 || arg_ids.len() > arity.1 {
            return Ok(self.placeholder(
                ErrorCode::UnsupportedArity,
                &format!(
                    "`.{method_name}()` expects {} to {} arguments, got {}",
                    arity.0,
                    arity.1,
                    arg_ids.len()
                ),
                span,
            ));
        }

        let mut stmts = Vec::new();
        let receiver_text = if kind == ReceiverKind::Console {
            String::new()
        } else {
            let rendered = self.emit_expr(receiver, None)?;
            stmts.extend(rendered.stmts);
            rendered.text
        };
        let mut arg_texts: Vec<String> = Vec::with_capacity(arg_ids.len());
        for &arg in &arg_ids {
            let rendered = self.emit_expr(arg, None)?;
            stmts.extend(rendered.stmts);
            arg_texts.push(rendered.text);
        }

        let reserved = self.ctx.memory.reserved_temp_name(id).map(str::to_owned);
        let dest = dest.map(str::to_owned).or(reserved);
        let site = CallSite {
            expr: id,
            receiver,
            receiver_text: &receiver_text,
            args: &arg_ids,
            arg_texts: &arg_texts,
            dest: dest.as_deref(),
        };

        match build(self.ctx, &site) {
            Ok(node) => {
                let mut rendered = self.render_node(&node, span)?;
                let mut all = stmts;
                all.append(&mut rendered.stmts);
                rendered.stmts = all;
                Ok(rendered)
            }
            Err(BuildError::Unsupported(reason)) => {
                Ok(self.placeholder(ErrorCode::TypeInference, &reason, span))
            }
            Err(BuildError::MissingDependency(err)) => Err(err),
        }
    }

    fn emit_member(
        &mut self,
        receiver: ExprId,
        property: Name,
        span: Span,
    ) -> Result<EmittedExpr, UnknownDependency> {
        let rendered = self.emit_expr(receiver, None)?;
        let property_name = self.ctx.resolve_name(property).to_owned();
        let receiver_ty = self.ctx.expr_type(receiver);

        if property_name == "length" {
            return match self.ctx.types.lookup(receiver_ty) {
                TypeData::Str => {
                    self.ctx.deps.declare(keys::STR_LEN)?;
                    Ok(EmittedExpr {
                        text: format!("str_len({})", rendered.text),
                        stmts: rendered.stmts,
                    })
                }
                TypeData::Array {
                    capacity: Capacity::Fixed(n),
                    ..
                } => {
                    // The tracked length when the array shrinks, else
                    // the literal capacity.
                    let text = self
                        .ctx
                        .oracle
                        .binding_of_expr(receiver)
                        .and_then(|binding| self.ctx.memory.fixed_len_name(binding))
                        .map_or_else(|| n.to_string(), str::to_owned);
                    Ok(EmittedExpr {
                        text,
                        stmts: rendered.stmts,
                    })
                }
                TypeData::Array { .. } => Ok(EmittedExpr {
                    text: format!("{}.length", rendered.text),
                    stmts: rendered.stmts,
                }),
                _ => Ok(self.placeholder(
                    ErrorCode::TypeInference,
                    "`.length` on a value without one",
                    span,
                )),
            };
        }

        // Struct field access.
        if let TypeData::Struct { fields } = self.ctx.types.lookup(receiver_ty) {
            if fields.iter().any(|&(name, _)| name == property) {
                return Ok(EmittedExpr {
                    text: format!("{}.{}", rendered.text, property_name),
                    stmts: rendered.stmts,
                });
            }
        }

        Ok(self.placeholder(
            ErrorCode::TypeInference,
            &format!("unknown property `.{property_name}`"),
            span,
        ))
    }

    fn emit_index(
        &mut self,
        receiver: ExprId,
        index: ExprId,
        span: Span,
    ) -> Result<EmittedExpr, UnknownDependency> {
        let base = self.emit_expr(receiver, None)?;
        let idx = self.emit_expr(index, None)?;
        let mut stmts = base.stmts;
        stmts.extend(idx.stmts);

        match self.ctx.types.lookup(self.ctx.expr_type(receiver)) {
            TypeData::Array {
                capacity: Capacity::Fixed(_),
                ..
            } => Ok(EmittedExpr {
                text: format!("{}[{}]", base.text, idx.text),
                stmts,
            }),
            TypeData::Array { .. } => Ok(EmittedExpr {
                text: format!("{}.data[{}]", base.text, idx.text),
                stmts,
            }),
            _ => Ok(self.placeholder(
                ErrorCode::TypeInference,
                "subscript is only defined for arrays; use `.get()` on dicts",
                span,
            )),
        }
    }

    // Literal builders

    /// `ARRAY_CREATE(dest); ARRAY_PUSH(dest, e0); …` as a template node
    /// with one push node per element.
    fn dynamic_array_node(
        &mut self,
        id: ExprId,
        items: ember_ir::ExprRange,
        dest: &str,
    ) -> Result<TemplateNode, UnknownDependency> {
        let elem = match self.ctx.types.lookup(self.ctx.expr_type(id)) {
            TypeData::Array { elem, .. } => elem,
            _ => TypeId::NUMBER,
        };
        self.ctx.deps.declare(self.array_typedef_key(elem))?;
        self.ctx.deps.declare(keys::ARRAY_MACROS)?;

        let mut pushes = Vec::new();
        let mut prelude = Vec::new();
        for &item in &self.ctx.arena.expr_list(items).to_vec() {
            let rendered = self.emit_expr(item, None)?;
            prelude.extend(rendered.stmts);
            pushes.push(self.bind_node(
                "ARRAY_PUSH({dest}, {value});\n",
                vec![("dest", dest.into()), ("value", rendered.text.into())],
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = vec![
            ("dest", dest.into()),
            ("pushes", pushes.into()),
        ];
        let mut source =
            String::from("{#statements}ARRAY_CREATE({dest});\n{pushes}{/statements}");
        if !prelude.is_empty() {
            source =
                String::from("{#statements}{prelude}ARRAY_CREATE({dest});\n{pushes}{/statements}");
            fields.push(("prelude", format!("{}\n", prelude.join("\n")).into()));
        }
        Ok(self.bind_node(&source, fields))
    }

    /// `dest = DICT_CREATE(); DICT_SET_…;` for a homogeneous dict.
    fn dict_node(
        &mut self,
        entries: ember_ir::ExprRange,
        dest: &str,
    ) -> Result<TemplateNode, UnknownDependency> {
        self.ctx.deps.declare(keys::DICT)?;

        let mut sets = Vec::new();
        let mut prelude = Vec::new();
        for entry in self.ctx.arena.dict_entries(entries).to_vec() {
            let rendered = self.emit_expr(entry.value, None)?;
            prelude.extend(rendered.stmts);
            let setter = if self.ctx.expr_type(entry.value) == TypeId::STR {
                "DICT_SET_STR_STR"
            } else {
                "DICT_SET_STR_INT"
            };
            sets.push(self.bind_node(
                "{setter}({dest}, \"{key}\", {value});\n",
                vec![
                    ("setter", setter.into()),
                    ("dest", dest.into()),
                    (
                        "key",
                        escape_c_string(self.ctx.resolve_name(entry.key)).into(),
                    ),
                    ("value", rendered.text.into()),
                ],
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = vec![
            ("dest", dest.into()),
            ("sets", sets.into()),
        ];
        let mut source =
            String::from("{#statements}{dest} = DICT_CREATE();\n{sets}{/statements}");
        if !prelude.is_empty() {
            source = String::from(
                "{#statements}{prelude}{dest} = DICT_CREATE();\n{sets}{/statements}",
            );
            fields.push(("prelude", format!("{}\n", prelude.join("\n")).into()));
        }
        Ok(self.bind_node(&source, fields))
    }

    fn array_typedef_key(&self, elem: TypeId) -> &'static str {
        if elem == TypeId::STR {
            keys::ARR_STR
        } else {
            keys::ARR_INT16
        }
    }

    // Support

    fn declare_type_deps(&mut self, ty: TypeId) -> Result<(), UnknownDependency> {
        declare_type_deps(self.ctx, ty)
    }

    fn bind_node(&self, source: &str, fields: Vec<(&str, FieldValue)>) -> TemplateNode {
        match Template::parse(source) {
            Ok(t) => t.bind(fields),
            Err(err) => {
                debug_assert!(false, "emitter template failed to parse: {err}");
                Template::literal("/* template defect */").bind(Vec::new())
            }
        }
    }

    /// Render a node; a reference to an unbound field is a resolver
    /// defect, reported and replaced rather than propagated.
    fn render_node(&mut self, node: &TemplateNode, span: Span) -> Result<EmittedExpr, UnknownDependency> {
        match node.render() {
            Ok(rendered) => Ok(EmittedExpr {
                text: rendered.text,
                stmts: rendered.statements,
            }),
            Err(err) => {
                debug_assert!(false, "template render defect: {err}");
                Ok(self.placeholder(
                    ErrorCode::TypeInference,
                    &format!("emission defect: {err}"),
                    span,
                ))
            }
        }
    }

    fn write_node(&mut self, node: &TemplateNode, buf: &mut CodeBuf) {
        match node.render() {
            Ok(rendered) => {
                for line in &rendered.statements {
                    buf.writeln(line);
                }
                if !rendered.text.is_empty() {
                    buf.write_block(&rendered.text);
                }
            }
            Err(err) => {
                debug_assert!(false, "template render defect: {err}");
                buf.writeln(&format!("/* emission defect: {err} */"));
            }
        }
    }

    fn write_releases(&mut self, stmt: StmtId, buf: &mut CodeBuf) -> Result<(), UnknownDependency> {
        for destructor in self.ctx.lifetimes.releases_for(stmt).to_vec() {
            let line = self.destructor_line(&destructor)?;
            buf.writeln(&line);
        }
        Ok(())
    }

    fn destructor_line(&mut self, destructor: &Destructor) -> Result<String, UnknownDependency> {
        let target = match &destructor.target {
            DropTarget::Binding(name) => self.ctx.mangle(*name),
            DropTarget::Temp(name) => name.clone(),
        };
        Ok(match destructor.kind {
            DropKind::Str => {
                self.ctx.deps.declare(keys::INCLUDE_STDLIB)?;
                format!("free({target});")
            }
            DropKind::ArrayData => {
                self.ctx.deps.declare(keys::INCLUDE_STDLIB)?;
                format!("free({target}.data);")
            }
            DropKind::Dict => {
                self.ctx.deps.declare(keys::DICT_FREE)?;
                format!("DICT_FREE({target});")
            }
        })
    }

    fn placeholder(&mut self, code: ErrorCode, message: &str, span: Span) -> EmittedExpr {
        tracing::warn!(%code, message, "emission placeholder");
        self.ctx
            .report
            .push(Diagnostic::warning(code, message.to_owned(), span));
        EmittedExpr {
            text: "0".to_owned(),
            stmts: vec![format!("/* {message} */")],
        }
    }
}

/// Declare the fragments a declaration of type `ty` relies on (array
/// header typedefs, the dict machinery, the stdint include).
pub(crate) fn declare_type_deps(
    ctx: &mut CodegenContext<'_>,
    ty: TypeId,
) -> Result<(), UnknownDependency> {
    match ctx.types.lookup(ty) {
        TypeData::Array {
            elem,
            capacity: Capacity::Dynamic,
        } => {
            let key = if elem == TypeId::STR {
                keys::ARR_STR
            } else {
                keys::ARR_INT16
            };
            ctx.deps.declare(key)?;
        }
        TypeData::Dict { .. } => {
            ctx.deps.declare(keys::DICT)?;
        }
        TypeData::Number | TypeData::Bool | TypeData::Array { .. } => {
            ctx.deps.declare(keys::INCLUDE_STDINT)?;
        }
        _ => {}
    }
    Ok(())
}
