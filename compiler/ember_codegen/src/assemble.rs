//! Program assembly: one emitted translation unit.
//!
//! Sections, in order: runtime fragments (includes, macros, typedefs,
//! helpers, in dependency order) → struct typedefs → global temporary
//! declarations → function prototypes → function bodies → `main()` →
//! appended post-program blocks.
//!
//! Function bodies and `main` are rendered first, into side buffers,
//! because rendering is what declares the dependencies; the registry is
//! drained only once everything that can declare has run.

use ember_diagnostic::{Diagnostic, DiagnosticReport, ErrorCode};
use ember_ir::{Module, Span};

use crate::context::CodegenContext;
use crate::deps::UnknownDependency;
use crate::emit::{declare_type_deps, Emitter};
use crate::resolver::ResolverRegistry;
use crate::runtime::keys;

/// The outcome of one compilation.
#[derive(Clone, Debug)]
pub struct CodegenResult {
    /// The translation unit; empty when a fatal defect aborted assembly.
    pub code: String,
    pub report: DiagnosticReport,
    /// False exactly when a fatal diagnostic was raised.
    pub success: bool,
}

/// Assemble the translation unit for `module`. Consumes the context:
/// registries are one-shot.
pub fn assemble(
    mut ctx: CodegenContext<'_>,
    resolvers: &ResolverRegistry,
    module: &Module,
) -> CodegenResult {
    match try_assemble(&mut ctx, resolvers, module) {
        Ok(code) => {
            let success = !ctx.report.iter().any(|d| d.code.is_fatal());
            CodegenResult {
                code,
                report: ctx.report,
                success,
            }
        }
        Err(err) => {
            ctx.report.push(Diagnostic::error(
                ErrorCode::UnregisteredDependency,
                err.to_string(),
                Span::DUMMY,
            ));
            CodegenResult {
                code: String::new(),
                report: ctx.report,
                success: false,
            }
        }
    }
}

fn try_assemble(
    ctx: &mut CodegenContext<'_>,
    resolvers: &ResolverRegistry,
    module: &Module,
) -> Result<String, UnknownDependency> {
    // int16_t appears in every emitted unit.
    ctx.deps.declare(keys::INCLUDE_STDINT)?;

    let signatures = ctx.oracle.signatures.clone();
    let mut prototypes = Vec::new();
    let mut bodies = Vec::new();
    let main_fn;
    {
        let mut emitter = Emitter::new(ctx, resolvers);
        for (function, sig) in module.functions.iter().zip(&signatures) {
            prototypes.push(format!("{};", emitter.signature(function, sig)));
            bodies.push(emitter.emit_function(function, sig)?);
        }
        main_fn = emitter.emit_main(module)?;
    }

    // Global temporaries may reference typedefs nothing else declared.
    for slot in ctx.memory.temp_declarations().to_vec() {
        declare_type_deps(ctx, slot.ty)?;
    }

    let mut out = String::with_capacity(4096);

    for fragment in ctx.deps.drain() {
        out.push_str(fragment.code);
    }
    out.push('\n');

    let typedefs = ctx.mapper().struct_typedefs();
    for typedef in &typedefs {
        out.push_str(typedef);
        out.push('\n');
    }

    let mapper = ctx.mapper();
    let temps = ctx.memory.temp_declarations();
    for slot in temps {
        out.push_str(&format!("static {};\n", mapper.declaration(slot.ty, &slot.name)));
    }
    if !temps.is_empty() {
        out.push('\n');
    }

    for prototype in &prototypes {
        out.push_str(prototype);
        out.push('\n');
    }
    if !prototypes.is_empty() {
        out.push('\n');
    }

    for body in &bodies {
        out.push_str(body);
        out.push('\n');
    }

    out.push_str(&main_fn);

    for block in ctx.trailers.drain() {
        out.push('\n');
        out.push_str(&block);
        if !block.ends_with('\n') {
            out.push('\n');
        }
    }

    tracing::debug!(bytes = out.len(), "translation unit assembled");
    Ok(out)
}
