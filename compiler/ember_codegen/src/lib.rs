//! C backend for the Ember scripting subset.
//!
//! Translates a typed module into one self-contained ANSI C translation
//! unit with no garbage collector and no external runtime: every helper
//! the emitted code calls is embedded as a source fragment, and every
//! heap allocation is paired with an emitted `free`.
//!
//! The pipeline runs in fixed phases over an immutable module:
//!
//! 1. [`TypeOracle`](ember_types::TypeOracle) resolves every expression
//!    and binding to a concrete C type.
//! 2. [`MemoryManager`] plans the global temporary slots out-parameter
//!    macros and heap-producing expressions write through.
//! 3. [`LifetimeTracker`] schedules releases: scope destructors,
//!    per-statement temporary frees, and return unwinds.
//! 4. [`assemble`](assemble::assemble) renders functions and `main`,
//!    resolves helper dependencies, and lays out the translation unit.
//!
//! Failures degrade: untranslatable constructs become placeholder
//! comments with a warning in the [`DiagnosticReport`], and only an
//! unregistered dependency key fails the compilation outright.

pub mod assemble;
pub mod context;
pub mod ctype;
pub mod deps;
pub mod emit;
pub mod lifetime;
pub mod memory;
pub mod resolver;
pub mod runtime;
pub mod template;

use ember_diagnostic::DiagnosticReport;
use ember_ir::{ExprArena, Module, Name, StringInterner};
use ember_types::{TypeId, TypeInterner, TypeOracle};

pub use assemble::CodegenResult;
pub use context::CodegenContext;
pub use ctype::CTypeMapper;
pub use deps::{DependencyRegistry, EntryRegistry, Fragment, PostProgramRegistry};
pub use lifetime::{LifetimePlan, LifetimeTracker};
pub use memory::MemoryManager;
pub use resolver::ResolverRegistry;
pub use template::{Template, TemplateNode};

/// Host-supplied inputs that shape one compilation.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Types for function parameters inference cannot see through.
    pub param_hints: Vec<(Name, TypeId)>,
    /// Statements inserted at the top of `main`, before translated code.
    pub entry_snippets: Vec<String>,
    /// Source blocks appended after the translated program.
    pub trailer_blocks: Vec<String>,
}

/// Compile `module` to a C translation unit.
pub fn compile(
    module: &Module,
    arena: &ExprArena,
    names: &StringInterner,
    types: &TypeInterner,
    options: &CompileOptions,
) -> CodegenResult {
    let mut report = DiagnosticReport::new();

    let mut oracle = TypeOracle::new(arena, names, types, &mut report);
    for &(name, ty) in &options.param_hints {
        oracle = oracle.with_param_hint(name, ty);
    }
    let oracle = oracle.infer(module);

    let resolvers = ResolverRegistry::standard();
    let mut memory = MemoryManager::new(arena, names, types, &oracle, &resolvers);
    memory.preprocess(module);

    let lifetimes =
        LifetimeTracker::new(arena, names, types, &oracle, &memory, &mut report).track(module);

    let mut ctx = CodegenContext::new(arena, names, types, &oracle, &memory, &lifetimes);
    ctx.report.extend(report.into_vec());
    for snippet in &options.entry_snippets {
        ctx.entries.push(snippet.clone());
    }
    for block in &options.trailer_blocks {
        ctx.trailers.push(block.clone());
    }

    assemble::assemble(ctx, &resolvers, module)
}
