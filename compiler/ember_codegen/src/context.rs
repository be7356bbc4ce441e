//! Code generation context and state.
//!
//! The `CodegenContext` is the explicit compilation-scoped value threaded
//! through resolvers and the assembler: type information, the memory and
//! lifetime plans, the dependency registries, and the diagnostic report.
//! Nothing in the pipeline is process-global, so independent compilations
//! never share state.

use ember_diagnostic::DiagnosticReport;
use ember_ir::{ExprArena, ExprId, Name, StringInterner};
use ember_types::{OracleResult, TypeId, TypeInterner};

use crate::ctype::CTypeMapper;
use crate::deps::{DependencyRegistry, EntryRegistry, PostProgramRegistry};
use crate::lifetime::LifetimePlan;
use crate::memory::MemoryManager;
use crate::runtime;

/// All state for one compilation of one module.
pub struct CodegenContext<'a> {
    pub arena: &'a ExprArena,
    pub names: &'a StringInterner,
    pub types: &'a TypeInterner,
    pub oracle: &'a OracleResult,
    pub memory: &'a MemoryManager<'a>,
    pub lifetimes: &'a LifetimePlan,
    pub deps: DependencyRegistry,
    pub entries: EntryRegistry,
    pub trailers: PostProgramRegistry,
    pub report: DiagnosticReport,
}

impl<'a> CodegenContext<'a> {
    pub fn new(
        arena: &'a ExprArena,
        names: &'a StringInterner,
        types: &'a TypeInterner,
        oracle: &'a OracleResult,
        memory: &'a MemoryManager<'a>,
        lifetimes: &'a LifetimePlan,
    ) -> Self {
        Self {
            arena,
            names,
            types,
            oracle,
            memory,
            lifetimes,
            deps: DependencyRegistry::new(runtime::CATALOG),
            entries: EntryRegistry::default(),
            trailers: PostProgramRegistry::default(),
            report: DiagnosticReport::default(),
        }
    }

    #[inline]
    pub fn expr_type(&self, id: ExprId) -> TypeId {
        self.oracle.expr_type(id)
    }

    #[inline]
    pub fn resolve_name(&self, name: Name) -> &str {
        self.names.lookup(name)
    }

    pub fn mapper(&self) -> CTypeMapper<'a> {
        CTypeMapper::new(self.names, self.types)
    }

    /// Mangle a script name for C compatibility.
    ///
    /// C identifiers can only contain alphanumeric characters and
    /// underscores, and cannot start with a digit; the prefix also keeps
    /// user names clear of the runtime helpers.
    pub fn mangle(&self, name: Name) -> String {
        let s = self.names.lookup(name);
        let mut result = String::with_capacity(s.len() + 3);
        result.push_str("em_");
        for c in s.chars() {
            if c.is_alphanumeric() {
                result.push(c);
            } else {
                result.push('_');
            }
        }
        result
    }
}

/// Escape a string for inclusion in a C string literal.
pub fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// An indented output buffer for whole-unit assembly.
#[derive(Default)]
pub struct CodeBuf {
    indent: usize,
    output: String,
}

impl CodeBuf {
    pub fn new() -> Self {
        CodeBuf {
            indent: 0,
            output: String::with_capacity(4096),
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write one line at the current indent level.
    pub fn writeln(&mut self, line: &str) {
        if line.is_empty() {
            self.output.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    /// Write pre-rendered multi-line text, indenting each line.
    pub fn write_block(&mut self, text: &str) {
        for line in text.lines() {
            self.writeln(line);
        }
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mangling_sanitizes() {
        let arena = ExprArena::new();
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let oracle = OracleResult::default();
        let resolvers = crate::resolver::ResolverRegistry::standard();
        let memory = MemoryManager::new(&arena, &names, &types, &oracle, &resolvers);
        let lifetimes = LifetimePlan::default();
        let ctx = CodegenContext::new(&arena, &names, &types, &oracle, &memory, &lifetimes);

        let odd = names.intern("my$var");
        assert_eq!(ctx.mangle(odd), "em_my_var");
    }

    #[test]
    fn escape_covers_quotes_and_newlines() {
        assert_eq!(escape_c_string("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn buffer_indents_blocks() {
        let mut buf = CodeBuf::new();
        buf.writeln("int main(void)");
        buf.writeln("{");
        buf.indent();
        buf.writeln("return 0;");
        buf.dedent();
        buf.writeln("}");
        assert_eq!(buf.finish(), "int main(void)\n{\n    return 0;\n}\n");
    }
}
