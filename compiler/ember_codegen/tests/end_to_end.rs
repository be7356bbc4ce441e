//! Whole-pipeline tests: build a module, compile it, assert on the
//! emitted C text.

use ember_codegen::{compile, CompileOptions};
use ember_diagnostic::ErrorCode;
use ember_ir::{
    BinaryOp, DictEntry, ExprArena, ExprId, ExprKind, Function, Module, Param, Span, StmtId,
    StmtKind, StringInterner,
};
use ember_types::{TypeId, TypeInterner};

struct Fixture {
    arena: ExprArena,
    names: StringInterner,
    types: TypeInterner,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            arena: ExprArena::new(),
            names: StringInterner::new(),
            types: TypeInterner::new(),
        }
    }

    fn number(&mut self, n: i32) -> ExprId {
        self.arena.alloc_expr(ExprKind::Number(n), Span::DUMMY)
    }

    fn string(&mut self, text: &str) -> ExprId {
        let name = self.names.intern(text);
        self.arena.alloc_expr(ExprKind::Str(name), Span::DUMMY)
    }

    fn ident(&mut self, name: &str) -> ExprId {
        let name = self.names.intern(name);
        self.arena.alloc_expr(ExprKind::Ident(name), Span::DUMMY)
    }

    fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.arena
            .alloc_expr(ExprKind::Binary { op, lhs, rhs }, Span::DUMMY)
    }

    fn array(&mut self, items: &[ExprId]) -> ExprId {
        let items = self.arena.alloc_expr_list(items);
        self.arena.alloc_expr(ExprKind::Array(items), Span::DUMMY)
    }

    fn dict(&mut self, entries: &[(&str, ExprId)]) -> ExprId {
        let entries: Vec<DictEntry> = entries
            .iter()
            .map(|&(key, value)| DictEntry {
                key: self.names.intern(key),
                value,
            })
            .collect();
        let range = self.arena.alloc_dict_entries(&entries);
        self.arena.alloc_expr(ExprKind::Dict(range), Span::DUMMY)
    }

    fn method(&mut self, receiver: ExprId, method: &str, args: &[ExprId]) -> ExprId {
        let method = self.names.intern(method);
        let args = self.arena.alloc_expr_list(args);
        self.arena.alloc_expr(
            ExprKind::Method {
                receiver,
                method,
                args,
            },
            Span::DUMMY,
        )
    }

    fn member(&mut self, receiver: ExprId, property: &str) -> ExprId {
        let property = self.names.intern(property);
        self.arena
            .alloc_expr(ExprKind::Member { receiver, property }, Span::DUMMY)
    }

    fn call(&mut self, callee: &str, args: &[ExprId]) -> ExprId {
        let callee = self.names.intern(callee);
        let args = self.arena.alloc_expr_list(args);
        self.arena
            .alloc_expr(ExprKind::Call { callee, args }, Span::DUMMY)
    }

    fn let_stmt(&mut self, name: &str, init: ExprId) -> StmtId {
        let name = self.names.intern(name);
        self.arena
            .alloc_stmt(StmtKind::Let { name, init }, Span::DUMMY)
    }

    fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Expr(expr), Span::DUMMY)
    }

    fn console_log(&mut self, arg: ExprId) -> StmtId {
        let console = self.ident("console");
        let log = self.method(console, "log", &[arg]);
        self.expr_stmt(log)
    }

}

fn assert_before(code: &str, first: &str, second: &str) {
    let a = code.find(first).unwrap_or_else(|| panic!("missing {first:?}"));
    let b = code
        .find(second)
        .unwrap_or_else(|| panic!("missing {second:?}"));
    assert!(a < b, "{first:?} should precede {second:?}\n{code}");
}

#[test]
fn arithmetic_prints_through_printf() {
    let mut fx = Fixture::new();
    let three = fx.number(3);
    let four = fx.number(4);
    let sum = fx.binary(BinaryOp::Add, three, four);
    let log = fx.console_log(sum);
    let top = fx.arena.alloc_block(&[log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("#include <stdint.h>"));
    assert!(result.code.contains("#include <stdio.h>"));
    assert!(result.code.contains("int main(void)"));
    assert!(result.code.contains("printf(\"%d\\n\", (3 + 4));"));
    assert!(result.code.contains("return 0;"));
}

#[test]
fn let_binding_declares_then_assigns() {
    let mut fx = Fixture::new();
    let two = fx.number(2);
    let let_x = fx.let_stmt("x", two);
    let x = fx.ident("x");
    let five = fx.number(5);
    let product = fx.binary(BinaryOp::Mul, x, five);
    let log = fx.console_log(product);
    let top = fx.arena.alloc_block(&[let_x, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success);
    assert!(result.code.contains("int16_t em_x;"));
    assert!(result.code.contains("em_x = 2;"));
    assert!(result.code.contains("printf(\"%d\\n\", (em_x * 5));"));
    assert_before(&result.code, "int16_t em_x;", "em_x = 2;");
}

#[test]
fn string_binding_prints_with_s_spec() {
    let mut fx = Fixture::new();
    let hi = fx.string("hi");
    let let_s = fx.let_stmt("s", hi);
    let s = fx.ident("s");
    let log = fx.console_log(s);
    let top = fx.arena.alloc_block(&[let_s, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success);
    assert!(result.code.contains("char * em_s;"));
    assert!(result.code.contains("em_s = \"hi\";"));
    assert!(result.code.contains("printf(\"%s\\n\", em_s);"));
    // A literal binding owns nothing.
    assert!(!result.code.contains("free(em_s);"));
}

#[test]
fn dynamic_array_creates_pushes_pops_and_frees() {
    let mut fx = Fixture::new();
    let empty = fx.array(&[]);
    let let_a = fx.let_stmt("a", empty);
    let a1 = fx.ident("a");
    let one = fx.number(1);
    let push = fx.method(a1, "push", &[one]);
    let push_stmt = fx.expr_stmt(push);
    let a2 = fx.ident("a");
    let pop = fx.method(a2, "pop", &[]);
    let let_v = fx.let_stmt("v", pop);
    let v = fx.ident("v");
    let log = fx.console_log(v);
    let top = fx.arena.alloc_block(&[let_a, push_stmt, let_v, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("arr_int16_t_t em_a;"));
    assert!(result.code.contains("ARRAY_CREATE(em_a);"));
    assert!(result.code.contains("ARRAY_PUSH(em_a, 1);"));
    assert!(result.code.contains("ARRAY_POP(em_a, em_v);"));
    assert!(result.code.contains("free(em_a.data);"));
    assert_before(&result.code, "ARRAY_POP(em_a, em_v);", "free(em_a.data);");
}

#[test]
fn simultaneous_pops_hoist_into_distinct_temporaries() {
    let mut fx = Fixture::new();
    let one = fx.number(1);
    let lit = fx.array(&[one]);
    let let_a = fx.let_stmt("a", lit);
    let a0 = fx.ident("a");
    let two = fx.number(2);
    let grow = fx.method(a0, "push", &[two]);
    let grow_stmt = fx.expr_stmt(grow);
    let a1 = fx.ident("a");
    let pop1 = fx.method(a1, "pop", &[]);
    let a2 = fx.ident("a");
    let pop2 = fx.method(a2, "pop", &[]);
    let sum = fx.binary(BinaryOp::Add, pop1, pop2);
    let let_x = fx.let_stmt("x", sum);
    let x = fx.ident("x");
    let log = fx.console_log(x);
    let top = fx.arena.alloc_block(&[let_a, grow_stmt, let_x, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("static int16_t _tmp0;"));
    assert!(result.code.contains("static int16_t _tmp1;"));
    assert!(result.code.contains("ARRAY_POP(em_a, _tmp0);"));
    assert!(result.code.contains("ARRAY_POP(em_a, _tmp1);"));
    assert!(result.code.contains("em_x = (_tmp0 + _tmp1);"));
}

#[test]
fn nested_pop_operands_keep_their_own_temporaries() {
    let mut fx = Fixture::new();
    let empty = fx.array(&[]);
    let let_a = fx.let_stmt("a", empty);
    let a0 = fx.ident("a");
    let two = fx.number(2);
    let grow1 = fx.method(a0, "push", &[two]);
    let grow1_stmt = fx.expr_stmt(grow1);
    let a1 = fx.ident("a");
    let three = fx.number(3);
    let grow2 = fx.method(a1, "push", &[three]);
    let grow2_stmt = fx.expr_stmt(grow2);
    let a2 = fx.ident("a");
    let pop1 = fx.method(a2, "pop", &[]);
    let one = fx.number(1);
    let inner = fx.binary(BinaryOp::Add, pop1, one);
    let a3 = fx.ident("a");
    let pop2 = fx.method(a3, "pop", &[]);
    let outer = fx.binary(BinaryOp::Add, inner, pop2);
    let log = fx.console_log(outer);
    let top = fx
        .arena
        .alloc_block(&[let_a, grow1_stmt, grow2_stmt, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    // The first pop stays live across the inner addition; the second
    // pop must not reuse its slot.
    assert!(result.code.contains("static int16_t _tmp0;"));
    assert!(result.code.contains("static int16_t _tmp1;"));
    assert!(result.code.contains("ARRAY_POP(em_a, _tmp0);"));
    assert!(result.code.contains("ARRAY_POP(em_a, _tmp1);"));
    assert!(result.code.contains("printf(\"%d\\n\", ((_tmp0 + 1) + _tmp1));"));
}

#[test]
fn same_name_in_function_and_main_binds_independently() {
    let mut fx = Fixture::new();
    let hi = fx.string("hi");
    let let_inner = fx.let_stmt("v", hi);
    let v_inner = fx.ident("v");
    let log_inner = fx.console_log(v_inner);
    let body = fx.arena.alloc_block(&[let_inner, log_inner]);
    let f_name = fx.names.intern("f");
    let function = Function {
        name: f_name,
        params: Vec::new(),
        body,
        span: Span::DUMMY,
    };

    let one = fx.number(1);
    let let_outer = fx.let_stmt("v", one);
    let v_outer = fx.ident("v");
    let log_outer = fx.console_log(v_outer);
    let top = fx.arena.alloc_block(&[let_outer, log_outer]);
    let module = Module {
        functions: vec![function],
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(!result
        .report
        .iter()
        .any(|d| d.code == ErrorCode::TypeInference));
    assert!(result.code.contains("char * em_v;"));
    assert!(result.code.contains("int16_t em_v;"));
    assert!(result.code.contains("printf(\"%s\\n\", em_v);"));
    assert!(result.code.contains("printf(\"%d\\n\", em_v);"));
    // Neither binding owns heap storage.
    assert!(!result.code.contains("free(em_v);"));
}

#[test]
fn fixed_array_pop_tracks_length_in_a_slot() {
    let mut fx = Fixture::new();
    let nine = fx.number(9);
    let eight = fx.number(8);
    let seven = fx.number(7);
    let lit = fx.array(&[nine, eight, seven]);
    let let_xs = fx.let_stmt("xs", lit);
    let xs1 = fx.ident("xs");
    let pop = fx.method(xs1, "pop", &[]);
    let let_a = fx.let_stmt("a", pop);
    let a = fx.ident("a");
    let log_a = fx.console_log(a);
    let xs2 = fx.ident("xs");
    let len = fx.member(xs2, "length");
    let log_len = fx.console_log(len);
    let top = fx.arena.alloc_block(&[let_xs, let_a, log_a, log_len]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("int16_t em_xs[3];"));
    assert!(result.code.contains("_tmp0 = 3;"));
    assert!(result.code.contains("FIXED_POP(em_xs, _tmp0, em_a);"));
    // `.length` reads the tracked length, not the literal capacity.
    assert!(result.code.contains("printf(\"%d\\n\", _tmp0);"));
    assert!(!result.code.contains("ARRAY_POP"));
    assert!(!result.code.contains("free("));
}

#[test]
fn fixed_array_index_of_scans_literal_capacity() {
    let mut fx = Fixture::new();
    let four = fx.number(4);
    let five = fx.number(5);
    let six = fx.number(6);
    let lit = fx.array(&[four, five, six]);
    let let_xs = fx.let_stmt("xs", lit);
    let xs = fx.ident("xs");
    let needle = fx.number(5);
    let pos = fx.method(xs, "indexOf", &[needle]);
    let let_i = fx.let_stmt("i", pos);
    let i = fx.ident("i");
    let log = fx.console_log(i);
    let top = fx.arena.alloc_block(&[let_xs, let_i, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("int16_t em_xs[3];"));
    assert!(result.code.contains("FIXED_INDEX_OF(em_xs, 3, 5, em_i);"));
    assert!(result.code.contains("printf(\"%d\\n\", em_i);"));
}

#[test]
fn helper_fragment_is_emitted_once_for_many_uses() {
    let mut fx = Fixture::new();
    let s1 = fx.string("abc");
    let n1 = fx.string("b");
    let first = fx.method(s1, "indexOf", &[n1]);
    let log1 = fx.console_log(first);
    let s2 = fx.string("xyz");
    let n2 = fx.string("z");
    let second = fx.method(s2, "indexOf", &[n2]);
    let log2 = fx.console_log(second);
    let top = fx.arena.alloc_block(&[log1, log2]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success);
    assert_eq!(result.code.matches("int16_t str_pos(").count(), 1);
    assert_eq!(result.code.matches("#include <stdint.h>").count(), 1);
    assert!(result.code.contains("str_pos(\"abc\", \"b\")"));
    assert!(result.code.contains("str_pos(\"xyz\", \"z\")"));
}

#[test]
fn concat_result_is_owned_and_freed_after_last_use() {
    let mut fx = Fixture::new();
    let a = fx.string("a");
    let let_s = fx.let_stmt("s", a);
    let s = fx.ident("s");
    let b = fx.string("b");
    let concat = fx.method(s, "concat", &[b]);
    let let_c = fx.let_stmt("c", concat);
    let c = fx.ident("c");
    let log = fx.console_log(c);
    let top = fx.arena.alloc_block(&[let_s, let_c, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("em_c = str_cat(em_s, \"b\");"));
    assert!(result.code.contains("free(em_c);"));
    assert_before(&result.code, "printf(\"%s\\n\", em_c);", "free(em_c);");
}

#[test]
fn substring_without_end_uses_full_length() {
    let mut fx = Fixture::new();
    let hello = fx.string("hello");
    let let_s = fx.let_stmt("s", hello);
    let s = fx.ident("s");
    let one = fx.number(1);
    let sub = fx.method(s, "substring", &[one]);
    let let_t = fx.let_stmt("t", sub);
    let t = fx.ident("t");
    let log = fx.console_log(t);
    let top = fx.arena.alloc_block(&[let_s, let_t, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success);
    assert!(result
        .code
        .contains("em_t = str_slice(em_s, 1, str_len(em_s));"));
}

#[test]
fn dict_lifecycle_create_set_get_free() {
    let mut fx = Fixture::new();
    let one = fx.number(1);
    let lit = fx.dict(&[("a", one)]);
    let let_d = fx.let_stmt("d", lit);
    let d1 = fx.ident("d");
    let key_b = fx.string("b");
    let two = fx.number(2);
    let set = fx.method(d1, "set", &[key_b, two]);
    let set_stmt = fx.expr_stmt(set);
    let d2 = fx.ident("d");
    let key_a = fx.string("a");
    let get = fx.method(d2, "get", &[key_a]);
    let let_g = fx.let_stmt("g", get);
    let g = fx.ident("g");
    let log = fx.console_log(g);
    let top = fx.arena.alloc_block(&[let_d, set_stmt, let_g, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("dict_t * em_d;"));
    assert!(result.code.contains("em_d = DICT_CREATE();"));
    assert!(result.code.contains("DICT_SET_STR_INT(em_d, \"a\", 1);"));
    assert!(result.code.contains("DICT_SET_STR_INT(em_d, \"b\", 2);"));
    assert!(result.code.contains("DICT_GET(em_d, \"a\", em_g);"));
    assert!(result.code.contains("DICT_FREE(em_d);"));
}

#[test]
fn regex_match_clears_at_entry_and_adopts_the_buffer() {
    let mut fx = Fixture::new();
    let abc = fx.string("abc");
    let let_s = fx.let_stmt("s", abc);
    let s = fx.ident("s");
    let pat = fx.string("b*");
    let matched = fx.method(s, "match", &[pat]);
    let let_m = fx.let_stmt("m", matched);
    let top = fx.arena.alloc_block(&[let_s, let_m]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("regex_match(em_s, \"b*\");"));
    assert!(result.code.contains("em_m = regex_matches;"));
    assert!(result.code.contains("free(em_m.data);"));
    assert_before(
        &result.code,
        "regex_clear_matches();",
        "regex_match(em_s, \"b*\");",
    );
}

#[test]
fn user_function_gets_prototype_and_mangled_call() {
    let mut fx = Fixture::new();
    let x_name = fx.names.intern("x");
    let x = fx.ident("x");
    let one = fx.number(1);
    let sum = fx.binary(BinaryOp::Add, x, one);
    let ret = fx.arena.alloc_stmt(StmtKind::Return(Some(sum)), Span::DUMMY);
    let body = fx.arena.alloc_block(&[ret]);
    let f_name = fx.names.intern("f");
    let function = Function {
        name: f_name,
        params: vec![Param {
            name: x_name,
            span: Span::DUMMY,
        }],
        body,
        span: Span::DUMMY,
    };

    let two = fx.number(2);
    let call = fx.call("f", &[two]);
    let log = fx.console_log(call);
    let top = fx.arena.alloc_block(&[log]);
    let module = Module {
        functions: vec![function],
        top_level: Some(top),
    };

    let options = CompileOptions {
        param_hints: vec![(x_name, TypeId::NUMBER)],
        ..CompileOptions::default()
    };
    let result = compile(&module, &fx.arena, &fx.names, &fx.types, &options);

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("int16_t em_f(int16_t em_x);"));
    assert!(result.code.contains("return (em_x + 1);"));
    assert!(result.code.contains("printf(\"%d\\n\", em_f(2));"));
    assert_before(
        &result.code,
        "int16_t em_f(int16_t em_x);",
        "int main(void)",
    );
}

#[test]
fn return_materializes_before_pending_frees() {
    let mut fx = Fixture::new();
    let a = fx.string("a");
    let b = fx.string("b");
    let concat = fx.method(a, "concat", &[b]);
    let let_t = fx.let_stmt("t", concat);
    let five = fx.number(5);
    let ret = fx
        .arena
        .alloc_stmt(StmtKind::Return(Some(five)), Span::DUMMY);
    let body = fx.arena.alloc_block(&[let_t, ret]);
    let g_name = fx.names.intern("g");
    let function = Function {
        name: g_name,
        params: Vec::new(),
        body,
        span: Span::DUMMY,
    };
    let module = Module {
        functions: vec![function],
        top_level: None,
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success, "{:?}", result.report);
    assert!(result.code.contains("int16_t em_g(void)"));
    assert!(result.code.contains("int16_t _ret = 5;"));
    assert!(result.code.contains("return _ret;"));
    assert_before(&result.code, "int16_t _ret = 5;", "free(em_t);");
    assert_before(&result.code, "free(em_t);", "return _ret;");
}

#[test]
fn aliased_buffer_is_retained_with_a_note() {
    let mut fx = Fixture::new();
    let a = fx.string("x");
    let b = fx.string("y");
    let concat = fx.method(a, "concat", &[b]);
    let let_s = fx.let_stmt("s", concat);
    let s = fx.ident("s");
    let let_t = fx.let_stmt("t", s);
    let t = fx.ident("t");
    let log = fx.console_log(t);
    let top = fx.arena.alloc_block(&[let_s, let_t, log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let result = compile(
        &module,
        &fx.arena,
        &fx.names,
        &fx.types,
        &CompileOptions::default(),
    );

    assert!(result.success);
    assert!(result
        .report
        .iter()
        .any(|d| d.code == ErrorCode::MemoryAliasing));
    // The original owner is still freed; the alias never is.
    assert!(result.code.contains("free(em_s);"));
    assert!(!result.code.contains("free(em_t);"));
}

#[test]
fn entry_snippets_and_trailer_blocks_are_placed() {
    let mut fx = Fixture::new();
    let seven = fx.number(7);
    let log = fx.console_log(seven);
    let top = fx.arena.alloc_block(&[log]);
    let module = Module {
        functions: Vec::new(),
        top_level: Some(top),
    };

    let options = CompileOptions {
        entry_snippets: vec!["hw_init();".to_owned()],
        trailer_blocks: vec!["/* vendor epilogue */".to_owned()],
        ..CompileOptions::default()
    };
    let result = compile(&module, &fx.arena, &fx.names, &fx.types, &options);

    assert!(result.success);
    assert_before(&result.code, "int main(void)", "hw_init();");
    assert_before(&result.code, "hw_init();", "printf(");
    assert_before(&result.code, "return 0;", "/* vendor epilogue */");
}

#[test]
fn unregistered_dependency_fails_the_compilation() {
    use ember_codegen::{
        assemble::assemble, CodegenContext, DependencyRegistry, LifetimePlan, MemoryManager,
        ResolverRegistry,
    };
    use ember_types::OracleResult;

    let arena = ExprArena::new();
    let names = StringInterner::new();
    let types = TypeInterner::new();
    let oracle = OracleResult::default();
    let resolvers = ResolverRegistry::standard();
    let memory = MemoryManager::new(&arena, &names, &types, &oracle, &resolvers);
    let lifetimes = LifetimePlan::default();
    let mut ctx = CodegenContext::new(&arena, &names, &types, &oracle, &memory, &lifetimes);
    ctx.deps = DependencyRegistry::new(&[]);

    let module = Module::default();
    let result = assemble(ctx, &resolvers, &module);

    assert!(!result.success);
    assert!(result.code.is_empty());
    assert!(result
        .report
        .iter()
        .any(|d| d.code == ErrorCode::UnregisteredDependency));
}
