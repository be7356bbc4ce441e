//! The resolver registry: call shapes to emission nodes.
//!
//! Every standard-library call (`console.log`, array methods, string
//! methods, dict methods) routes through one closed table keyed by
//! (receiver kind, method name). A resolver builds the template node for
//! its call site and performs the unavoidable construction-time side
//! effects: dependency declarations and entry-snippet registration.
//! Rendering stays pure.
//!
//! Registering two resolvers for the same key is a configuration defect,
//! caught by a debug assertion at registry construction.

use ember_ir::ExprId;
use ember_types::{Capacity, TypeData, TypeId};
use rustc_hash::FxHashMap;

use crate::context::CodegenContext;
use crate::deps::UnknownDependency;
use crate::runtime::keys;
use crate::template::{FieldValue, Template, TemplateNode};

/// Receiver classification used for dispatch.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReceiverKind {
    Console,
    Array,
    Str,
    Dict,
}

impl ReceiverKind {
    /// Classify a receiver expression. `console` arrives as an ident the
    /// oracle types as void.
    pub fn of(ctx: &CodegenContext<'_>, receiver: ExprId) -> Option<ReceiverKind> {
        if let ember_ir::ExprKind::Ident(name) = ctx.arena.expr(receiver).kind {
            if ctx.resolve_name(name) == "console" {
                return Some(ReceiverKind::Console);
            }
        }
        Self::of_type(&ctx.types.lookup(ctx.expr_type(receiver)))
    }

    /// Classification from the receiver's type alone.
    pub fn of_type(data: &TypeData) -> Option<ReceiverKind> {
        match data {
            TypeData::Array { .. } => Some(ReceiverKind::Array),
            TypeData::Str => Some(ReceiverKind::Str),
            TypeData::Dict { .. } => Some(ReceiverKind::Dict),
            _ => None,
        }
    }
}

/// Everything a resolver needs about one call site. Subexpressions are
/// already rendered; the resolver only composes.
pub struct CallSite<'t> {
    pub expr: ExprId,
    pub receiver: ExprId,
    pub receiver_text: &'t str,
    pub args: &'t [ExprId],
    pub arg_texts: &'t [String],
    /// Adopting destination: a reserved temporary, or the binding name
    /// when the call initializes a `let`.
    pub dest: Option<&'t str>,
}

/// Why a resolver could not build its node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// Fatal: a fragment key outside the catalog.
    MissingDependency(UnknownDependency),
    /// Non-fatal: the shape is recognized but this form is not
    /// expressible; the site becomes a placeholder comment.
    Unsupported(String),
}

impl From<UnknownDependency> for BuildError {
    fn from(err: UnknownDependency) -> Self {
        BuildError::MissingDependency(err)
    }
}

type BuildFn = fn(&mut CodegenContext<'_>, &CallSite<'_>) -> Result<TemplateNode, BuildError>;

/// One registered call-shape handler.
pub struct Resolver {
    pub receiver: ReceiverKind,
    pub method: &'static str,
    /// Inclusive argument-count range.
    pub arity: (usize, usize),
    /// Whether the result can own a buffer needing disposal.
    pub disposes: bool,
    pub build: BuildFn,
}

/// The closed dispatch table.
pub struct ResolverRegistry {
    resolvers: Vec<Resolver>,
    index: FxHashMap<(ReceiverKind, &'static str), usize>,
}

impl ResolverRegistry {
    /// The standard table with every built-in shape registered.
    pub fn standard() -> Self {
        let mut registry = ResolverRegistry {
            resolvers: Vec::new(),
            index: FxHashMap::default(),
        };
        for resolver in builtin_resolvers() {
            registry.register(resolver);
        }
        registry
    }

    pub fn register(&mut self, resolver: Resolver) {
        let key = (resolver.receiver, resolver.method);
        let idx = self.resolvers.len();
        let previous = self.index.insert(key, idx);
        debug_assert!(
            previous.is_none(),
            "two resolvers registered for {key:?}"
        );
        self.resolvers.push(resolver);
    }

    pub fn resolve(&self, receiver: ReceiverKind, method: &str) -> Option<&Resolver> {
        self.index
            .get(&(receiver, method))
            .map(|&idx| &self.resolvers[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

fn builtin_resolvers() -> Vec<Resolver> {
    vec![
        Resolver {
            receiver: ReceiverKind::Console,
            method: "log",
            arity: (1, 1),
            disposes: false,
            build: build_console_log,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "push",
            arity: (1, 1),
            disposes: false,
            build: build_array_push,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "pop",
            arity: (0, 0),
            disposes: false,
            build: build_array_pop,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "shift",
            arity: (0, 0),
            disposes: false,
            build: build_array_shift,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "unshift",
            arity: (1, 1),
            disposes: false,
            build: build_array_unshift,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "insert",
            arity: (2, 2),
            disposes: false,
            build: build_array_insert,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "splice",
            arity: (2, 2),
            disposes: false,
            build: build_array_splice,
        },
        Resolver {
            receiver: ReceiverKind::Array,
            method: "indexOf",
            arity: (1, 1),
            disposes: false,
            build: build_array_index_of,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "indexOf",
            arity: (1, 1),
            disposes: false,
            build: build_str_index_of,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "lastIndexOf",
            arity: (1, 1),
            disposes: false,
            build: build_str_last_index_of,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "concat",
            arity: (1, 1),
            disposes: true,
            build: build_str_concat,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "substring",
            arity: (1, 2),
            disposes: true,
            build: build_str_substring,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "charAt",
            arity: (1, 1),
            disposes: true,
            build: build_str_char_at,
        },
        Resolver {
            receiver: ReceiverKind::Str,
            method: "match",
            arity: (1, 1),
            disposes: true,
            build: build_str_match,
        },
        Resolver {
            receiver: ReceiverKind::Dict,
            method: "get",
            arity: (1, 1),
            disposes: false,
            build: build_dict_get,
        },
        Resolver {
            receiver: ReceiverKind::Dict,
            method: "set",
            arity: (2, 2),
            disposes: false,
            build: build_dict_set,
        },
    ]
}

/// Parse-and-bind a builtin template. The sources are compile-time
/// constants, so a parse failure is a defect in this module, not in
/// user input.
fn bind(source: &str, fields: Vec<(&str, FieldValue)>) -> TemplateNode {
    match Template::parse(source) {
        Ok(t) => t.bind(fields),
        Err(err) => {
            debug_assert!(false, "builtin template failed to parse: {err}");
            Template::literal("/* template defect */").bind(Vec::new())
        }
    }
}

/// Require the call to target a growable array; fixed-capacity arrays
/// have no runtime header to operate on.
fn require_dynamic(ctx: &CodegenContext<'_>, site: &CallSite<'_>) -> Result<(), BuildError> {
    if is_dynamic(ctx, site) {
        Ok(())
    } else {
        Err(BuildError::Unsupported(
            "method requires a growable array".to_owned(),
        ))
    }
}

fn is_dynamic(ctx: &CodegenContext<'_>, site: &CallSite<'_>) -> bool {
    ctx.types
        .flags(ctx.expr_type(site.receiver))
        .contains(ember_types::TypeFlags::DYNAMIC)
}

/// The tracked length slot of a fixed-capacity receiver; present
/// exactly when the array shrinks somewhere and the receiver is a
/// named binding.
fn fixed_len_slot(ctx: &CodegenContext<'_>, receiver: ExprId) -> Option<String> {
    ctx.oracle
        .binding_of_expr(receiver)
        .and_then(|binding| ctx.memory.fixed_len_name(binding))
        .map(str::to_owned)
}

fn build_console_log(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::INCLUDE_STDIO)?;
    let spec = ctx.mapper().printf_spec(ctx.expr_type(site.args[0]));
    Ok(bind(
        "{#statements}printf(\"{spec}\\n\", {value});{/statements}",
        vec![("spec", spec.into()), ("value", site.arg_texts[0].as_str().into())],
    ))
}

fn build_array_push(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    require_dynamic(ctx, site)?;
    ctx.deps.declare(keys::ARRAY_MACROS)?;
    Ok(bind(
        "{#statements}ARRAY_PUSH({recv}, {value});{/statements}{recv}.length",
        vec![
            ("recv", site.receiver_text.into()),
            ("value", site.arg_texts[0].as_str().into()),
        ],
    ))
}

fn build_array_pop(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    if is_dynamic(ctx, site) {
        ctx.deps.declare(keys::ARRAY_MACROS)?;
        return match site.dest {
            Some(dest) => Ok(bind(
                "{#statements}ARRAY_POP({recv}, {out});{/statements}{out}",
                vec![("recv", site.receiver_text.into()), ("out", dest.into())],
            )),
            None => {
                // Bare statement: the popped value is provably unused.
                ctx.deps.declare(keys::DISCARD)?;
                Ok(bind(
                    "{#statements}ARRAY_POP({recv}, _discard16);{/statements}",
                    vec![("recv", site.receiver_text.into())],
                ))
            }
        };
    }

    // Fixed storage: decrement the tracked length in place.
    let Some(len) = fixed_len_slot(ctx, site.receiver) else {
        return Err(BuildError::Unsupported(
            "pop needs a named fixed array".to_owned(),
        ));
    };
    ctx.deps.declare(keys::FIXED_ARRAY_MACROS)?;
    match site.dest {
        Some(dest) => Ok(bind(
            "{#statements}FIXED_POP({recv}, {len}, {out});{/statements}{out}",
            vec![
                ("recv", site.receiver_text.into()),
                ("len", len.into()),
                ("out", dest.into()),
            ],
        )),
        None => {
            ctx.deps.declare(keys::DISCARD)?;
            Ok(bind(
                "{#statements}FIXED_POP({recv}, {len}, _discard16);{/statements}",
                vec![("recv", site.receiver_text.into()), ("len", len.into())],
            ))
        }
    }
}

fn build_array_shift(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    if is_dynamic(ctx, site) {
        ctx.deps.declare(keys::ARRAY_MACROS)?;
        return match site.dest {
            Some(dest) => Ok(bind(
                "{#statements}ARRAY_REMOVE({recv}, 0, {out});{/statements}{out}",
                vec![("recv", site.receiver_text.into()), ("out", dest.into())],
            )),
            None => {
                ctx.deps.declare(keys::DISCARD)?;
                Ok(bind(
                    "{#statements}ARRAY_REMOVE({recv}, 0, _discard16);{/statements}",
                    vec![("recv", site.receiver_text.into())],
                ))
            }
        };
    }

    let Some(len) = fixed_len_slot(ctx, site.receiver) else {
        return Err(BuildError::Unsupported(
            "shift needs a named fixed array".to_owned(),
        ));
    };
    ctx.deps.declare(keys::FIXED_ARRAY_MACROS)?;
    match site.dest {
        Some(dest) => Ok(bind(
            "{#statements}FIXED_SHIFT({recv}, {len}, {out});{/statements}{out}",
            vec![
                ("recv", site.receiver_text.into()),
                ("len", len.into()),
                ("out", dest.into()),
            ],
        )),
        None => {
            ctx.deps.declare(keys::DISCARD)?;
            Ok(bind(
                "{#statements}FIXED_SHIFT({recv}, {len}, _discard16);{/statements}",
                vec![("recv", site.receiver_text.into()), ("len", len.into())],
            ))
        }
    }
}

fn build_array_unshift(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    require_dynamic(ctx, site)?;
    ctx.deps.declare(keys::ARRAY_MACROS)?;
    Ok(bind(
        "{#statements}ARRAY_INSERT({recv}, 0, {value});{/statements}{recv}.length",
        vec![
            ("recv", site.receiver_text.into()),
            ("value", site.arg_texts[0].as_str().into()),
        ],
    ))
}

fn build_array_insert(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    require_dynamic(ctx, site)?;
    ctx.deps.declare(keys::ARRAY_MACROS)?;
    Ok(bind(
        "{#statements}ARRAY_INSERT({recv}, {index}, {value});{/statements}",
        vec![
            ("recv", site.receiver_text.into()),
            ("index", site.arg_texts[0].as_str().into()),
            ("value", site.arg_texts[1].as_str().into()),
        ],
    ))
}

fn build_array_splice(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    require_dynamic(ctx, site)?;
    let TypeData::Array { elem, .. } = ctx.types.lookup(ctx.expr_type(site.receiver)) else {
        return Err(BuildError::Unsupported("splice on non-array".to_owned()));
    };
    if elem != TypeId::NUMBER && elem != TypeId::BOOL {
        return Err(BuildError::Unsupported(
            "splice supports scalar element arrays".to_owned(),
        ));
    }
    ctx.deps.declare(keys::ARRAY_MACROS)?;
    ctx.deps.declare(keys::DISCARD)?;
    ctx.deps.declare(keys::ITER)?;
    Ok(bind(
        "{#statements}for (_iter16 = 0; _iter16 < {count}; _iter16++) \
ARRAY_REMOVE({recv}, {start}, _discard16);{/statements}",
        vec![
            ("recv", site.receiver_text.into()),
            ("start", site.arg_texts[0].as_str().into()),
            ("count", site.arg_texts[1].as_str().into()),
        ],
    ))
}

fn build_array_index_of(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    if is_dynamic(ctx, site) {
        ctx.deps.declare(keys::ARRAY_INDEX_OF)?;
        return match site.dest {
            Some(dest) => Ok(bind(
                "{#statements}ARRAY_INDEX_OF({recv}, {value}, {out});{/statements}{out}",
                vec![
                    ("recv", site.receiver_text.into()),
                    ("value", site.arg_texts[0].as_str().into()),
                    ("out", dest.into()),
                ],
            )),
            None => {
                ctx.deps.declare(keys::DISCARD)?;
                Ok(bind(
                    "{#statements}ARRAY_INDEX_OF({recv}, {value}, _discard16);{/statements}",
                    vec![
                        ("recv", site.receiver_text.into()),
                        ("value", site.arg_texts[0].as_str().into()),
                    ],
                ))
            }
        };
    }

    // Fixed storage: scan up to the live length, or the full capacity
    // when the array never shrinks.
    let len = match fixed_len_slot(ctx, site.receiver) {
        Some(slot) => slot,
        None => match ctx.types.lookup(ctx.expr_type(site.receiver)) {
            TypeData::Array {
                capacity: Capacity::Fixed(n),
                ..
            } => n.to_string(),
            _ => {
                return Err(BuildError::Unsupported(
                    "indexOf on non-array".to_owned(),
                ))
            }
        },
    };
    ctx.deps.declare(keys::FIXED_ARRAY_MACROS)?;
    match site.dest {
        Some(dest) => Ok(bind(
            "{#statements}FIXED_INDEX_OF({recv}, {len}, {value}, {out});{/statements}{out}",
            vec![
                ("recv", site.receiver_text.into()),
                ("len", len.into()),
                ("value", site.arg_texts[0].as_str().into()),
                ("out", dest.into()),
            ],
        )),
        None => {
            ctx.deps.declare(keys::DISCARD)?;
            Ok(bind(
                "{#statements}FIXED_INDEX_OF({recv}, {len}, {value}, _discard16);{/statements}",
                vec![
                    ("recv", site.receiver_text.into()),
                    ("len", len.into()),
                    ("value", site.arg_texts[0].as_str().into()),
                ],
            ))
        }
    }
}

fn build_str_index_of(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::STR_POS)?;
    Ok(bind(
        "str_pos({recv}, {needle})",
        vec![
            ("recv", site.receiver_text.into()),
            ("needle", site.arg_texts[0].as_str().into()),
        ],
    ))
}

fn build_str_last_index_of(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::STR_RPOS)?;
    Ok(bind(
        "str_rpos({recv}, {needle})",
        vec![
            ("recv", site.receiver_text.into()),
            ("needle", site.arg_texts[0].as_str().into()),
        ],
    ))
}

/// Wrap a heap-producing call expression: assign into the destination
/// when one is reserved, otherwise yield the bare call for adoption.
fn heap_result(call: TemplateNode, dest: Option<&str>) -> TemplateNode {
    match dest {
        Some(dest) => bind(
            "{#statements}{out} = {call};{/statements}{out}",
            vec![("out", dest.into()), ("call", call.into())],
        ),
        None => call,
    }
}

fn build_str_concat(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::STR_CAT)?;
    let call = bind(
        "str_cat({recv}, {other})",
        vec![
            ("recv", site.receiver_text.into()),
            ("other", site.arg_texts[0].as_str().into()),
        ],
    );
    Ok(heap_result(call, site.dest))
}

fn build_str_substring(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::STR_SLICE)?;
    let end = if site.arg_texts.len() == 2 {
        site.arg_texts[1].clone()
    } else {
        ctx.deps.declare(keys::STR_LEN)?;
        format!("str_len({})", site.receiver_text)
    };
    let call = bind(
        "str_slice({recv}, {start}, {end})",
        vec![
            ("recv", site.receiver_text.into()),
            ("start", site.arg_texts[0].as_str().into()),
            ("end", end.into()),
        ],
    );
    Ok(heap_result(call, site.dest))
}

fn build_str_char_at(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::STR_SLICE)?;
    let call = bind(
        "str_slice({recv}, {at}, (int16_t)({at} + 1))",
        vec![
            ("recv", site.receiver_text.into()),
            ("at", site.arg_texts[0].as_str().into()),
        ],
    );
    Ok(heap_result(call, site.dest))
}

fn build_str_match(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::REGEX)?;
    // Reset once at program start; each call hands its previous buffer
    // to the previous owner.
    ctx.entries.push_unique("regex_clear_matches();");
    match site.dest {
        Some(dest) => Ok(bind(
            "{#statements}regex_match({recv}, {pattern});\n\
{out} = regex_matches;{/statements}{out}",
            vec![
                ("recv", site.receiver_text.into()),
                ("pattern", site.arg_texts[0].as_str().into()),
                ("out", dest.into()),
            ],
        )),
        None => Ok(bind(
            "{#statements}regex_match({recv}, {pattern});{/statements}regex_matches",
            vec![
                ("recv", site.receiver_text.into()),
                ("pattern", site.arg_texts[0].as_str().into()),
            ],
        )),
    }
}

fn build_dict_get(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::DICT)?;
    match site.dest {
        Some(dest) => Ok(bind(
            "{#statements}DICT_GET({recv}, {key}, {out});{/statements}{out}",
            vec![
                ("recv", site.receiver_text.into()),
                ("key", site.arg_texts[0].as_str().into()),
                ("out", dest.into()),
            ],
        )),
        None => {
            ctx.deps.declare(keys::DISCARD)?;
            Ok(bind(
                "{#statements}DICT_GET({recv}, {key}, _discard16);{/statements}",
                vec![
                    ("recv", site.receiver_text.into()),
                    ("key", site.arg_texts[0].as_str().into()),
                ],
            ))
        }
    }
}

fn build_dict_set(
    ctx: &mut CodegenContext<'_>,
    site: &CallSite<'_>,
) -> Result<TemplateNode, BuildError> {
    ctx.deps.declare(keys::DICT)?;
    let setter = if ctx.expr_type(site.args[1]) == TypeId::STR {
        "DICT_SET_STR_STR"
    } else {
        "DICT_SET_STR_INT"
    };
    Ok(bind(
        "{#statements}{setter}({recv}, {key}, {value});{/statements}",
        vec![
            ("setter", setter.into()),
            ("recv", site.receiver_text.into()),
            ("key", site.arg_texts[0].as_str().into()),
            ("value", site.arg_texts[1].as_str().into()),
        ],
    ))
}
