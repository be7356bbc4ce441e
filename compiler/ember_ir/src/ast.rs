//! Node kinds of the constrained script subset.
//!
//! The subset is deliberately small: numbers, booleans, strings, arrays,
//! string-keyed dicts, first-order functions, structured control flow.
//! No closures escaping their scope, no classes, no re-typing of a
//! binding. Whatever the front end cannot express in these nodes never
//! reaches the backend.

use crate::{BlockId, ExprId, ExprRange, Name, Span};

/// Binary operators of the subset.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// The C spelling of this operator.
    pub fn c_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// True for operators whose result is a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or
        )
    }
}

/// Unary operators of the subset.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn c_symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// An expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression kinds.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Numeric literal. The subset's numbers are 16-bit integers.
    Number(i32),
    Bool(bool),
    /// String literal, interned.
    Str(Name),
    /// Reference to a binding or parameter.
    Ident(Name),
    /// Array literal `[a, b, c]`.
    Array(ExprRange),
    /// Dict literal `{ "k": v }` with string-literal keys.
    Dict(ExprRange),
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    /// Direct call of a user function: `f(a, b)`.
    Call {
        callee: Name,
        args: ExprRange,
    },
    /// Method-style call: `recv.method(args)`. All standard-library
    /// operations (array/string/dict/console) arrive in this shape.
    Method {
        receiver: ExprId,
        method: Name,
        args: ExprRange,
    },
    /// Property access without a call: `a.length`.
    Member {
        receiver: ExprId,
        property: Name,
    },
    /// Subscript: `a[i]` or `d["k"]`.
    Index {
        receiver: ExprId,
        index: ExprId,
    },
    Assign {
        target: ExprId,
        value: ExprId,
    },
    /// Placeholder inserted where inference failed; emitted as a comment.
    Error,
}

/// A statement node.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement kinds.
#[derive(Clone, Debug)]
pub enum StmtKind {
    /// `let name = init;` — the binding's one CType comes from `init`.
    Let { name: Name, init: ExprId },
    Expr(ExprId),
    If {
        cond: ExprId,
        then_block: BlockId,
        else_block: Option<BlockId>,
    },
    While {
        cond: ExprId,
        body: BlockId,
    },
    Return(Option<ExprId>),
}

/// A lexical block: an ordered run of statements.
#[derive(Copy, Clone, Debug)]
pub struct Block {
    pub stmts: crate::StmtRange,
}

/// A function parameter.
#[derive(Copy, Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub span: Span,
}

/// A user-defined function.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Name,
    pub params: Vec<Param>,
    pub body: BlockId,
    pub span: Span,
}

/// One compilation unit as delivered by the front end.
///
/// Top-level statements become the body of the emitted `main()`.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub top_level: Option<BlockId>,
}
