//! Syntax tree for Lua level descriptions.
//!
//! The tree is a plain owned structure: every node owns its children and
//! records the line it started on. Lowering reads it and never mutates it.

pub type Block = Vec<Statement>;

/// A whole source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    pub statements: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `local a, b = x, y`
    LocalDecl {
        names: Vec<String>,
        initializers: Vec<Expression>,
    },
    /// `a, t[i] = x, y`
    Assign {
        targets: Vec<Expression>,
        values: Vec<Expression>,
    },
    If {
        branches: Vec<(Expression, Block)>,
        else_block: Option<Block>,
    },
    NumericFor {
        var: String,
        start: Expression,
        stop: Expression,
        step: Option<Expression>,
        body: Block,
    },
    GenericFor {
        vars: Vec<String>,
        iterables: Vec<Expression>,
        body: Block,
    },
    While {
        cond: Expression,
        body: Block,
    },
    RepeatUntil {
        body: Block,
        cond: Expression,
    },
    Return {
        values: Vec<Expression>,
    },
    /// `function a.b:c() end` or `local function f() end`.
    FunctionDecl {
        name: FunctionName,
        is_local: bool,
        func: FunctionBody,
    },
    /// A call used as a statement.
    ExprStatement {
        call: Expression,
    },
    Break,
    Do {
        body: Block,
    },
}

/// Name of a declared function: `a.b.c` with an optional `:method` tail.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionName {
    pub path: Vec<String>,
    pub method: Option<String>,
}

impl FunctionName {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
            method: None,
        }
    }

    /// The first path segment.
    pub fn root(&self) -> &str {
        &self.path[0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Nil,
    Bool(bool),
    Number(f64),
    /// Quoted string, escapes decoded.
    String(String),
    /// Long-bracket string, raw content.
    LongString(String),
    Vararg,
    Identifier(String),
    /// `base[key]`; `base.name` is an index with a string key.
    Index {
        base: Box<Expression>,
        key: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    MethodCall {
        receiver: Box<Expression>,
        method: String,
        args: Vec<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    TableCtor(Vec<Field>),
    FunctionExpr(FunctionBody),
    /// `(expr)`, which truncates a multi-value expression to one value.
    Paren(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// `{ x }`
    Positional(Expression),
    /// `{ name = x }`
    Named(String, Expression),
    /// `{ [key] = x }`
    Computed(Expression, Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Left and right binding power, as in the reference Lua parser.
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 1),
            BinaryOp::And => (2, 2),
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Ne
            | BinaryOp::Eq => (3, 3),
            BinaryOp::Concat => (9, 8),
            BinaryOp::Add | BinaryOp::Sub => (10, 10),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::IDiv | BinaryOp::Mod => (11, 11),
            BinaryOp::Pow => (14, 13),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Len,
}

impl UnaryOp {
    pub const PRIORITY: u8 = 12;
}

impl Expression {
    pub fn new(kind: ExpressionKind, line: usize) -> Self {
        Self { kind, line }
    }

    pub fn ident(name: impl Into<String>, line: usize) -> Self {
        Self::new(ExpressionKind::Identifier(name.into()), line)
    }

    pub fn is_call(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Call { .. } | ExpressionKind::MethodCall { .. }
        )
    }

    /// The identifier name, if this is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Dotted path for `a.b.c` chains of string-keyed indexes.
    pub fn dotted_path(&self) -> Option<String> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name.clone()),
            ExpressionKind::Index { base, key } => match &key.kind {
                ExpressionKind::String(field) => {
                    let base = base.dotted_path()?;
                    Some(format!("{base}.{field}"))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// True when evaluating the expression may call a function.
    pub fn contains_call(&self) -> bool {
        match &self.kind {
            ExpressionKind::Call { .. } | ExpressionKind::MethodCall { .. } => true,
            ExpressionKind::Index { base, key } => base.contains_call() || key.contains_call(),
            ExpressionKind::Binary { left, right, .. } => {
                left.contains_call() || right.contains_call()
            }
            ExpressionKind::Unary { operand, .. } => operand.contains_call(),
            ExpressionKind::Paren(inner) => inner.contains_call(),
            ExpressionKind::TableCtor(fields) => fields.iter().any(|field| match field {
                Field::Positional(value) | Field::Named(_, value) => value.contains_call(),
                Field::Computed(key, value) => key.contains_call() || value.contains_call(),
            }),
            ExpressionKind::Nil
            | ExpressionKind::Bool(_)
            | ExpressionKind::Number(_)
            | ExpressionKind::String(_)
            | ExpressionKind::LongString(_)
            | ExpressionKind::Vararg
            | ExpressionKind::Identifier(_)
            | ExpressionKind::FunctionExpr(_) => false,
        }
    }
}

impl Statement {
    pub fn new(kind: StatementKind, line: usize) -> Self {
        Self { kind, line }
    }
}
