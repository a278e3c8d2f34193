//! JavaScript-shaped IR produced by lowering.
//!
//! Every Lua-specific decision (index base, random primitives, nil
//! comparisons) has already been made by the time a tree lands here; the
//! writer only has to print it.

/// A generated ES module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// File name of the Lua source, recorded in the header comment.
    pub source_name: String,
    pub imports: Vec<Import>,
    /// Name of the exported entry function.
    pub entry: String,
    /// Lua globals, declared once at the top of the entry function.
    pub globals: Vec<String>,
    pub body: Vec<Stmt>,
}

/// `import { a, b } from "from";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub names: Vec<String>,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let a = init;`, `let [a, b] = init;` or `let a, b;`
    Let { binding: Binding, init: Option<Expr> },
    /// `target = value;`
    Assign { target: Expr, value: Expr },
    Expr(Expr),
    If {
        test: Expr,
        consequent: Vec<Stmt>,
        alternate: Option<Vec<Stmt>>,
    },
    /// `for (let a = x, b = y; test; update) { body }`
    For {
        init: Vec<(String, Expr)>,
        test: Expr,
        update: Expr,
        body: Vec<Stmt>,
    },
    /// `for (let binding of iterable) { body }`
    ForOf {
        binding: Binding,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Block(Vec<Stmt>),
    Function(Function),
}

/// Target of a `let` or the left-hand side of a `for ... of` loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Name(String),
    /// `a, b` with no initializer.
    Names(Vec<String>),
    /// Array pattern; `None` is an elided slot.
    Array(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Raw long-string content, printed as a template literal.
    Template(String),
    Ident(String),
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `name++`, `name--`, `name += value`, `name -= value`
    Update {
        name: String,
        op: UpdateOp,
    },
    Array(Vec<Expr>),
    Object(Vec<(ObjectKey, Expr)>),
    Function(Box<Function>),
    /// `...expr`
    Spread(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    Name(String),
    /// `[expr]: value`
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Increment,
    Decrement,
    AddAssign(Box<Expr>),
    SubAssign(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    StrictEq,
    StrictNe,
    /// `==`, only emitted for comparisons against `null`.
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A function declaration or expression. An empty `name` is anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Name of the `...rest` parameter, if any.
    pub rest: Option<String>,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn anonymous(params: Vec<String>, rest: Option<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: String::new(),
            params,
            rest,
            body,
        }
    }
}

impl Expr {
    pub fn number(value: impl Into<f64>) -> Self {
        Expr::Number(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::String(value.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// `object.method(args)`
    pub fn method(object: Expr, method: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(object, method), args)
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    /// The number, if this is a numeric literal (negated literals included).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => expr.as_number().map(|n| -n),
            _ => None,
        }
    }
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn let_decl(name: impl Into<String>, init: Option<Expr>) -> Self {
        Stmt::Let {
            binding: Binding::Name(name.into()),
            init,
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Assign { target, value }
    }

    pub fn return_stmt(expr: Option<Expr>) -> Self {
        Stmt::Return(expr)
    }
}
