//! Structural equality for syntax trees.
//!
//! `structure_eq` compares trees ignoring source positions and redundant
//! parentheses. Lowering uses it to recognize idioms such as
//! `t[math.random(#t)]`, where the `#` operand has to be the indexed table.
//!
//! # Ignored
//!
//! - `line` on every node
//! - `Paren` around an expression that is not a call or vararg (only those
//!   can yield more than one value)
//!
//! # Core Fields (must match exactly)
//!
//! - All names, values, operators
//! - Control flow structure
//! - Expression trees

use crate::ast::*;

/// Trait for structural equality comparison.
///
/// Unlike `PartialEq`, this ignores position information that differs
/// between two occurrences of the same code.
pub trait StructureEq {
    fn structure_eq(&self, other: &Self) -> bool;
}

impl StructureEq for Statement {
    fn structure_eq(&self, other: &Self) -> bool {
        use StatementKind as S;
        match (&self.kind, &other.kind) {
            (
                S::LocalDecl {
                    names: n1,
                    initializers: i1,
                },
                S::LocalDecl {
                    names: n2,
                    initializers: i2,
                },
            ) => n1 == n2 && vec_structure_eq(i1, i2),

            (
                S::Assign {
                    targets: t1,
                    values: v1,
                },
                S::Assign {
                    targets: t2,
                    values: v2,
                },
            ) => vec_structure_eq(t1, t2) && vec_structure_eq(v1, v2),

            (
                S::If {
                    branches: b1,
                    else_block: e1,
                },
                S::If {
                    branches: b2,
                    else_block: e2,
                },
            ) => {
                b1.len() == b2.len()
                    && b1
                        .iter()
                        .zip(b2)
                        .all(|((c1, x1), (c2, x2))| c1.structure_eq(c2) && vec_structure_eq(x1, x2))
                    && match (e1, e2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => vec_structure_eq(a, b),
                        _ => false,
                    }
            }

            (
                S::NumericFor {
                    var: v1,
                    start: a1,
                    stop: z1,
                    step: s1,
                    body: b1,
                },
                S::NumericFor {
                    var: v2,
                    start: a2,
                    stop: z2,
                    step: s2,
                    body: b2,
                },
            ) => {
                v1 == v2
                    && a1.structure_eq(a2)
                    && z1.structure_eq(z2)
                    && option_structure_eq(s1.as_ref(), s2.as_ref())
                    && vec_structure_eq(b1, b2)
            }

            (
                S::GenericFor {
                    vars: v1,
                    iterables: i1,
                    body: b1,
                },
                S::GenericFor {
                    vars: v2,
                    iterables: i2,
                    body: b2,
                },
            ) => v1 == v2 && vec_structure_eq(i1, i2) && vec_structure_eq(b1, b2),

            (S::While { cond: c1, body: b1 }, S::While { cond: c2, body: b2 })
            | (S::RepeatUntil { body: b1, cond: c1 }, S::RepeatUntil { body: b2, cond: c2 }) => {
                c1.structure_eq(c2) && vec_structure_eq(b1, b2)
            }

            (S::Return { values: a }, S::Return { values: b }) => vec_structure_eq(a, b),

            (
                S::FunctionDecl {
                    name: n1,
                    is_local: l1,
                    func: f1,
                },
                S::FunctionDecl {
                    name: n2,
                    is_local: l2,
                    func: f2,
                },
            ) => n1 == n2 && l1 == l2 && f1.structure_eq(f2),

            (S::ExprStatement { call: a }, S::ExprStatement { call: b }) => a.structure_eq(b),
            (S::Break, S::Break) => true,
            (S::Do { body: a }, S::Do { body: b }) => vec_structure_eq(a, b),

            _ => false,
        }
    }
}

impl StructureEq for Expression {
    fn structure_eq(&self, other: &Self) -> bool {
        use ExpressionKind as E;
        match (&strip_paren(self).kind, &strip_paren(other).kind) {
            (E::Nil, E::Nil) | (E::Vararg, E::Vararg) => true,
            (E::Bool(a), E::Bool(b)) => a == b,
            (E::Number(a), E::Number(b)) => a == b,
            (E::String(a), E::String(b))
            | (E::LongString(a), E::LongString(b))
            | (E::Identifier(a), E::Identifier(b)) => a == b,

            (E::Index { base: b1, key: k1 }, E::Index { base: b2, key: k2 }) => {
                b1.structure_eq(b2) && k1.structure_eq(k2)
            }

            (
                E::Call {
                    callee: c1,
                    args: a1,
                },
                E::Call {
                    callee: c2,
                    args: a2,
                },
            ) => c1.structure_eq(c2) && vec_structure_eq(a1, a2),

            (
                E::MethodCall {
                    receiver: r1,
                    method: m1,
                    args: a1,
                },
                E::MethodCall {
                    receiver: r2,
                    method: m2,
                    args: a2,
                },
            ) => m1 == m2 && r1.structure_eq(r2) && vec_structure_eq(a1, a2),

            (
                E::Binary {
                    op: o1,
                    left: l1,
                    right: r1,
                },
                E::Binary {
                    op: o2,
                    left: l2,
                    right: r2,
                },
            ) => o1 == o2 && l1.structure_eq(l2) && r1.structure_eq(r2),

            (
                E::Unary {
                    op: o1,
                    operand: e1,
                },
                E::Unary {
                    op: o2,
                    operand: e2,
                },
            ) => o1 == o2 && e1.structure_eq(e2),

            (E::TableCtor(a), E::TableCtor(b)) => vec_structure_eq(a, b),
            (E::FunctionExpr(a), E::FunctionExpr(b)) => a.structure_eq(b),

            // Parens that survive `strip_paren` truncate multiple values.
            (E::Paren(a), E::Paren(b)) => a.structure_eq(b),

            _ => false,
        }
    }
}

impl StructureEq for Field {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Positional(a), Field::Positional(b)) => a.structure_eq(b),
            (Field::Named(n1, v1), Field::Named(n2, v2)) => n1 == n2 && v1.structure_eq(v2),
            (Field::Computed(k1, v1), Field::Computed(k2, v2)) => {
                k1.structure_eq(k2) && v1.structure_eq(v2)
            }
            _ => false,
        }
    }
}

impl StructureEq for FunctionBody {
    fn structure_eq(&self, other: &Self) -> bool {
        self.params == other.params
            && self.is_vararg == other.is_vararg
            && vec_structure_eq(&self.body, &other.body)
    }
}

fn strip_paren(expr: &Expression) -> &Expression {
    match &expr.kind {
        ExpressionKind::Paren(inner)
            if !inner.is_call() && !matches!(inner.kind, ExpressionKind::Vararg) =>
        {
            strip_paren(inner)
        }
        _ => expr,
    }
}

// Helper functions

fn vec_structure_eq<T: StructureEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structure_eq(y))
}

fn option_structure_eq<T: StructureEq>(a: Option<&T>, b: Option<&T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.structure_eq(y),
        _ => false,
    }
}
