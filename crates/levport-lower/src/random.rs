//! Mapping of `math.random` onto the engine's random primitives.
//!
//! The engine exposes `rn2(n)` (uniform in `[0, n)`), `rnd(n)` (uniform in
//! `[1, n]`) and `d(n, s)` (sum of `n` dice with `s` sides). Every source
//! call site maps to exactly one primitive call so the draw sequence is
//! unchanged.

use crate::ir::{BinaryOp, Expr, UnaryOp};
use crate::symbols::Helper;
use levport_syntax::{Expression, ExpressionKind, Field};

/// Shape of a `math.random(...)` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RandomCall<'a> {
    /// `math.random(n)`
    Upper(&'a Expression),
    /// `math.random(lo, hi)`
    Range {
        lo: &'a Expression,
        hi: &'a Expression,
    },
    /// `math.random("NdS")`
    Dice { count: u32, sides: u32 },
}

pub fn classify(args: &[Expression]) -> Result<RandomCall<'_>, String> {
    match args {
        [] => Err("`math.random()` without arguments draws a float; no engine primitive matches".into()),
        [only] => match &only.kind {
            ExpressionKind::String(spec) => parse_dice(spec)
                .map(|(count, sides)| RandomCall::Dice { count, sides })
                .ok_or_else(|| format!("`math.random(\"{spec}\")` is not a dice expression like \"2d6\"")),
            ExpressionKind::Vararg => Err("`math.random(...)` has an unknown number of bounds".into()),
            _ => Ok(RandomCall::Upper(only)),
        },
        [lo, hi] => {
            if matches!(hi.kind, ExpressionKind::Vararg) {
                return Err("`math.random` bound cannot be `...`".into());
            }
            if lo.contains_call() {
                return Err(
                    "`math.random` lower bound contains a call and would be evaluated twice".into(),
                );
            }
            Ok(RandomCall::Range { lo, hi })
        }
        _ => Err(format!(
            "`math.random` takes at most two arguments, found {}",
            args.len()
        )),
    }
}

/// Parse `"NdS"` into `(N, S)`.
pub fn parse_dice(spec: &str) -> Option<(u32, u32)> {
    let (count, sides) = spec.trim().split_once(['d', 'D'])?;
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(count) || !is_digits(sides) {
        return None;
    }
    let count = count.parse().ok()?;
    let sides = sides.parse().ok()?;
    (count > 0 && sides > 0).then_some((count, sides))
}

/// `rn2(hi - lo + 1) + lo`, folded as far as the literal bounds allow.
pub fn range_expr(lo: Expr, hi: Expr) -> Result<Expr, String> {
    let count = match (lo.as_number(), hi.as_number()) {
        (Some(lo), Some(hi)) => {
            if hi < lo {
                return Err(format!("`math.random({lo}, {hi})` has an empty range"));
            }
            Expr::number(hi - lo + 1.0)
        }
        (Some(lo), None) => offset(hi, 1.0 - lo),
        _ => Expr::binary(
            Expr::binary(hi, BinaryOp::Sub, lo.clone()),
            BinaryOp::Add,
            Expr::number(1),
        ),
    };

    let draw = Expr::call(Expr::ident(Helper::Rn2.name()), vec![count]);
    Ok(match lo.as_number() {
        Some(n) if n == 0.0 => draw,
        Some(n) => offset(draw, n),
        None => Expr::binary(draw, BinaryOp::Add, lo),
    })
}

/// `expr + n`, written as `expr - |n|` for negative `n` and dropped for 0.
fn offset(expr: Expr, n: f64) -> Expr {
    if n == 0.0 {
        expr
    } else if n < 0.0 {
        Expr::binary(expr, BinaryOp::Sub, Expr::number(-n))
    } else {
        Expr::binary(expr, BinaryOp::Add, Expr::number(n))
    }
}

/// `rnd(n)`
pub fn upper_expr(n: Expr) -> Expr {
    Expr::call(Expr::ident(Helper::Rnd.name()), vec![n])
}

/// `d(count, sides)`
pub fn dice_expr(count: u32, sides: u32) -> Expr {
    Expr::call(
        Expr::ident(Helper::D.name()),
        vec![Expr::number(count), Expr::number(sides)],
    )
}

/// True when the expression is a numeric literal, possibly negated.
pub fn is_numeric_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) => true,
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => is_numeric_literal(expr),
        _ => false,
    }
}

/// Whether evaluating `expr` draws a random number.
///
/// `is_local` reports names declared in the file, which shadow
/// `math` and the random helpers.
pub fn draws_random(expr: &Expression, is_local: &dyn Fn(&str) -> bool) -> bool {
    let recurse = |e: &Expression| draws_random(e, is_local);
    match &expr.kind {
        ExpressionKind::Call { callee, args } => {
            let direct = match callee.dotted_path().as_deref() {
                Some("math.random") => !is_local("math"),
                Some(name) => Helper::from_name(name)
                    .is_some_and(|helper| helper.draws_random() && !is_local(name)),
                None => false,
            };
            direct || recurse(callee) || args.iter().any(recurse)
        }
        ExpressionKind::MethodCall { receiver, args, .. } => {
            recurse(receiver) || args.iter().any(recurse)
        }
        ExpressionKind::Index { base, key } => recurse(base) || recurse(key),
        ExpressionKind::Binary { left, right, .. } => recurse(left) || recurse(right),
        ExpressionKind::Unary { operand, .. } => recurse(operand),
        ExpressionKind::Paren(inner) => recurse(inner),
        ExpressionKind::TableCtor(fields) => fields.iter().any(|field| match field {
            Field::Positional(value) | Field::Named(_, value) => recurse(value),
            Field::Computed(key, value) => recurse(key) || recurse(value),
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

#[cfg(test)]
mod tests {
    use super::*;
    use levport_syntax::{StatementKind, parse_source};

    fn expr(src: &str) -> Expression {
        let chunk = parse_source(&format!("x = {src}")).unwrap();
        match chunk.statements.into_iter().next().unwrap().kind {
            StatementKind::Assign { mut values, .. } => values.remove(0),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    fn rn2(arg: Expr) -> Expr {
        Expr::call(Expr::ident("rn2"), vec![arg])
    }

    #[test]
    fn test_parse_dice() {
        assert_eq!(parse_dice("2d6"), Some((2, 6)));
        assert_eq!(parse_dice("1D20"), Some((1, 20)));
        assert_eq!(parse_dice("d6"), None);
        assert_eq!(parse_dice("2d"), None);
        assert_eq!(parse_dice("0d6"), None);
        assert_eq!(parse_dice("two d six"), None);
    }

    #[test]
    fn test_range_folds_literals() {
        assert_eq!(
            range_expr(Expr::number(1), Expr::number(6)).unwrap(),
            Expr::binary(rn2(Expr::number(6)), BinaryOp::Add, Expr::number(1))
        );
        assert_eq!(
            range_expr(Expr::number(0), Expr::number(3)).unwrap(),
            rn2(Expr::number(4))
        );
        assert_eq!(
            range_expr(Expr::number(-2), Expr::number(2)).unwrap(),
            Expr::binary(rn2(Expr::number(5)), BinaryOp::Sub, Expr::number(2))
        );
    }

    #[test]
    fn test_range_with_dynamic_upper_bound() {
        // math.random(1, n) -> rn2(n) + 1
        assert_eq!(
            range_expr(Expr::number(1), Expr::ident("n")).unwrap(),
            Expr::binary(rn2(Expr::ident("n")), BinaryOp::Add, Expr::number(1))
        );
        // math.random(3, n) -> rn2(n - 2) + 3
        assert_eq!(
            range_expr(Expr::number(3), Expr::ident("n")).unwrap(),
            Expr::binary(
                rn2(Expr::binary(Expr::ident("n"), BinaryOp::Sub, Expr::number(2))),
                BinaryOp::Add,
                Expr::number(3)
            )
        );
    }

    #[test]
    fn test_range_with_dynamic_lower_bound() {
        assert_eq!(
            range_expr(Expr::ident("lo"), Expr::ident("hi")).unwrap(),
            Expr::binary(
                rn2(Expr::binary(
                    Expr::binary(Expr::ident("hi"), BinaryOp::Sub, Expr::ident("lo")),
                    BinaryOp::Add,
                    Expr::number(1)
                )),
                BinaryOp::Add,
                Expr::ident("lo")
            )
        );
    }

    #[test]
    fn test_empty_range_is_rejected() {
        assert!(range_expr(Expr::number(5), Expr::number(2)).is_err());
    }

    #[test]
    fn test_classify() {
        let args = [expr("f()"), expr("10")];
        assert!(classify(&args).unwrap_err().contains("evaluated twice"));
        assert!(classify(&[]).is_err());
        assert!(matches!(
            classify(&[expr("\"3d4\"")]),
            Ok(RandomCall::Dice { count: 3, sides: 4 })
        ));
        assert!(classify(&[expr("\"many\"")]).is_err());
        assert!(matches!(
            classify(&[expr("n")]),
            Ok(RandomCall::Upper(_))
        ));
        assert!(classify(&[expr("1"), expr("2"), expr("3")]).is_err());
    }

    #[test]
    fn test_draws_random() {
        let none = |_: &str| false;
        assert!(draws_random(&expr("math.random(3)"), &none));
        assert!(draws_random(&expr("1 + rnd(3)"), &none));
        assert!(draws_random(&expr("f(percent(50))"), &none));
        assert!(!draws_random(&expr("#t + 1"), &none));
        assert!(!draws_random(&expr("function() return rn2(3) end"), &none));

        let rn2_is_local = |name: &str| name == "rn2";
        assert!(!draws_random(&expr("rn2(3)"), &rn2_is_local));
    }
}
