//! Tree-walking evaluation of parsed expressions.
//!
//! Semantics follow the usual dynamic-language conventions contract authors
//! expect: `and`/`or` return an operand rather than a bool, `/` is true
//! division, `//` and `%` round towards negative infinity, and integer
//! arithmetic is checked instead of wrapping.

use std::cmp::Ordering;

use super::error::ExprError;
use super::parser::{BinOp, CmpOp, Expr, UnaryOp};
use super::scope::Env;
use super::value::{TypeSet, TypeTag, Value};

/// Evaluate `expr` under `env`.
pub fn evaluate(expr: &Expr, env: &Env<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => resolve_name(name, env),
        Expr::Attr(target, attr) => {
            let value = evaluate(target, env)?;
            value
                .attr(attr)
                .cloned()
                .ok_or_else(|| ExprError::NoAttribute {
                    type_name: value.type_tag().to_string(),
                    attr: attr.clone(),
                })
        }
        Expr::Index(target, index) => {
            let value = evaluate(target, env)?;
            let index = evaluate(index, env)?;
            subscript(&value, &index)
        }
        Expr::Call(func, args) => {
            let args = evaluate_all(args, env)?;
            call_builtin(func, args)
        }
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, env)?),
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            let rhs = evaluate(rhs, env)?;
            binary(*op, &lhs, &rhs)
        }
        Expr::Compare(first, rest) => {
            let mut lhs = evaluate(first, env)?;
            for (op, operand) in rest {
                let rhs = evaluate(operand, env)?;
                if !compare(*op, &lhs, &rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            if lhs.is_truthy() {
                evaluate(rhs, env)
            } else {
                Ok(lhs)
            }
        }
        Expr::Or(lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(rhs, env)
            }
        }
        Expr::Cond {
            then,
            cond,
            otherwise,
        } => {
            if evaluate(cond, env)?.is_truthy() {
                evaluate(then, env)
            } else {
                evaluate(otherwise, env)
            }
        }
        Expr::Tuple(items) => Ok(Value::Tuple(evaluate_all(items, env)?)),
        Expr::List(items) => Ok(Value::List(evaluate_all(items, env)?)),
    }
}

fn evaluate_all(items: &[Expr], env: &Env<'_>) -> Result<Vec<Value>, ExprError> {
    items.iter().map(|item| evaluate(item, env)).collect()
}

fn resolve_name(name: &str, env: &Env<'_>) -> Result<Value, ExprError> {
    if let Some(value) = env.lookup(name) {
        return Ok(value.clone());
    }
    TypeTag::builtin(name)
        .map(Value::Type)
        .ok_or_else(|| ExprError::UnknownName(name.to_string()))
}

fn type_label(value: &Value) -> String {
    value.type_tag().to_string()
}

fn unsupported(op: &'static str, lhs: &Value, rhs: &Value) -> ExprError {
    ExprError::UnsupportedOperands {
        op,
        lhs: type_label(lhs),
        rhs: type_label(rhs),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(x) => Some(Num::Float(*x)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(x) => x,
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match Num::of(value)? {
        Num::Int(i) => Some(i),
        Num::Float(_) => None,
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    let bad = |symbol: &'static str, operand: &Value| ExprError::BadOperand {
        op: symbol,
        operand: type_label(operand),
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Pos => match Num::of(&operand) {
            Some(Num::Int(i)) => Ok(Value::Int(i)),
            Some(Num::Float(x)) => Ok(Value::Float(x)),
            None => Err(bad("+", &operand)),
        },
        UnaryOp::Neg => match Num::of(&operand) {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or(ExprError::Overflow { op: "-" }),
            Some(Num::Float(x)) => Ok(Value::Float(-x)),
            None => Err(bad("-", &operand)),
        },
    }
}

fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    if let (Some(a), Some(b)) = (Num::of(lhs), Num::of(rhs)) {
        return match (a, b) {
            (Num::Int(x), Num::Int(y)) => int_arith(op, x, y),
            _ => float_arith(op, a.as_f64(), b.as_f64()),
        };
    }

    match (op, lhs, rhs) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, seq, count) | (BinOp::Mul, count, seq)
            if matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_)) =>
        {
            let times = as_int(count).ok_or_else(|| unsupported("*", lhs, rhs))?;
            let times = usize::try_from(times).unwrap_or(0);
            Ok(match seq {
                Value::Str(s) => {
                    repeated_len(s.len(), times)?;
                    Value::Str(s.repeat(times))
                }
                Value::List(items) => Value::List(repeat_items(items, times)?),
                Value::Tuple(items) => Value::Tuple(repeat_items(items, times)?),
                _ => return Err(unsupported("*", lhs, rhs)),
            })
        }
        _ => Err(unsupported(op.symbol(), lhs, rhs)),
    }
}

/// Largest string (in bytes) or sequence (in items) a repetition may build.
const MAX_REPEAT_LEN: usize = 1 << 24;

fn repeated_len(len: usize, times: usize) -> Result<usize, ExprError> {
    len.checked_mul(times)
        .filter(|&total| total <= MAX_REPEAT_LEN)
        .ok_or(ExprError::Overflow { op: "*" })
}

fn repeat_items(items: &[Value], times: usize) -> Result<Vec<Value>, ExprError> {
    let mut out = Vec::with_capacity(repeated_len(items.len(), times)?);
    if !items.is_empty() {
        for _ in 0..times {
            out.extend_from_slice(items);
        }
    }
    Ok(out)
}

fn int_arith(op: BinOp, x: i64, y: i64) -> Result<Value, ExprError> {
    let overflow = ExprError::Overflow { op: op.symbol() };
    let result = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => {
            if y == 0 {
                return Err(ExprError::DivisionByZero);
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(ExprError::DivisionByZero);
            }
            floor_div(x, y)
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(ExprError::DivisionByZero);
            }
            floor_mod(x, y)
        }
        BinOp::Pow => {
            if y < 0 {
                if x == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            u32::try_from(y).ok().and_then(|exp| x.checked_pow(exp))
        }
    };
    result.map(Value::Int).ok_or(overflow)
}

fn floor_div(x: i64, y: i64) -> Option<i64> {
    let quotient = x.checked_div(y)?;
    let remainder = x.checked_rem(y)?;
    if remainder != 0 && ((remainder < 0) != (y < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn floor_mod(x: i64, y: i64) -> Option<i64> {
    let remainder = x.checked_rem(y)?;
    if remainder != 0 && ((remainder < 0) != (y < 0)) {
        Some(remainder + y)
    } else {
        Some(remainder)
    }
}

fn float_arith(op: BinOp, x: f64, y: f64) -> Result<Value, ExprError> {
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => {
            return Err(ExprError::DivisionByZero)
        }
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => {
            let remainder = x % y;
            if remainder != 0.0 && ((remainder < 0.0) != (y < 0.0)) {
                remainder + y
            } else {
                remainder
            }
        }
        BinOp::Pow if x == 0.0 && y < 0.0 => return Err(ExprError::DivisionByZero),
        BinOp::Pow => x.powf(y),
    };
    Ok(Value::Float(value))
}

/// Equality as contract authors expect it: numbers compare by value across
/// `bool`/`int`/`float`, containers compare element-wise.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (Num::of(lhs), Num::of(rhs)) {
        return match (a, b) {
            (Num::Int(x), Num::Int(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        };
    }
    match (lhs, rhs) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Type(a), Value::Type(b)) => a == b,
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (
            Value::Object {
                class: ca,
                fields: fa,
            },
            Value::Object {
                class: cb,
                fields: fb,
            },
        ) => {
            ca == cb
                && fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => false,
    }
}

/// Ordering for `<`-style comparisons. `Ok(None)` means unordered (NaN).
fn order(op: &'static str, lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, ExprError> {
    if let (Some(a), Some(b)) = (Num::of(lhs), Num::of(rhs)) {
        return Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
            _ => a.as_f64().partial_cmp(&b.as_f64()),
        });
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !values_equal(x, y) {
                    return order(op, x, y);
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

fn is_same(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Type(a), Value::Type(b)) => a == b,
        _ => false,
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, ExprError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            _ => Err(unsupported("in", item, container)),
        },
        Value::List(items) | Value::Tuple(items) => {
            Ok(items.iter().any(|candidate| values_equal(candidate, item)))
        }
        Value::Object { fields, .. } => match item {
            Value::Str(name) => Ok(fields.contains_key(name)),
            _ => Err(unsupported("in", item, container)),
        },
        other => Err(ExprError::NotIterable(type_label(other))),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ExprError> {
    let symbol = op.symbol();
    Ok(match op {
        CmpOp::Eq => values_equal(lhs, rhs),
        CmpOp::NotEq => !values_equal(lhs, rhs),
        CmpOp::Lt => order(symbol, lhs, rhs)? == Some(Ordering::Less),
        CmpOp::Le => matches!(
            order(symbol, lhs, rhs)?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CmpOp::Gt => order(symbol, lhs, rhs)? == Some(Ordering::Greater),
        CmpOp::Ge => matches!(
            order(symbol, lhs, rhs)?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CmpOp::In => contains(rhs, lhs)?,
        CmpOp::NotIn => !contains(rhs, lhs)?,
        CmpOp::Is => is_same(lhs, rhs),
        CmpOp::IsNot => !is_same(lhs, rhs),
    })
}

fn subscript(target: &Value, index: &Value) -> Result<Value, ExprError> {
    let position = |len: usize| -> Result<usize, ExprError> {
        let i = as_int(index).ok_or_else(|| unsupported("[]", target, index))?;
        let resolved = if i < 0 { i + len as i64 } else { i };
        if resolved < 0 || resolved >= len as i64 {
            return Err(ExprError::IndexOutOfRange { index: i, len });
        }
        Ok(resolved as usize)
    };
    match target {
        Value::List(items) | Value::Tuple(items) => Ok(items[position(items.len())?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(chars[position(chars.len())?].to_string()))
        }
        other => Err(ExprError::NotSubscriptable(type_label(other))),
    }
}

fn iterate(value: &Value) -> Result<Vec<Value>, ExprError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(ExprError::NotIterable(type_label(other))),
    }
}

fn bad_call(func: &str, message: impl Into<String>) -> ExprError {
    ExprError::BadCall {
        func: func.to_string(),
        message: message.into(),
    }
}

fn expect_arity(func: &str, args: &[Value], arity: usize) -> Result<(), ExprError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(bad_call(
            func,
            format!("takes exactly {} argument(s) ({} given)", arity, args.len()),
        ))
    }
}

fn extreme(func: &str, args: Vec<Value>, wanted: Ordering) -> Result<Value, ExprError> {
    let candidates = match args.len() {
        0 => return Err(bad_call(func, "expected at least 1 argument, got 0")),
        1 => iterate(&args[0])?,
        _ => args,
    };
    let mut iter = candidates.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| bad_call(func, "arg is an empty sequence"))?;
    for candidate in iter {
        if order("<", &candidate, &best)? == Some(wanted) {
            best = candidate;
        }
    }
    Ok(best)
}

fn call_builtin(func: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match func {
        "len" => {
            expect_arity(func, &args, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) | Value::Tuple(items) => items.len(),
                Value::Object { fields, .. } => fields.len(),
                other => {
                    return Err(bad_call(
                        func,
                        format!("object of type {} has no len()", type_label(other)),
                    ))
                }
            };
            Ok(Value::Int(len as i64))
        }
        "abs" => {
            expect_arity(func, &args, 1)?;
            match Num::of(&args[0]) {
                Some(Num::Int(i)) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or(ExprError::Overflow { op: "abs" }),
                Some(Num::Float(x)) => Ok(Value::Float(x.abs())),
                None => Err(ExprError::BadOperand {
                    op: "abs()",
                    operand: type_label(&args[0]),
                }),
            }
        }
        "min" => extreme(func, args, Ordering::Less),
        "max" => extreme(func, args, Ordering::Greater),
        "isinstance" => {
            expect_arity(func, &args, 2)?;
            let types = TypeSet::from_value(&args[1])
                .map_err(|_| bad_call(func, "arg 2 must be a type or tuple of types"))?;
            Ok(Value::Bool(types.contains(&args[0])))
        }
        "issubclass" => {
            expect_arity(func, &args, 2)?;
            let Value::Type(tag) = &args[0] else {
                return Err(bad_call(func, "arg 1 must be a class"));
            };
            let types = TypeSet::from_value(&args[1])
                .map_err(|_| bad_call(func, "arg 2 must be a class or tuple of classes"))?;
            Ok(Value::Bool(types.includes_type(tag)))
        }
        "type" => {
            expect_arity(func, &args, 1)?;
            Ok(Value::Type(args[0].type_tag()))
        }
        "all" => {
            expect_arity(func, &args, 1)?;
            Ok(Value::Bool(iterate(&args[0])?.iter().all(Value::is_truthy)))
        }
        "any" => {
            expect_arity(func, &args, 1)?;
            Ok(Value::Bool(iterate(&args[0])?.iter().any(Value::is_truthy)))
        }
        "sum" => {
            expect_arity(func, &args, 1)?;
            iterate(&args[0])?
                .iter()
                .try_fold(Value::Int(0), |acc, item| binary(BinOp::Add, &acc, item))
        }
        "str" => match args.as_slice() {
            [] => Ok(Value::Str(String::new())),
            [value] => Ok(Value::Str(value.to_plain_string())),
            _ => expect_arity(func, &args, 1).map(|_| Value::None),
        },
        "bool" => match args.as_slice() {
            [] => Ok(Value::Bool(false)),
            [value] => Ok(Value::Bool(value.is_truthy())),
            _ => expect_arity(func, &args, 1).map(|_| Value::None),
        },
        "int" => {
            expect_arity(func, &args, 1)?;
            match &args[0] {
                Value::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| bad_call(func, format!("invalid literal: {}", args[0]))),
                Value::Float(x) if x.is_finite() && x.abs() < 9.2e18 => {
                    Ok(Value::Int(x.trunc() as i64))
                }
                other => match Num::of(other) {
                    Some(Num::Int(i)) => Ok(Value::Int(i)),
                    _ => Err(bad_call(
                        func,
                        format!("cannot convert {} to int", type_label(other)),
                    )),
                },
            }
        }
        "float" => {
            expect_arity(func, &args, 1)?;
            match &args[0] {
                Value::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| bad_call(func, format!("invalid literal: {}", args[0]))),
                other => Num::of(other)
                    .map(|n| Value::Float(n.as_f64()))
                    .ok_or_else(|| {
                        bad_call(func, format!("cannot convert {} to float", type_label(other)))
                    }),
            }
        }
        other => Err(ExprError::NotCallable(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;
    use crate::expr::scope::Scope;

    fn eval_in(src: &str, globals: &Scope, locals: &Scope) -> Result<Value, ExprError> {
        let expr = parse(src).unwrap();
        evaluate(&expr, &Env::new(globals, locals))
    }

    fn eval(src: &str) -> Value {
        eval_in(src, &Scope::new(), &Scope::new()).unwrap()
    }

    #[test]
    fn test_arithmetic_follows_floor_semantics() {
        assert_eq!(eval("7 // 2"), Value::Int(3));
        assert_eq!(eval("-7 // 2"), Value::Int(-4));
        assert_eq!(eval("-7 % 3"), Value::Int(2));
        assert_eq!(eval("7 % -3"), Value::Int(-2));
        assert_eq!(eval("7 / 2"), Value::Float(3.5));
        assert_eq!(eval("2 ** 10"), Value::Int(1024));
        assert_eq!(eval("-2 ** 2"), Value::Int(-4));
        assert_eq!(eval("(4 + 6) % 2"), Value::Int(0));
    }

    #[test]
    fn test_overflow_and_division_errors() {
        let empty = Scope::new();
        assert_eq!(
            eval_in("1 // 0", &empty, &empty).unwrap_err(),
            ExprError::DivisionByZero
        );
        assert!(matches!(
            eval_in("9223372036854775807 + 1", &empty, &empty).unwrap_err(),
            ExprError::Overflow { op: "+" }
        ));
    }

    #[test]
    fn test_oversized_repetition_is_an_overflow() {
        let empty = Scope::new();
        for src in [
            "[0] * 9223372036854775807",
            "(1, 2) * 4611686018427387904",
            "'ab' * 4611686018427387904",
            "'x' * 100000000",
        ] {
            assert!(
                matches!(eval_in(src, &empty, &empty), Err(ExprError::Overflow { op: "*" })),
                "{} should overflow",
                src
            );
        }
        assert_eq!(eval("'ab' * 3"), Value::Str("ababab".into()));
        assert_eq!(eval("3 * [1]"), Value::List(vec![Value::Int(1); 3]));
        assert_eq!(eval("[] * 9223372036854775807"), Value::List(vec![]));
        assert_eq!(eval("'ab' * -2"), Value::Str(String::new()));
    }

    #[test]
    fn test_zero_to_negative_power_divides_by_zero() {
        let empty = Scope::new();
        for src in ["0 ** -1", "0.0 ** -1.0", "0 ** -2.5"] {
            assert_eq!(
                eval_in(src, &empty, &empty).unwrap_err(),
                ExprError::DivisionByZero,
                "{}",
                src
            );
        }
        assert_eq!(eval("2 ** -1"), Value::Float(0.5));
        assert_eq!(eval("0 ** 0"), Value::Int(1));
    }

    #[test]
    fn test_and_or_return_operands() {
        assert_eq!(eval("0 or ''"), Value::from(""));
        assert_eq!(eval("3 and 0"), Value::Int(0));
        assert_eq!(eval("None or 5"), Value::Int(5));
        assert_eq!(eval("not 0"), Value::Bool(true));
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(eval("0 < 5 <= 5"), Value::Bool(true));
        assert_eq!(eval("0 < 5 < 5"), Value::Bool(false));
        assert_eq!(eval("1 == 1.0 == True"), Value::Bool(true));
    }

    #[test]
    fn test_membership_and_identity() {
        assert_eq!(eval("'My' in 'MyNum 3'"), Value::Bool(true));
        assert_eq!(eval("3 not in [1, 2]"), Value::Bool(true));
        assert_eq!(eval("None is None"), Value::Bool(true));
        assert_eq!(eval("0 is not None"), Value::Bool(true));
    }

    #[test]
    fn test_locals_shadow_globals() {
        let globals = Scope::new().with("x", 1).with("limit", 10);
        let locals = Scope::new().with("x", 2);
        assert_eq!(
            eval_in("x < limit and x", &globals, &locals).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_builtin_type_names_resolve_after_scopes() {
        assert_eq!(eval("int"), Value::Type(TypeTag::Int));
        let globals = Scope::new().with("int", "shadowed");
        assert_eq!(
            eval_in("int", &globals, &Scope::new()).unwrap(),
            Value::from("shadowed")
        );
    }

    #[test]
    fn test_builtins() {
        assert_eq!(eval("len('abc') + len([1, 2])"), Value::Int(5));
        assert_eq!(eval("max(3, 9, 4)"), Value::Int(9));
        assert_eq!(eval("min([3, 9, 4])"), Value::Int(3));
        assert_eq!(eval("isinstance(1, (str, int))"), Value::Bool(true));
        assert_eq!(eval("isinstance(True, int)"), Value::Bool(true));
        assert_eq!(eval("issubclass(bool, int)"), Value::Bool(true));
        assert_eq!(eval("type('a') == str"), Value::Bool(true));
        assert_eq!(eval("sum([1, 2, 3.5])"), Value::Float(6.5));
        assert_eq!(eval("all([1, 'x']) and not any([0, ''])"), Value::Bool(true));
        assert_eq!(eval("int('42') + int(2.9)"), Value::Int(44));
        assert_eq!(eval("str(15)"), Value::from("15"));
    }

    #[test]
    fn test_attributes_and_subscripts() {
        let locals = Scope::new()
            .with("result", Value::object("MyNum", [("i", 31)]))
            .with("xs", Value::List(vec![Value::Int(1), Value::Int(2)]));
        let globals = Scope::new().with("MyNum", TypeTag::Class("MyNum".into()));
        assert_eq!(
            eval_in("result.i == 31 and type(result) == MyNum", &globals, &locals).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval_in("xs[-1]", &globals, &locals).unwrap(), Value::Int(2));
        assert!(matches!(
            eval_in("xs[2]", &globals, &locals).unwrap_err(),
            ExprError::IndexOutOfRange { index: 2, len: 2 }
        ));
        assert!(matches!(
            eval_in("result.j", &globals, &locals).unwrap_err(),
            ExprError::NoAttribute { .. }
        ));
    }

    #[test]
    fn test_evaluation_errors() {
        let empty = Scope::new();
        assert_eq!(
            eval_in("a1 > 0", &empty, &empty).unwrap_err(),
            ExprError::UnknownName("a1".into())
        );
        assert!(matches!(
            eval_in("'a' < 1", &empty, &empty).unwrap_err(),
            ExprError::UnsupportedOperands { op: "<", .. }
        ));
        assert_eq!(
            eval_in("frobnicate(1)", &empty, &empty).unwrap_err(),
            ExprError::NotCallable("frobnicate".into())
        );
    }

    #[test]
    fn test_sequence_repetition_and_concat() {
        assert_eq!(eval("'ab' * 2"), Value::from("abab"));
        assert_eq!(eval("2 * [0]"), Value::List(vec![Value::Int(0), Value::Int(0)]));
        assert_eq!(eval("(1,) + (2,)"), Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
    }
}
