//! Integer and Float

use super::{arg, expect_int, expect_num};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{format_float, Args, Value};
use smallvec::smallvec;
use std::cmp::Ordering;

pub fn register(core: &CoreClasses) {
    let numeric = &core.numeric;
    numeric.define_native("+", |exec, recv, args, _| binary(exec, Arith::Add, recv, &args));
    numeric.define_native("-", |exec, recv, args, _| binary(exec, Arith::Sub, recv, &args));
    numeric.define_native("*", |exec, recv, args, _| binary(exec, Arith::Mul, recv, &args));
    numeric.define_native("/", |exec, recv, args, _| binary(exec, Arith::Div, recv, &args));
    numeric.define_native("%", |exec, recv, args, _| binary(exec, Arith::Mod, recv, &args));
    numeric.define_native("modulo", |exec, recv, args, _| binary(exec, Arith::Mod, recv, &args));
    numeric.define_native("**", |exec, recv, args, _| binary(exec, Arith::Pow, recv, &args));
    numeric.define_native("pow", |exec, recv, args, _| binary(exec, Arith::Pow, recv, &args));
    numeric.define_native("div", num_div);
    numeric.define_native("fdiv", num_fdiv);
    numeric.define_native("divmod", num_divmod);
    numeric.define_native("-@", num_negate);
    numeric.define_native("+@", |_, recv, _, _| Ok(recv.clone()));
    numeric.define_native("==", num_eq);
    numeric.define_native("<=>", num_cmp);
    numeric.define_native("<", |exec, recv, args, _| compare_with(exec, recv, &args, Ordering::is_lt));
    numeric.define_native(">", |exec, recv, args, _| compare_with(exec, recv, &args, Ordering::is_gt));
    numeric.define_native("<=", |exec, recv, args, _| compare_with(exec, recv, &args, Ordering::is_le));
    numeric.define_native(">=", |exec, recv, args, _| compare_with(exec, recv, &args, Ordering::is_ge));
    numeric.define_native("between?", num_between);
    numeric.define_native("clamp", num_clamp);
    numeric.define_native("abs", num_abs);
    numeric.define_native("zero?", |_, recv, _, _| Ok(Value::Bool(recv.as_f64() == Some(0.0))));
    numeric.define_native("positive?", |_, recv, _, _| {
        Ok(Value::Bool(recv.as_f64().is_some_and(|x| x > 0.0)))
    });
    numeric.define_native("negative?", |_, recv, _, _| {
        Ok(Value::Bool(recv.as_f64().is_some_and(|x| x < 0.0)))
    });
    numeric.define_native("integer?", |_, recv, _, _| Ok(Value::Bool(matches!(recv, Value::Int(_)))));
    numeric.define_native("to_f", |_, recv, _, _| Ok(Value::Float(recv.as_f64().unwrap_or_default())));
    numeric.define_native("step", num_step);

    let integer = &core.integer;
    integer.define_native("to_s", int_to_s);
    integer.define_native("inspect", int_to_s);
    integer.define_native("to_i", |_, recv, _, _| Ok(recv.clone()));
    integer.define_native("to_int", |_, recv, _, _| Ok(recv.clone()));
    integer.define_native("floor", |exec, recv, args, _| int_round(exec, recv, &args, IntRound::Floor));
    integer.define_native("ceil", |exec, recv, args, _| int_round(exec, recv, &args, IntRound::Ceil));
    integer.define_native("round", |exec, recv, args, _| int_round(exec, recv, &args, IntRound::Half));
    integer.define_native("truncate", |exec, recv, args, _| {
        int_round(exec, recv, &args, IntRound::Truncate)
    });
    integer.define_native("times", int_times);
    integer.define_native("upto", |exec, recv, args, block| int_walk(exec, recv, &args, block, 1));
    integer.define_native("downto", |exec, recv, args, block| int_walk(exec, recv, &args, block, -1));
    integer.define_native("succ", int_succ);
    integer.define_native("next", int_succ);
    integer.define_native("pred", int_pred);
    integer.define_native("chr", int_chr);
    integer.define_native("ord", |_, recv, _, _| Ok(recv.clone()));
    integer.define_native("even?", |_, recv, _, _| Ok(Value::Bool(recv.as_int().is_some_and(|i| i % 2 == 0))));
    integer.define_native("odd?", |_, recv, _, _| Ok(Value::Bool(recv.as_int().is_some_and(|i| i % 2 != 0))));
    integer.define_native("gcd", int_gcd);
    integer.define_native("lcm", int_lcm);
    integer.define_native("digits", int_digits);
    integer.define_native("~", |_, recv, _, _| Ok(Value::Int(!recv.as_int().unwrap_or_default())));
    integer.define_native("&", |exec, recv, args, _| bitwise(exec, recv, &args, |a, b| a & b));
    integer.define_native("|", |exec, recv, args, _| bitwise(exec, recv, &args, |a, b| a | b));
    integer.define_native("^", |exec, recv, args, _| bitwise(exec, recv, &args, |a, b| a ^ b));
    integer.define_native("<<", |exec, recv, args, _| shift(exec, recv, &args, false));
    integer.define_native(">>", |exec, recv, args, _| shift(exec, recv, &args, true));

    let float = &core.float;
    float.define_native("to_s", float_to_s);
    float.define_native("inspect", float_to_s);
    float.define_native("to_i", float_to_i);
    float.define_native("to_int", float_to_i);
    float.define_native("truncate", float_to_i);
    float.define_native("floor", |exec, recv, args, _| float_round(exec, recv, &args, f64::floor));
    float.define_native("ceil", |exec, recv, args, _| float_round(exec, recv, &args, f64::ceil));
    float.define_native("round", |exec, recv, args, _| float_round(exec, recv, &args, f64::round));
    float.define_native("nan?", |_, recv, _, _| Ok(Value::Bool(recv.as_f64().is_some_and(f64::is_nan))));
    float.define_native("finite?", |_, recv, _, _| {
        Ok(Value::Bool(recv.as_f64().is_some_and(f64::is_finite)))
    });
    float.define_native("infinite?", float_infinite);
}

// =============================================================================
// Arithmetic
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

fn binary(
    exec: &mut Exec<'_>,
    op: Arith,
    recv: &Value,
    args: &Args,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    arith(exec, op, recv, &args[0])
}

pub fn arith(
    exec: &mut Exec<'_>,
    op: Arith,
    lhs: &Value,
    rhs: &Value,
) -> EvalResult<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arith(exec, op, *a, *b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (lhs.as_f64().unwrap_or_default(), rhs.as_f64().unwrap_or_default());
            Ok(Value::Float(float_arith(op, a, b)))
        }
        _ => {
            let from = match rhs {
                Value::Nil => "nil".to_string(),
                other => exec.class_of(other).name.clone(),
            };
            let into = exec.class_of(lhs).name.clone();
            exec.raise("TypeError", format!("{} can't be coerced into {}", from, into))
        }
    }
}

fn int_arith(
    exec: &Exec<'_>,
    op: Arith,
    a: i64,
    b: i64,
) -> EvalResult<Value> {
    // overflow promotes to Float
    let promote = |checked: Option<i64>, wide: f64| match checked {
        Some(value) => Value::Int(value),
        None => Value::Float(wide),
    };
    let (fa, fb) = (a as f64, b as f64);
    Ok(match op {
        Arith::Add => promote(a.checked_add(b), fa + fb),
        Arith::Sub => promote(a.checked_sub(b), fa - fb),
        Arith::Mul => promote(a.checked_mul(b), fa * fb),
        Arith::Div => {
            if b == 0 {
                return exec.raise("ZeroDivisionError", "divided by 0");
            }
            promote(floor_div(a, b), (fa / fb).floor())
        }
        Arith::Mod => {
            if b == 0 {
                return exec.raise("ZeroDivisionError", "divided by 0");
            }
            Value::Int(floor_mod(a, b))
        }
        Arith::Pow => match u32::try_from(b) {
            Ok(exp) => promote(a.checked_pow(exp), fa.powf(fb)),
            Err(_) => Value::Float(fa.powf(fb)),
        },
    })
}

fn floor_div(
    a: i64,
    b: i64,
) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(
    a: i64,
    b: i64,
) -> i64 {
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn float_arith(
    op: Arith,
    a: f64,
    b: f64,
) -> f64 {
    match op {
        Arith::Add => a + b,
        Arith::Sub => a - b,
        Arith::Mul => a * b,
        Arith::Div => a / b,
        Arith::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        Arith::Pow => a.powf(b),
    }
}

fn num_div(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    match arith(exec, Arith::Div, recv, &args[0])? {
        Value::Float(x) => float_to_int(exec, x.floor()),
        other => Ok(other),
    }
}

fn num_fdiv(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let a = expect_num(exec, recv)?;
    let b = expect_num(exec, &args[0])?;
    Ok(Value::Float(a / b))
}

fn num_divmod(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let quotient = num_div(exec, recv, args.clone(), None)?;
    let remainder = arith(exec, Arith::Mod, recv, &args[0])?;
    Ok(Value::array(vec![quotient, remainder]))
}

fn num_negate(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(match recv {
        Value::Int(i) => match i.checked_neg() {
            Some(n) => Value::Int(n),
            None => Value::Float(-(*i as f64)),
        },
        Value::Float(x) => Value::Float(-x),
        other => other.clone(),
    })
}

fn num_abs(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(match recv {
        Value::Int(i) => match i.checked_abs() {
            Some(n) => Value::Int(n),
            None => Value::Float((*i as f64).abs()),
        },
        Value::Float(x) => Value::Float(x.abs()),
        other => other.clone(),
    })
}

// =============================================================================
// Comparison
// =============================================================================

fn num_eq(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(exec.equals(recv, &args[0])?))
}

fn num_cmp(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let ordering = match (recv.as_f64(), args[0].as_f64()) {
        (Some(_), Some(_)) => exec.compare(recv, &args[0])?,
        _ => None,
    };
    Ok(ordering.map(ordering_value).unwrap_or_default())
}

pub fn ordering_value(ordering: Ordering) -> Value {
    Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn compare_with(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    test: fn(Ordering) -> bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    if args[0].as_f64().is_none() {
        let class = exec.class_of(recv).name.clone();
        let other = match &args[0] {
            Value::Nil => "nil".to_string(),
            value => exec.class_of(value).name.clone(),
        };
        return exec.raise(
            "ArgumentError",
            format!("comparison of {} with {} failed", class, other),
        );
    }
    // NaN compares false with everything
    Ok(Value::Bool(exec.compare(recv, &args[0])?.is_some_and(test)))
}

fn num_between(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let above = exec.compare_strict(recv, &args[0])?.is_ge();
    let below = exec.compare_strict(recv, &args[1])?.is_le();
    Ok(Value::Bool(above && below))
}

fn num_clamp(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    if exec.compare_strict(&args[0], &args[1])?.is_gt() {
        return exec.raise("ArgumentError", "min argument must be less than or equal to max argument");
    }
    if exec.compare_strict(recv, &args[0])?.is_lt() {
        return Ok(args[0].clone());
    }
    if exec.compare_strict(recv, &args[1])?.is_gt() {
        return Ok(args[1].clone());
    }
    Ok(recv.clone())
}

// =============================================================================
// Iteration
// =============================================================================

/// `n.times { |i| ... }`; without a block the indices as an array.
fn int_times(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let count = expect_int(exec, recv)?;
    let Some(block) = block else {
        return Ok(Value::array((0..count.max(0)).map(Value::Int).collect()));
    };
    let mut i = 0;
    while i < count {
        exec.call_block(&block, smallvec![Value::Int(i)])?;
        i += 1;
    }
    Ok(recv.clone())
}

fn int_walk(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    block: Option<Value>,
    direction: i64,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let from = expect_int(exec, recv)?;
    let to = expect_int(exec, &args[0])?;
    let in_range = |i: i64| if direction > 0 { i <= to } else { i >= to };
    let Some(block) = block else {
        let mut items = Vec::new();
        let mut i = from;
        while in_range(i) {
            items.push(Value::Int(i));
            i += direction;
        }
        return Ok(Value::array(items));
    };
    let mut i = from;
    while in_range(i) {
        exec.call_block(&block, smallvec![Value::Int(i)])?;
        i += direction;
    }
    Ok(recv.clone())
}

/// `start.step(limit, step) { |x| ... }`
fn num_step(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let step = match args.get(1) {
        Some(step) => step.clone(),
        None => Value::Int(1),
    };
    if step.as_f64() == Some(0.0) {
        return exec.raise("ArgumentError", "step can't be 0");
    }
    let limit = arg(&args, 0);
    let ascending = step.as_f64().unwrap_or(1.0) > 0.0;
    let mut items = Vec::new();
    let mut current = recv.clone();
    loop {
        let ordering = exec.compare_strict(&current, &limit)?;
        if (ascending && ordering.is_gt()) || (!ascending && ordering.is_lt()) {
            break;
        }
        match &block {
            Some(block) => {
                exec.call_block(block, smallvec![current.clone()])?;
            }
            None => items.push(current.clone()),
        }
        current = arith(exec, Arith::Add, &current, &step)?;
    }
    match block {
        Some(_) => Ok(recv.clone()),
        None => Ok(Value::array(items)),
    }
}

// =============================================================================
// Integer
// =============================================================================

fn int_to_s(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let value = expect_int(exec, recv)?;
    let base = match args.first() {
        Some(base) => expect_int(exec, base)?,
        None => 10,
    };
    if !(2..=36).contains(&base) {
        return exec.raise("ArgumentError", format!("invalid radix {}", base));
    }
    Ok(Value::str(to_radix(value, base as u32)))
}

fn to_radix(
    value: i64,
    base: u32,
) -> String {
    if base == 10 {
        return value.to_string();
    }
    let mut magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % u64::from(base)) as u32;
        digits.push(std::char::from_digit(digit, base).unwrap_or('?'));
        magnitude /= u64::from(base);
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntRound {
    Floor,
    Ceil,
    /// Halves away from zero
    Half,
    Truncate,
}

/// Integers are unchanged unless `digits` is negative, which rounds to a
/// multiple of `10 ** -digits`.
fn int_round(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    how: IntRound,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let value = expect_int(exec, recv)?;
    let digits = match args.first() {
        Some(digits) => expect_int(exec, digits)?,
        None => 0,
    };
    if digits >= 0 || value == 0 {
        return Ok(Value::Int(value));
    }
    let n = i128::from(value);
    let exponent = digits.unsigned_abs();
    if exponent > 38 {
        // One step is far beyond any i64.
        let step = 10f64.powi(exponent.min(400) as i32);
        return Ok(match how {
            IntRound::Floor if n < 0 => Value::Float(-step),
            IntRound::Ceil if n > 0 => Value::Float(step),
            _ => Value::Int(0),
        });
    }
    let step = 10i128.pow(exponent as u32);
    let below = n - n.rem_euclid(step);
    let above = if below == n { n } else { below + step };
    let rounded = match how {
        IntRound::Floor => below,
        IntRound::Ceil => above,
        IntRound::Truncate if n < 0 => above,
        IntRound::Truncate => below,
        IntRound::Half => {
            let magnitude = (n.abs() + step / 2) / step * step;
            if n < 0 {
                -magnitude
            } else {
                magnitude
            }
        }
    };
    Ok(match i64::try_from(rounded) {
        Ok(int) => Value::Int(int),
        Err(_) => Value::Float(rounded as f64),
    })
}

fn int_succ(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    arith(exec, Arith::Add, recv, &Value::Int(1))
}

fn int_pred(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    arith(exec, Arith::Sub, recv, &Value::Int(1))
}

fn int_chr(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let code = expect_int(exec, recv)?;
    match u32::try_from(code).ok().and_then(char::from_u32) {
        Some(c) => Ok(Value::str(c.to_string())),
        None => exec.raise("RangeError", format!("{} out of char range", code)),
    }
}

fn gcd(
    a: i64,
    b: i64,
) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a as i64
}

fn int_gcd(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let a = expect_int(exec, recv)?;
    let b = expect_int(exec, &args[0])?;
    Ok(Value::Int(gcd(a, b)))
}

fn int_lcm(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let a = expect_int(exec, recv)?;
    let b = expect_int(exec, &args[0])?;
    if a == 0 || b == 0 {
        return Ok(Value::Int(0));
    }
    let lcm = (a / gcd(a, b)).checked_mul(b).map(i64::abs);
    match lcm {
        Some(lcm) => Ok(Value::Int(lcm)),
        None => exec.raise("RangeError", "integer overflow in lcm"),
    }
}

fn int_digits(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let value = expect_int(exec, recv)?;
    if value < 0 {
        return exec.raise("ArgumentError", "out of domain");
    }
    let mut digits = vec![Value::Int(value % 10)];
    let mut rest = value / 10;
    while rest > 0 {
        digits.push(Value::Int(rest % 10));
        rest /= 10;
    }
    Ok(Value::array(digits))
}

fn bitwise(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    op: fn(i64, i64) -> i64,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let a = expect_int(exec, recv)?;
    let b = expect_int(exec, &args[0])?;
    Ok(Value::Int(op(a, b)))
}

fn shift(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    right: bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let value = expect_int(exec, recv)?;
    let count = expect_int(exec, &args[0])?;
    let count = if right { -count } else { count };
    if count >= 0 {
        let shifted = u32::try_from(count)
            .ok()
            .and_then(|n| value.checked_mul(1_i64.checked_shl(n)?).filter(|_| n < 63));
        match shifted {
            Some(v) => Ok(Value::Int(v)),
            None if value == 0 => Ok(Value::Int(0)),
            None => Ok(Value::Float(value as f64 * 2f64.powf(count as f64))),
        }
    } else {
        let n = count.unsigned_abs().min(63) as u32;
        Ok(Value::Int(value >> n))
    }
}

// =============================================================================
// Float
// =============================================================================

fn float_to_s(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let value = expect_num(exec, recv)?;
    Ok(Value::str(format_float(value)))
}

fn float_to_int(
    exec: &Exec<'_>,
    value: f64,
) -> EvalResult<Value> {
    if value.is_nan() {
        return exec.raise("RangeError", "NaN");
    }
    if value.is_infinite() {
        return exec.raise("RangeError", format_float(value));
    }
    if value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return exec.raise("RangeError", format!("{} out of Integer range", format_float(value)));
    }
    Ok(Value::Int(value as i64))
}

fn float_to_i(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let value = expect_num(exec, recv)?;
    float_to_int(exec, value.trunc())
}

/// Rounding with optional decimal digits: an Integer without digits,
/// a Float with them.
fn float_round(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    round: fn(f64) -> f64,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let value = expect_num(exec, recv)?;
    let digits = match args.first() {
        Some(digits) => expect_int(exec, digits)?,
        None => 0,
    };
    if digits > 0 {
        if !value.is_finite() {
            return Ok(Value::Float(value));
        }
        let scale = 10f64.powi(digits.min(300) as i32);
        return Ok(Value::Float(round(value * scale) / scale));
    }
    let scale = 10f64.powi((-digits).min(300) as i32);
    float_to_int(exec, round(value / scale) * scale)
}

fn float_infinite(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(match recv.as_f64() {
        Some(x) if x == f64::INFINITY => Value::Int(1),
        Some(x) if x == f64::NEG_INFINITY => Value::Int(-1),
        _ => Value::Nil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_floor_division() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_mod(-7, 2), 1);
        assert_eq!(floor_mod(7, -2), -1);
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn test_to_radix() {
        assert_eq!(to_radix(255, 16), "ff");
        assert_eq!(to_radix(-5, 2), "-101");
        assert_eq!(to_radix(0, 8), "0");
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval("7 / 2"), "3");
        assert_eq!(eval("-7 / 2"), "-4");
        assert_eq!(eval("-7 % 3"), "2");
        assert_eq!(eval("2 ** 10"), "1024");
        assert_eq!(eval("2 ** -1"), "0.5");
        assert_eq!(eval("9223372036854775807 + 1"), "9.223372036854776e+18");
    }

    #[test]
    fn test_mixed_arithmetic() {
        assert_eq!(eval("1 + 2.5"), "3.5");
        assert_eq!(eval("7.0 / 2"), "3.5");
        assert_eq!(eval("1.0 / 0"), "Infinity");
        assert_eq!(eval("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval_err("1 / 0"), "divided by 0 (ZeroDivisionError)");
        assert_eq!(eval_err("1 % 0"), "divided by 0 (ZeroDivisionError)");
    }

    #[test]
    fn test_coercion_errors() {
        assert_eq!(eval_err("1 + 'a'"), "String can't be coerced into Integer (TypeError)");
        assert_eq!(eval_err("1 + nil"), "nil can't be coerced into Integer (TypeError)");
        assert_eq!(
            eval_err("1 < 'a'"),
            "comparison of Integer with String failed (ArgumentError)"
        );
    }

    #[test]
    fn test_float_rounding() {
        assert_eq!(eval("2.5.round"), "3");
        assert_eq!(eval("(-2.5).round"), "-3");
        assert_eq!(eval("3.14159.round(2)"), "3.14");
        assert_eq!(eval("3.7.floor"), "3");
        assert_eq!(eval("3.2.ceil"), "4");
        assert_eq!(eval("(-3.7).to_i"), "-3");
    }

    #[test]
    fn test_integer_rounding_to_tens() {
        assert_eq!(eval("12345.round(-2)"), "12300");
        assert_eq!(eval("12350.round(-2)"), "12400");
        assert_eq!(eval("(-12350).round(-2)"), "-12400");
        assert_eq!(eval("12345.round(-30)"), "0");
        assert_eq!(eval("12345.round(2)"), "12345");
        assert_eq!(eval("(-15).floor(-1)"), "-20");
        assert_eq!(eval("15.ceil(-1)"), "20");
        assert_eq!(eval("(-15).truncate(-1)"), "-10");
        assert_eq!(eval("7.floor(-50)"), "0");
    }

    #[test]
    fn test_iteration() {
        assert_eq!(eval("a = []; 3.times { |i| a << i }; a"), "[0, 1, 2]");
        assert_eq!(eval("a = []; 1.upto(3) { |i| a << i }; a"), "[1, 2, 3]");
        assert_eq!(eval("3.downto(1).to_a"), "[3, 2, 1]");
        assert_eq!(eval("1.step(10, 4).to_a"), "[1, 5, 9]");
        assert_eq!(eval("4.times.map { |i| i * i }"), "[0, 1, 4, 9]");
    }

    #[test]
    fn test_integer_misc() {
        assert_eq!(eval("255.to_s(2)"), "\"11111111\"");
        assert_eq!(eval("65.chr"), "\"A\"");
        assert_eq!(eval("12.gcd(8)"), "4");
        assert_eq!(eval("5.between?(1, 10)"), "true");
        assert_eq!(eval("15.clamp(1, 10)"), "10");
        assert_eq!(eval("1 << 4"), "16");
        assert_eq!(eval("(-5).abs"), "5");
        assert_eq!(eval("7.divmod(2)"), "[3, 1]");
        assert_eq!(eval("(1 <=> 2)"), "-1");
        assert_eq!(eval("(1 <=> 'a')"), "nil");
    }
}
