//! Range
//!
//! Integer ranges iterate lazily in `each`; everything else goes through
//! [`items`], and methods Range lacks fall back to `Array`'s on the
//! expanded items.

use super::{expect_int, require_block};
use super::numeric::{arith, Arith};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, RangeValue, Value};
use smallvec::smallvec;
use std::rc::Rc;

/// Largest range `items` will expand
pub const MAX_ITEMS: i64 = 1 << 22;

pub fn register(core: &CoreClasses) {
    let range = &core.range;
    range.define_singleton_native("new", range_new);
    range.define_native("begin", |exec, recv, _, _| Ok(range_of(exec, recv)?.start.clone()));
    range.define_native("end", |exec, recv, _, _| Ok(range_of(exec, recv)?.end.clone()));
    range.define_native("first", range_first);
    range.define_native("last", range_last);
    range.define_native("min", range_min);
    range.define_native("max", range_max);
    range.define_native("exclude_end?", |exec, recv, _, _| {
        Ok(Value::Bool(range_of(exec, recv)?.exclusive))
    });
    range.define_native("each", range_each);
    range.define_native("to_a", range_to_a);
    range.define_native("to_ary", range_to_a);
    range.define_native("entries", range_to_a);
    range.define_native("size", range_size);
    range.define_native("count", range_count);
    range.define_native("sum", range_sum);
    range.define_native("step", range_step);
    range.define_native("include?", range_include);
    range.define_native("member?", range_include);
    range.define_native("cover?", range_include);
    range.define_native("===", range_include);
    range.define_native("==", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(Value::Bool(exec.equals(recv, &args[0])?))
    });
    range.define_native("to_s", |exec, recv, _, _| range_text(exec, recv, false));
    range.define_native("inspect", |exec, recv, _, _| range_text(exec, recv, true));
}

fn range_of(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<Rc<RangeValue>> {
    match value {
        Value::Range(r) => Ok(r.clone()),
        other => {
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("wrong argument type {} (expected Range)", class.name))
        }
    }
}

/// Every element of a finite range
pub fn items(
    exec: &mut Exec<'_>,
    range: &Rc<RangeValue>,
) -> EvalResult<Vec<Value>> {
    match (&range.start, &range.end) {
        (Value::Int(_), Value::Int(_)) => {
            let (lo, hi) = range.int_bounds().unwrap_or((0, -1));
            if hi.saturating_sub(lo) >= MAX_ITEMS {
                return exec.raise("RangeError", "range too large to expand");
            }
            Ok((lo..=hi).map(Value::Int).collect())
        }
        (Value::Int(lo), Value::Float(hi)) => {
            let hi = if range.exclusive && hi.fract() == 0.0 {
                *hi as i64 - 1
            } else {
                hi.floor() as i64
            };
            if hi.saturating_sub(*lo) >= MAX_ITEMS {
                return exec.raise("RangeError", "range too large to expand");
            }
            Ok((*lo..=hi).map(Value::Int).collect())
        }
        (_, Value::Nil) => exec.raise("RangeError", "cannot convert endless range to an array"),
        (Value::Str(lo), Value::Str(hi)) => {
            let (lo, hi) = (lo.borrow().clone(), hi.borrow().clone());
            Ok(string_items(&lo, &hi, range.exclusive)
                .into_iter()
                .map(Value::str)
                .collect())
        }
        (start, _) => {
            let class = exec.class_of(start);
            exec.raise("TypeError", format!("can't iterate from {}", class.name))
        }
    }
}

/// `'a'..'e'` by successive `succ`, stopping once the strings grow
/// longer than the end.
fn string_items(
    lo: &str,
    hi: &str,
    exclusive: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    if lo.chars().count() > hi.chars().count() || (lo.len() == hi.len() && lo > hi) {
        return out;
    }
    let mut current = lo.to_string();
    loop {
        if current == hi {
            if !exclusive {
                out.push(current);
            }
            break;
        }
        if current.chars().count() > hi.chars().count() || out.len() as i64 >= MAX_ITEMS {
            break;
        }
        let next = super::string::succ(&current);
        out.push(current);
        current = next;
    }
    out
}

/// Start and length of the slice `start, count` of a sequence of `len`
/// elements; `None` when `start` is outside it.
pub fn clamp_slice(
    len: usize,
    start: i64,
    count: i64,
) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { start + len } else { start };
    if start < 0 || start > len || count < 0 {
        return None;
    }
    let count = count.min(len - start);
    Some((start as usize, count as usize))
}

/// A range used as an index into a sequence of `len` elements
pub fn range_slice(
    exec: &Exec<'_>,
    range: &RangeValue,
    len: usize,
) -> EvalResult<Option<(usize, usize)>> {
    let n = len as i64;
    let start = match &range.start {
        Value::Nil => 0,
        other => expect_int(exec, other)?,
    };
    let start = if start < 0 { start + n } else { start };
    if start < 0 || start > n {
        return Ok(None);
    }
    let end = match &range.end {
        Value::Nil => n,
        other => {
            let end = expect_int(exec, other)?;
            let end = if end < 0 { end + n } else { end };
            if range.exclusive {
                end
            } else {
                end + 1
            }
        }
    };
    Ok(clamp_slice(len, start, (end - start).max(0)))
}

fn range_new(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(3))?;
    let exclusive = args.get(2).is_some_and(Value::truthy);
    exec.make_range(args[0].clone(), args[1].clone(), exclusive)
}

fn range_first(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let range = range_of(exec, recv)?;
    let Some(count) = args.first() else {
        if range.start.is_nil() {
            return exec.raise("RangeError", "cannot get the first element of beginless range");
        }
        return Ok(range.start.clone());
    };
    let count = expect_int(exec, count)?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative array size (or size too big)");
    }
    if let (Value::Int(lo), Value::Nil) = (&range.start, &range.end) {
        return Ok(Value::array((*lo..lo.saturating_add(count)).map(Value::Int).collect()));
    }
    let items = items(exec, &range)?;
    Ok(Value::array(items.into_iter().take(count as usize).collect()))
}

fn range_last(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let range = range_of(exec, recv)?;
    let Some(count) = args.first() else {
        if range.end.is_nil() {
            return exec.raise("RangeError", "cannot get the last element of endless range");
        }
        return Ok(range.end.clone());
    };
    let count = expect_int(exec, count)?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative array size");
    }
    let items = items(exec, &range)?;
    let skip = items.len().saturating_sub(count as usize);
    Ok(Value::array(items.into_iter().skip(skip).collect()))
}

fn range_min(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    if block.is_some() || !args.is_empty() {
        let items = Value::array(items(exec, &range)?);
        return exec.call_method(&items, "min", args, block);
    }
    let empty = match exec.compare(&range.start, &range.end)? {
        Some(ordering) => ordering.is_gt() || (ordering.is_eq() && range.exclusive),
        None => true,
    };
    Ok(if empty { Value::Nil } else { range.start.clone() })
}

fn range_max(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    if block.is_some() || !args.is_empty() || range.exclusive {
        let items = Value::array(items(exec, &range)?);
        return exec.call_method(&items, "max", args, block);
    }
    let empty = match exec.compare(&range.start, &range.end)? {
        Some(ordering) => ordering.is_gt(),
        None => true,
    };
    Ok(if empty { Value::Nil } else { range.end.clone() })
}

fn range_each(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    let Some(block) = block else {
        return Ok(Value::array(items(exec, &range)?));
    };
    match (&range.start, &range.end) {
        (Value::Int(lo), Value::Int(_) | Value::Nil) => {
            let hi = match range.int_bounds() {
                Some((_, hi)) => hi,
                None => i64::MAX,
            };
            let mut i = *lo;
            while i <= hi {
                exec.call_block(&block, smallvec![Value::Int(i)])?;
                if i == i64::MAX {
                    break;
                }
                i += 1;
            }
        }
        _ => {
            for item in items(exec, &range)? {
                exec.call_block(&block, smallvec![item])?;
            }
        }
    }
    Ok(recv.clone())
}

fn range_to_a(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    Ok(Value::array(items(exec, &range)?))
}

/// Element count for numeric ranges, `nil` otherwise
fn range_size(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    match (&range.start, &range.end) {
        (Value::Int(_), Value::Nil) => Ok(Value::Float(f64::INFINITY)),
        (Value::Int(_), Value::Int(_)) => {
            let (lo, hi) = range.int_bounds().unwrap_or((0, -1));
            Ok(Value::Int(hi.saturating_sub(lo).saturating_add(1).max(0)))
        }
        (Value::Int(_), Value::Float(_)) => Ok(Value::Int(items(exec, &range)?.len() as i64)),
        (Value::Float(_), _) => {
            exec.raise("TypeError", "can't iterate from Float")
        }
        _ => Ok(Value::Nil),
    }
}

fn range_count(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    if args.is_empty() && block.is_none() {
        if let (Value::Int(_), Value::Int(_)) = (&range.start, &range.end) {
            return range_size(exec, recv, args, None);
        }
    }
    let items = Value::array(items(exec, &range)?);
    exec.call_method(&items, "count", args, block)
}

/// Integer ranges sum in closed form.
fn range_sum(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    if block.is_none() && args.is_empty() {
        if let (Value::Int(_), Value::Int(_)) = (&range.start, &range.end) {
            let (lo, hi) = range.int_bounds().unwrap_or((0, -1));
            if hi < lo {
                return Ok(Value::Int(0));
            }
            let (lo, hi) = (i128::from(lo), i128::from(hi));
            let total = (lo + hi) * (hi - lo + 1) / 2;
            return Ok(match i64::try_from(total) {
                Ok(total) => Value::Int(total),
                Err(_) => Value::Float(total as f64),
            });
        }
    }
    let items = Value::array(items(exec, &range)?);
    exec.call_method(&items, "sum", args, block)
}

fn range_step(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let range = range_of(exec, recv)?;
    let step = args[0].clone();
    match step.as_f64() {
        Some(x) if x > 0.0 => {}
        Some(x) if x == 0.0 => return exec.raise("ArgumentError", "step can't be 0"),
        Some(_) => return exec.raise("ArgumentError", "step can't be negative"),
        None => return exec.raise("TypeError", "step must be numeric"),
    }
    if range.end.is_nil() {
        let block = require_block(exec, block)?;
        let mut current = range.start.clone();
        loop {
            exec.call_block(&block, smallvec![current.clone()])?;
            current = arith(exec, Arith::Add, &current, &step)?;
        }
    }
    let mut out = Vec::new();
    let mut current = range.start.clone();
    loop {
        let ordering = exec.compare_strict(&current, &range.end)?;
        if ordering.is_gt() || (ordering.is_eq() && range.exclusive) {
            break;
        }
        match &block {
            Some(block) => {
                exec.call_block(block, smallvec![current.clone()])?;
            }
            None => out.push(current.clone()),
        }
        if out.len() as i64 >= MAX_ITEMS {
            return exec.raise("RangeError", "range too large to expand");
        }
        current = arith(exec, Arith::Add, &current, &step)?;
    }
    Ok(match block {
        Some(_) => recv.clone(),
        None => Value::array(out),
    })
}

fn range_include(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let range = range_of(exec, recv)?;
    let value = &args[0];
    let above = match &range.start {
        Value::Nil => true,
        start => exec.compare(start, value)?.is_some_and(|o| o.is_le()),
    };
    let below = match &range.end {
        Value::Nil => true,
        end => match exec.compare(value, end)? {
            Some(ordering) if range.exclusive => ordering.is_lt(),
            Some(ordering) => ordering.is_le(),
            None => false,
        },
    };
    Ok(Value::Bool(above && below))
}

fn range_text(
    exec: &mut Exec<'_>,
    recv: &Value,
    inspect: bool,
) -> EvalResult<Value> {
    let range = range_of(exec, recv)?;
    let start = endpoint_text(exec, &range.start, inspect)?;
    let end = endpoint_text(exec, &range.end, inspect)?;
    let dots = if range.exclusive { "..." } else { ".." };
    Ok(Value::str(format!("{}{}{}", start, dots, end)))
}

fn endpoint_text(
    exec: &mut Exec<'_>,
    value: &Value,
    inspect: bool,
) -> EvalResult<String> {
    match value {
        Value::Nil if inspect => Ok(String::new()),
        other if inspect => exec.inspect_or_fallback(other),
        other => exec.to_s(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_clamp_slice() {
        assert_eq!(clamp_slice(5, 1, 2), Some((1, 2)));
        assert_eq!(clamp_slice(5, -2, 10), Some((3, 2)));
        assert_eq!(clamp_slice(5, 5, 1), Some((5, 0)));
        assert_eq!(clamp_slice(5, 6, 1), None);
        assert_eq!(clamp_slice(5, 0, -1), None);
    }

    #[test]
    fn test_string_items() {
        assert_eq!(string_items("a", "e", false), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(string_items("a", "c", true), vec!["a", "b"]);
        assert_eq!(string_items("y", "ab", false), vec!["y", "z", "aa", "ab"]);
        assert!(string_items("e", "a", false).is_empty());
    }

    #[test]
    fn test_expansion() {
        assert_eq!(eval("(1..4).to_a"), "[1, 2, 3, 4]");
        assert_eq!(eval("(1...4).to_a"), "[1, 2, 3]");
        assert_eq!(eval("(5..1).to_a"), "[]");
        assert_eq!(eval("('a'..'c').to_a"), "[\"a\", \"b\", \"c\"]");
        assert_eq!(eval("(1..10).step(3).to_a"), "[1, 4, 7, 10]");
    }

    #[test]
    fn test_borrowed_array_methods() {
        assert_eq!(eval("(1..5).map { |i| i * i }"), "[1, 4, 9, 16, 25]");
        assert_eq!(eval("(1..10).select(&:even?)"), "[2, 4, 6, 8, 10]");
        assert_eq!(eval("(1..4).reduce(:*)"), "24");
    }

    #[test]
    fn test_queries() {
        assert_eq!(eval("(1..10).include?(5)"), "true");
        assert_eq!(eval("(1...10).include?(10)"), "false");
        assert_eq!(eval("(1..).include?(1000)"), "true");
        assert_eq!(eval("(1..100).sum"), "5050");
        assert_eq!(eval("(1..10).size"), "10");
        assert_eq!(eval("(1...1).min"), "nil");
        assert_eq!(eval("(1..3).first(2)"), "[1, 2]");
        assert_eq!(eval("(1..).first(3)"), "[1, 2, 3]");
    }

    #[test]
    fn test_inspect() {
        assert_eq!(eval("(1..3)"), "1..3");
        assert_eq!(eval("(1...3).to_s"), "\"1...3\"");
        assert_eq!(eval("('a'..'b')"), "\"a\"..\"b\"");
    }

    #[test]
    fn test_each_with_break() {
        assert_eq!(eval("(1..).each { |i| break i if i * i > 50 }"), "8");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            eval_err("(1..).to_a"),
            "cannot convert endless range to an array (RangeError)"
        );
        assert_eq!(eval_err("(1.0..2.0).to_a"), "can't iterate from Float (TypeError)");
        assert_eq!(eval_err("1..'a'"), "bad value for range (ArgumentError)");
    }
}
