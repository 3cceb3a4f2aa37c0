//! Array and the enumerable methods
//!
//! Ranges and hashes have no enumerable methods of their own beyond a
//! few; dispatch expands them to arrays and lands here. Iterating
//! methods work on a snapshot of the items, so a block may mutate the
//! array it walks.

use super::numeric::{arith, ordering_value, Arith};
use super::range::{clamp_slice, range_slice};
use super::{arg, array_ref, expect_int, expect_str, items_of, require_block};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, HashValue, Value};
use smallvec::smallvec;
use std::cmp::Ordering;

pub fn register(core: &CoreClasses) {
    let array = &core.array;
    array.define_singleton_native("new", array_new);
    array.define_singleton_native("[]", |_, _, args, _| Ok(Value::array(args.into_vec())));

    // ===== Access =====
    array.define_native("[]", array_aref);
    array.define_native("slice", array_aref);
    array.define_native("[]=", array_aset);
    array.define_native("at", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        let index = expect_int(exec, &args[0])?;
        Ok(at(&items_of(recv), index))
    });
    array.define_native("dig", array_dig);
    array.define_native("fetch", array_fetch);
    array.define_native("first", |exec, recv, args, _| take_end(exec, recv, &args, false));
    array.define_native("last", |exec, recv, args, _| take_end(exec, recv, &args, true));
    array.define_native("values_at", array_values_at);
    array.define_native("length", |_, recv, _, _| Ok(Value::Int(array_ref(recv).borrow().len() as i64)));
    array.define_native("size", |_, recv, _, _| Ok(Value::Int(array_ref(recv).borrow().len() as i64)));
    array.define_native("empty?", |_, recv, _, _| Ok(Value::Bool(array_ref(recv).borrow().is_empty())));
    array.define_native("include?", array_include);
    array.define_native("member?", array_include);
    array.define_native("index", array_index);
    array.define_native("find_index", array_index);
    array.define_native("rindex", array_rindex);
    array.define_native("assoc", array_assoc);

    // ===== Mutation =====
    array.define_native("push", array_push);
    array.define_native("append", array_push);
    array.define_native("<<", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        array_ref(recv).borrow_mut().push(args[0].clone());
        Ok(recv.clone())
    });
    array.define_native("pop", |exec, recv, args, _| remove_end(exec, recv, &args, true));
    array.define_native("shift", |exec, recv, args, _| remove_end(exec, recv, &args, false));
    array.define_native("unshift", array_unshift);
    array.define_native("prepend", array_unshift);
    array.define_native("insert", array_insert);
    array.define_native("concat", array_concat);
    array.define_native("delete", array_delete);
    array.define_native("delete_at", array_delete_at);
    array.define_native("delete_if", |exec, recv, _, block| retain(exec, recv, block, false, false));
    array.define_native("reject!", |exec, recv, _, block| retain(exec, recv, block, false, true));
    array.define_native("keep_if", |exec, recv, _, block| retain(exec, recv, block, true, false));
    array.define_native("select!", |exec, recv, _, block| retain(exec, recv, block, true, true));
    array.define_native("filter!", |exec, recv, _, block| retain(exec, recv, block, true, true));
    array.define_native("map!", array_map_bang);
    array.define_native("collect!", array_map_bang);
    array.define_native("clear", |_, recv, _, _| {
        array_ref(recv).borrow_mut().clear();
        Ok(recv.clone())
    });
    array.define_native("replace", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        let items = expect_array(exec, &args[0])?;
        *array_ref(recv).borrow_mut() = items;
        Ok(recv.clone())
    });
    array.define_native("fill", array_fill);
    array.define_native("compact!", |_, recv, _, _| {
        let cell = array_ref(recv);
        let before = cell.borrow().len();
        cell.borrow_mut().retain(|v| !v.is_nil());
        Ok(if cell.borrow().len() == before { Value::Nil } else { recv.clone() })
    });
    array.define_native("uniq!", array_uniq_bang);
    array.define_native("flatten!", array_flatten_bang);
    array.define_native("reverse!", |_, recv, _, _| {
        array_ref(recv).borrow_mut().reverse();
        Ok(recv.clone())
    });
    array.define_native("sort!", |exec, recv, _, block| {
        let sorted = sort_values(exec, items_of(recv), block.as_ref())?;
        *array_ref(recv).borrow_mut() = sorted;
        Ok(recv.clone())
    });
    array.define_native("sort_by!", |exec, recv, _, block| {
        let sorted = sort_by_key(exec, items_of(recv), block)?;
        *array_ref(recv).borrow_mut() = sorted;
        Ok(recv.clone())
    });

    // ===== Building =====
    array.define_native("+", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        let mut items = items_of(recv);
        items.extend(expect_array(exec, &args[0])?);
        Ok(Value::array(items))
    });
    array.define_native("-", array_minus);
    array.define_native("*", array_times);
    array.define_native("&", array_and);
    array.define_native("|", array_or);
    array.define_native("reverse", |_, recv, _, _| {
        Ok(Value::array(items_of(recv).into_iter().rev().collect()))
    });
    array.define_native("rotate", array_rotate);
    array.define_native("compact", |_, recv, _, _| {
        Ok(Value::array(items_of(recv).into_iter().filter(|v| !v.is_nil()).collect()))
    });
    array.define_native("uniq", |exec, recv, _, block| Ok(Value::array(uniq(exec, items_of(recv), block)?)));
    array.define_native("flatten", array_flatten);
    array.define_native("take", array_take);
    array.define_native("drop", array_drop);
    array.define_native("take_while", |exec, recv, _, block| take_while(exec, recv, block, true));
    array.define_native("drop_while", |exec, recv, _, block| take_while(exec, recv, block, false));
    array.define_native("zip", array_zip);
    array.define_native("product", array_product);
    array.define_native("transpose", array_transpose);
    array.define_native("each_slice", |exec, recv, args, block| windows(exec, recv, &args, block, true));
    array.define_native("each_cons", |exec, recv, args, block| windows(exec, recv, &args, block, false));

    // ===== Iteration =====
    array.define_native("each", array_each);
    array.define_native("each_entry", array_each);
    array.define_native("each_index", array_each_index);
    array.define_native("each_with_index", array_each_with_index);
    array.define_native("each_with_object", array_each_with_object);
    array.define_native("reverse_each", array_reverse_each);
    array.define_native("cycle", array_cycle);
    array.define_native("map", array_map);
    array.define_native("collect", array_map);
    array.define_native("flat_map", array_flat_map);
    array.define_native("collect_concat", array_flat_map);
    array.define_native("filter_map", array_filter_map);
    array.define_native("select", |exec, recv, _, block| filter(exec, recv, block, true));
    array.define_native("filter", |exec, recv, _, block| filter(exec, recv, block, true));
    array.define_native("find_all", |exec, recv, _, block| filter(exec, recv, block, true));
    array.define_native("reject", |exec, recv, _, block| filter(exec, recv, block, false));
    array.define_native("partition", array_partition);
    array.define_native("find", array_find);
    array.define_native("detect", array_find);
    array.define_native("group_by", array_group_by);
    array.define_native("tally", array_tally);
    array.define_native("all?", |exec, recv, args, block| quantify(exec, recv, &args, block, Quantifier::All));
    array.define_native("any?", |exec, recv, args, block| quantify(exec, recv, &args, block, Quantifier::Any));
    array.define_native("none?", |exec, recv, args, block| quantify(exec, recv, &args, block, Quantifier::None));
    array.define_native("one?", |exec, recv, args, block| quantify(exec, recv, &args, block, Quantifier::One));
    array.define_native("count", array_count);
    array.define_native("inject", array_inject);
    array.define_native("reduce", array_inject);
    array.define_native("sum", array_sum);

    // ===== Ordering =====
    array.define_native("sort", |exec, recv, _, block| {
        Ok(Value::array(sort_values(exec, items_of(recv), block.as_ref())?))
    });
    array.define_native("sort_by", |exec, recv, _, block| {
        Ok(Value::array(sort_by_key(exec, items_of(recv), block)?))
    });
    array.define_native("min", |exec, recv, args, block| extreme(exec, recv, &args, block, Ordering::Less));
    array.define_native("max", |exec, recv, args, block| extreme(exec, recv, &args, block, Ordering::Greater));
    array.define_native("min_by", |exec, recv, _, block| extreme_by(exec, recv, block, Ordering::Less));
    array.define_native("max_by", |exec, recv, _, block| extreme_by(exec, recv, block, Ordering::Greater));
    array.define_native("minmax", |exec, recv, _, _| {
        let sorted = sort_values(exec, items_of(recv), None)?;
        Ok(Value::array(vec![
            sorted.first().cloned().unwrap_or_default(),
            sorted.last().cloned().unwrap_or_default(),
        ]))
    });

    // ===== Conversion =====
    array.define_native("==", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(Value::Bool(exec.equals(recv, &args[0])?))
    });
    array.define_native("eql?", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(Value::Bool(exec.equals(recv, &args[0])?))
    });
    array.define_native("<=>", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(exec.compare(recv, &args[0])?.map(ordering_value).unwrap_or_default())
    });
    array.define_native("to_a", |_, recv, _, _| Ok(recv.clone()));
    array.define_native("to_ary", |_, recv, _, _| Ok(recv.clone()));
    array.define_native("entries", |_, recv, _, _| Ok(recv.clone()));
    array.define_native("to_h", array_to_h);
    array.define_native("join", array_join);
    array.define_native("inspect", array_inspect);
    array.define_native("to_s", array_inspect);
}

// =============================================================================
// Helpers
// =============================================================================

/// Items of an array argument
fn expect_array(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        other => {
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("no implicit conversion of {} into Array", class.name))
        }
    }
}

fn at(
    items: &[Value],
    index: i64,
) -> Value {
    let len = items.len() as i64;
    let index = if index < 0 { index + len } else { index };
    if index < 0 || index >= len {
        return Value::Nil;
    }
    items[index as usize].clone()
}

fn yield_truthy(
    exec: &mut Exec<'_>,
    block: &Value,
    item: &Value,
) -> EvalResult<bool> {
    Ok(exec.call_block(block, smallvec![item.clone()])?.truthy())
}

/// Membership by `==`
fn contains(
    exec: &mut Exec<'_>,
    items: &[Value],
    value: &Value,
) -> EvalResult<bool> {
    for item in items {
        if exec.equals(item, value)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Merge sort over a fallible comparison. Ties keep their order.
fn merge_sort(
    exec: &mut Exec<'_>,
    items: Vec<Value>,
    cmp: &mut dyn FnMut(&mut Exec<'_>, &Value, &Value) -> EvalResult<Ordering>,
) -> EvalResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(exec, left, cmp)?;
    let right = merge_sort(exec, right, cmp)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if cmp(exec, a, b)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Interpret a `<=>`-style block result.
fn block_ordering(
    exec: &mut Exec<'_>,
    result: &Value,
    a: &Value,
    b: &Value,
) -> EvalResult<Ordering> {
    match result {
        Value::Int(n) => Ok(n.cmp(&0)),
        Value::Float(x) => Ok(x.partial_cmp(&0.0).unwrap_or(Ordering::Equal)),
        _ => {
            let left = exec.class_of(a).name.clone();
            let right = exec.class_of(b).name.clone();
            exec.raise("ArgumentError", format!("comparison of {} with {} failed", left, right))
        }
    }
}

fn sort_values(
    exec: &mut Exec<'_>,
    items: Vec<Value>,
    block: Option<&Value>,
) -> EvalResult<Vec<Value>> {
    match block {
        Some(block) => merge_sort(exec, items, &mut |exec, a, b| {
            let result = exec.call_block(block, smallvec![a.clone(), b.clone()])?;
            block_ordering(exec, &result, a, b)
        }),
        None => merge_sort(exec, items, &mut |exec, a, b| exec.compare_strict(a, b)),
    }
}

fn sort_by_key(
    exec: &mut Exec<'_>,
    items: Vec<Value>,
    block: Option<Value>,
) -> EvalResult<Vec<Value>> {
    let block = require_block(exec, block)?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let key = exec.call_block(&block, smallvec![item.clone()])?;
        keyed.push(Value::array(vec![key, item]));
    }
    let sorted = merge_sort(exec, keyed, &mut |exec, a, b| {
        let (a, b) = (items_of(a), items_of(b));
        exec.compare_strict(&a[0], &b[0])
    })?;
    Ok(sorted.iter().map(|pair| items_of(pair)[1].clone()).collect())
}

fn uniq(
    exec: &mut Exec<'_>,
    items: Vec<Value>,
    block: Option<Value>,
) -> EvalResult<Vec<Value>> {
    let mut seen = HashValue::new();
    let mut out = Vec::new();
    for item in items {
        let key = match &block {
            Some(block) => exec.call_block(block, smallvec![item.clone()])?,
            None => item.clone(),
        };
        if !seen.contains_key(&key) {
            seen.insert(key, Value::Bool(true));
            out.push(item);
        }
    }
    Ok(out)
}

fn flatten_into(
    exec: &mut Exec<'_>,
    value: &Value,
    depth: i64,
    out: &mut Vec<Value>,
) -> EvalResult<()> {
    if !exec.enter_inspect(value) {
        return exec.raise("ArgumentError", "tried to flatten recursive array");
    }
    let result = (|| {
        for item in items_of(value) {
            if matches!(item, Value::Array(_)) && depth != 0 {
                flatten_into(exec, &item, depth - 1, out)?;
            } else {
                out.push(item);
            }
        }
        Ok(())
    })();
    exec.leave_inspect(value);
    result
}

// =============================================================================
// Access
// =============================================================================

/// `Array.new(size = 0, default = nil)` or `Array.new(size) { |i| ... }`
fn array_new(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(2))?;
    if let Some(Value::Array(items)) = args.first() {
        return Ok(Value::array(items.borrow().clone()));
    }
    let size = match args.first() {
        Some(size) => expect_int(exec, size)?,
        None => 0,
    };
    if size < 0 {
        return exec.raise("ArgumentError", "negative array size");
    }
    if size > super::range::MAX_ITEMS {
        return exec.raise("ArgumentError", "array size too big");
    }
    let mut items = Vec::with_capacity(size as usize);
    for i in 0..size {
        let item = match &block {
            Some(block) => exec.call_block(block, smallvec![Value::Int(i)])?,
            None => arg(&args, 1),
        };
        items.push(item);
    }
    Ok(Value::array(items))
}

fn array_aref(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let items = items_of(recv);
    match (&args[0], args.get(1)) {
        (Value::Int(i), None) => Ok(at(&items, *i)),
        (Value::Int(i), Some(len)) => {
            let len = expect_int(exec, len)?;
            Ok(match clamp_slice(items.len(), *i, len) {
                Some((start, count)) => Value::array(items[start..start + count].to_vec()),
                None => Value::Nil,
            })
        }
        (Value::Range(r), None) => Ok(match range_slice(exec, r, items.len())? {
            Some((start, count)) => Value::array(items[start..start + count].to_vec()),
            None => Value::Nil,
        }),
        (Value::Float(x), None) => Ok(at(&items, x.trunc() as i64)),
        (other, _) => expect_int(exec, other).map(|_| Value::Nil),
    }
}

fn array_aset(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(3))?;
    let value = args[args.len() - 1].clone();
    let cell = array_ref(recv);
    let len = cell.borrow().len() as i64;
    let (start, count, replacement) = match (&args[0], args.len()) {
        (Value::Int(index), 2) => {
            let at = if *index < 0 { index + len } else { *index };
            if at < 0 {
                return exec.raise(
                    "IndexError",
                    format!("index {} too small for array; minimum: -{}", index, len),
                );
            }
            (at, 1i64.min((len - at).max(0)), vec![value.clone()])
        }
        (Value::Int(index), _) => {
            let count = expect_int(exec, &args[1])?;
            let at = if *index < 0 { index + len } else { *index };
            if at < 0 {
                return exec.raise(
                    "IndexError",
                    format!("index {} too small for array; minimum: -{}", index, len),
                );
            }
            if count < 0 {
                return exec.raise("IndexError", format!("negative length ({})", count));
            }
            let replacement = value.array_items().unwrap_or_else(|| vec![value.clone()]);
            (at, count.min((len - at).max(0)), replacement)
        }
        (Value::Range(r), 2) => {
            let start = match &r.start {
                Value::Nil => 0,
                other => expect_int(exec, other)?,
            };
            let at = if start < 0 { start + len } else { start };
            if at < 0 {
                let shown = exec.inspect_or_fallback(&args[0])?;
                return exec.raise("RangeError", format!("{} out of range", shown));
            }
            let count = match range_slice(exec, r, len.max(at) as usize)? {
                Some((_, count)) => count as i64,
                None => 0,
            };
            let replacement = value.array_items().unwrap_or_else(|| vec![value.clone()]);
            (at, count.min((len - at).max(0)), replacement)
        }
        (other, _) => {
            expect_int(exec, other)?;
            return Ok(value);
        }
    };
    let mut items = cell.borrow_mut();
    if start > len {
        items.resize(start as usize, Value::Nil);
    }
    let start = start as usize;
    items.splice(start..start + count as usize, replacement);
    Ok(value)
}

fn array_dig(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let mut current = recv.clone();
    for key in &args {
        if current.is_nil() {
            return Ok(Value::Nil);
        }
        current = exec.call_method(&current, "[]", smallvec![key.clone()], None)?;
    }
    Ok(current)
}

fn array_fetch(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let index = expect_int(exec, &args[0])?;
    let items = items_of(recv);
    let len = items.len() as i64;
    let at = if index < 0 { index + len } else { index };
    if at >= 0 && at < len {
        return Ok(items[at as usize].clone());
    }
    if let Some(block) = block {
        return exec.call_block(&block, smallvec![args[0].clone()]);
    }
    if let Some(default) = args.get(1) {
        return Ok(default.clone());
    }
    exec.raise(
        "IndexError",
        format!("index {} outside of array bounds: {}...{}", index, -len, len),
    )
}

/// `first`/`last`, with or without a count
fn take_end(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    from_end: bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let items = items_of(recv);
    let Some(count) = args.first() else {
        let item = if from_end { items.last() } else { items.first() };
        return Ok(item.cloned().unwrap_or_default());
    };
    let count = expect_int(exec, count)?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative array size");
    }
    let count = (count as usize).min(items.len());
    let slice = if from_end {
        &items[items.len() - count..]
    } else {
        &items[..count]
    };
    Ok(Value::array(slice.to_vec()))
}

fn array_values_at(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let items = items_of(recv);
    let mut out = Vec::with_capacity(args.len());
    for index in &args {
        out.push(at(&items, expect_int(exec, index)?));
    }
    Ok(Value::array(out))
}

fn array_include(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(contains(exec, &items_of(recv), &args[0])?))
}

fn array_index(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    for (i, item) in items_of(recv).iter().enumerate() {
        let hit = match (args.first(), &block) {
            (Some(value), _) => exec.equals(item, value)?,
            (None, Some(block)) => yield_truthy(exec, block, item)?,
            (None, None) => return Ok(Value::Nil),
        };
        if hit {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Nil)
}

fn array_rindex(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    for (i, item) in items_of(recv).iter().enumerate().rev() {
        let hit = match (args.first(), &block) {
            (Some(value), _) => exec.equals(item, value)?,
            (None, Some(block)) => yield_truthy(exec, block, item)?,
            (None, None) => return Ok(Value::Nil),
        };
        if hit {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Nil)
}

fn array_assoc(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    for item in items_of(recv) {
        if let Some(pair) = item.array_items() {
            if let Some(key) = pair.first() {
                if exec.equals(key, &args[0])? {
                    return Ok(item);
                }
            }
        }
    }
    Ok(Value::Nil)
}

// =============================================================================
// Mutation
// =============================================================================

fn array_push(
    _exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    array_ref(recv).borrow_mut().extend(args);
    Ok(recv.clone())
}

/// `pop`/`shift`: one item, or an array of up to `n`.
fn remove_end(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    from_end: bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let cell = array_ref(recv);
    let Some(count) = args.first() else {
        let mut items = cell.borrow_mut();
        let item = if from_end {
            items.pop()
        } else if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        };
        return Ok(item.unwrap_or_default());
    };
    let count = expect_int(exec, count)?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative array size");
    }
    let mut items = cell.borrow_mut();
    let count = (count as usize).min(items.len());
    let removed: Vec<Value> = if from_end {
        let at = items.len() - count;
        items.split_off(at)
    } else {
        items.drain(..count).collect()
    };
    Ok(Value::array(removed))
}

fn array_unshift(
    _exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    array_ref(recv).borrow_mut().splice(0..0, args);
    Ok(recv.clone())
}

fn array_insert(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let index = expect_int(exec, &args[0])?;
    let cell = array_ref(recv);
    let len = cell.borrow().len() as i64;
    // negative indexes insert after the element
    let at = if index < 0 { index + len + 1 } else { index };
    if at < 0 {
        return exec.raise(
            "IndexError",
            format!("index {} too small for array; minimum: -{}", index, len + 1),
        );
    }
    let mut items = cell.borrow_mut();
    if at > len {
        items.resize(at as usize, Value::Nil);
    }
    let at = at as usize;
    items.splice(at..at, args.into_iter().skip(1));
    drop(items);
    Ok(recv.clone())
}

fn array_concat(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut added = Vec::new();
    for other in &args {
        added.extend(expect_array(exec, other)?);
    }
    array_ref(recv).borrow_mut().extend(added);
    Ok(recv.clone())
}

/// Remove every element `==` to the argument; returns it, or `nil`.
fn array_delete(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let mut kept = Vec::new();
    let mut found = None;
    for item in items_of(recv) {
        if exec.equals(&item, &args[0])? {
            found = Some(item);
        } else {
            kept.push(item);
        }
    }
    let Some(found) = found else {
        return match block {
            Some(block) => exec.call_block(&block, smallvec![args[0].clone()]),
            None => Ok(Value::Nil),
        };
    };
    *array_ref(recv).borrow_mut() = kept;
    Ok(found)
}

fn array_delete_at(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let index = expect_int(exec, &args[0])?;
    let cell = array_ref(recv);
    let len = cell.borrow().len() as i64;
    let at = if index < 0 { index + len } else { index };
    if at < 0 || at >= len {
        return Ok(Value::Nil);
    }
    let removed = cell.borrow_mut().remove(at as usize);
    Ok(removed)
}

/// Keep the items whose block result is `keep`. The `strict` forms
/// return `nil` when nothing was removed.
fn retain(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    keep: bool,
    strict: bool,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let items = items_of(recv);
    let before = items.len();
    let mut kept = Vec::with_capacity(before);
    for item in items {
        if yield_truthy(exec, &block, &item)? == keep {
            kept.push(item);
        }
    }
    let changed = kept.len() != before;
    *array_ref(recv).borrow_mut() = kept;
    Ok(if strict && !changed { Value::Nil } else { recv.clone() })
}

fn array_map_bang(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut mapped = Vec::new();
    for item in items_of(recv) {
        mapped.push(exec.call_block(&block, smallvec![item])?);
    }
    *array_ref(recv).borrow_mut() = mapped;
    Ok(recv.clone())
}

fn array_fill(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let cell = array_ref(recv);
    let len = cell.borrow().len();
    match block {
        Some(block) => {
            exec.check_args(args.len(), 0, Some(0))?;
            for i in 0..len {
                let value = exec.call_block(&block, smallvec![Value::Int(i as i64)])?;
                if let Some(slot) = cell.borrow_mut().get_mut(i) {
                    *slot = value;
                }
            }
        }
        None => {
            exec.check_args(args.len(), 1, Some(1))?;
            for slot in cell.borrow_mut().iter_mut() {
                *slot = args[0].clone();
            }
        }
    }
    Ok(recv.clone())
}

fn array_uniq_bang(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let items = items_of(recv);
    let before = items.len();
    let unique = uniq(exec, items, block)?;
    let changed = unique.len() != before;
    *array_ref(recv).borrow_mut() = unique;
    Ok(if changed { recv.clone() } else { Value::Nil })
}

fn flatten_depth(
    exec: &Exec<'_>,
    args: &Args,
) -> EvalResult<i64> {
    exec.check_args(args.len(), 0, Some(1))?;
    match args.first() {
        Some(Value::Nil) | None => Ok(-1),
        Some(depth) => expect_int(exec, depth),
    }
}

fn array_flatten(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let depth = flatten_depth(exec, &args)?;
    let mut out = Vec::new();
    flatten_into(exec, recv, depth, &mut out)?;
    Ok(Value::array(out))
}

fn array_flatten_bang(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let depth = flatten_depth(exec, &args)?;
    let had_nested = items_of(recv).iter().any(|v| matches!(v, Value::Array(_)));
    let mut out = Vec::new();
    flatten_into(exec, recv, depth, &mut out)?;
    *array_ref(recv).borrow_mut() = out;
    Ok(if had_nested { recv.clone() } else { Value::Nil })
}

// =============================================================================
// Building
// =============================================================================

fn array_minus(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let removed = expect_array(exec, &args[0])?;
    let mut out = Vec::new();
    for item in items_of(recv) {
        if !contains(exec, &removed, &item)? {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

fn array_times(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    if let Value::Str(_) = &args[0] {
        return array_join(exec, recv, args, None);
    }
    let count = expect_int(exec, &args[0])?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative argument");
    }
    let items = items_of(recv);
    if (items.len() as i64).saturating_mul(count) > super::range::MAX_ITEMS {
        return exec.raise("ArgumentError", "argument too big");
    }
    let mut repeated = Vec::with_capacity(items.len() * count as usize);
    for _ in 0..count {
        repeated.extend(items.iter().cloned());
    }
    Ok(Value::array(repeated))
}

fn array_and(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let other = expect_array(exec, &args[0])?;
    let mut out = Vec::new();
    for item in uniq(exec, items_of(recv), None)? {
        if contains(exec, &other, &item)? {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

fn array_or(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let mut items = items_of(recv);
    items.extend(expect_array(exec, &args[0])?);
    Ok(Value::array(uniq(exec, items, None)?))
}

fn array_rotate(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let by = match args.first() {
        Some(by) => expect_int(exec, by)?,
        None => 1,
    };
    let mut items = items_of(recv);
    if !items.is_empty() {
        let shift = by.rem_euclid(items.len() as i64) as usize;
        items.rotate_left(shift);
    }
    Ok(Value::array(items))
}

fn array_take(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let count = expect_int(exec, &args[0])?;
    if count < 0 {
        return exec.raise("ArgumentError", "attempt to take negative size");
    }
    Ok(Value::array(items_of(recv).into_iter().take(count as usize).collect()))
}

fn array_drop(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let count = expect_int(exec, &args[0])?;
    if count < 0 {
        return exec.raise("ArgumentError", "attempt to drop negative size");
    }
    Ok(Value::array(items_of(recv).into_iter().skip(count as usize).collect()))
}

fn take_while(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    take: bool,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let items = items_of(recv);
    let mut split = items.len();
    for (i, item) in items.iter().enumerate() {
        if !yield_truthy(exec, &block, item)? {
            split = i;
            break;
        }
    }
    let part = if take { &items[..split] } else { &items[split..] };
    Ok(Value::array(part.to_vec()))
}

fn array_zip(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let mut others = Vec::with_capacity(args.len());
    for other in &args {
        let items = match other {
            Value::Range(r) => super::range::items(exec, r)?,
            other => expect_array(exec, other)?,
        };
        others.push(items);
    }
    let mut rows = Vec::new();
    for (i, item) in items_of(recv).into_iter().enumerate() {
        let mut row = vec![item];
        row.extend(others.iter().map(|other| other.get(i).cloned().unwrap_or_default()));
        rows.push(Value::array(row));
    }
    match block {
        Some(block) => {
            for row in rows {
                exec.call_block(&block, smallvec![row])?;
            }
            Ok(Value::Nil)
        }
        None => Ok(Value::array(rows)),
    }
}

fn array_product(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut rows: Vec<Vec<Value>> = items_of(recv).into_iter().map(|v| vec![v]).collect();
    for other in &args {
        let other = expect_array(exec, other)?;
        let mut next = Vec::with_capacity(rows.len() * other.len());
        for row in &rows {
            for item in &other {
                let mut extended = row.clone();
                extended.push(item.clone());
                next.push(extended);
            }
        }
        if next.len() as i64 > super::range::MAX_ITEMS {
            return exec.raise("RangeError", "too big to product");
        }
        rows = next;
    }
    Ok(Value::array(rows.into_iter().map(Value::array).collect()))
}

fn array_transpose(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut rows = Vec::new();
    for row in items_of(recv) {
        rows.push(expect_array(exec, &row)?);
    }
    let width = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return exec.raise(
            "IndexError",
            format!("element size differs ({} should be {})", row.len(), width),
        );
    }
    let columns = (0..width)
        .map(|i| Value::array(rows.iter().map(|row| row[i].clone()).collect()))
        .collect();
    Ok(Value::array(columns))
}

/// `each_slice(n)` (disjoint) and `each_cons(n)` (overlapping)
fn windows(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    block: Option<Value>,
    disjoint: bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let size = expect_int(exec, &args[0])?;
    if size <= 0 {
        let what = if disjoint { "slice" } else { "cons" };
        return exec.raise("ArgumentError", format!("invalid {} size", what));
    }
    let items = items_of(recv);
    let size = size as usize;
    let groups: Vec<Value> = if disjoint {
        items.chunks(size).map(|c| Value::array(c.to_vec())).collect()
    } else {
        items.windows(size).map(|w| Value::array(w.to_vec())).collect()
    };
    match block {
        Some(block) => {
            for group in groups {
                exec.call_block(&block, smallvec![group])?;
            }
            Ok(recv.clone())
        }
        None => Ok(Value::array(groups)),
    }
}

// =============================================================================
// Iteration
// =============================================================================

fn array_each(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let Some(block) = block else {
        return Ok(recv.clone());
    };
    let cell = array_ref(recv);
    // re-read the length each step so pushes during iteration are seen
    let mut i = 0;
    loop {
        let item = match cell.borrow().get(i) {
            Some(item) => item.clone(),
            None => break,
        };
        exec.call_block(&block, smallvec![item])?;
        i += 1;
    }
    Ok(recv.clone())
}

fn array_each_index(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    for i in 0..items_of(recv).len() {
        exec.call_block(&block, smallvec![Value::Int(i as i64)])?;
    }
    Ok(recv.clone())
}

fn array_each_with_index(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let items = items_of(recv);
    let Some(block) = block else {
        let pairs = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Value::array(vec![item, Value::Int(i as i64)]))
            .collect();
        return Ok(Value::array(pairs));
    };
    for (i, item) in items.into_iter().enumerate() {
        exec.call_block(&block, smallvec![item, Value::Int(i as i64)])?;
    }
    Ok(recv.clone())
}

fn array_each_with_object(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let block = require_block(exec, block)?;
    let memo = args[0].clone();
    for item in items_of(recv) {
        exec.call_block(&block, smallvec![item, memo.clone()])?;
    }
    Ok(memo)
}

fn array_reverse_each(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    for item in items_of(recv).into_iter().rev() {
        exec.call_block(&block, smallvec![item])?;
    }
    Ok(recv.clone())
}

/// `cycle(n)`; without a count it runs until the block breaks.
fn array_cycle(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let block = require_block(exec, block)?;
    let rounds = match args.first() {
        Some(Value::Nil) | None => None,
        Some(n) => Some(expect_int(exec, n)?),
    };
    let items = items_of(recv);
    if items.is_empty() {
        return Ok(Value::Nil);
    }
    let mut round = 0;
    while rounds.map_or(true, |n| round < n) {
        for item in &items {
            exec.call_block(&block, smallvec![item.clone()])?;
        }
        round += 1;
    }
    Ok(Value::Nil)
}

fn array_map(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let Some(block) = block else {
        return Ok(Value::array(items_of(recv)));
    };
    let items = items_of(recv);
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(exec.call_block(&block, smallvec![item])?);
    }
    Ok(Value::array(out))
}

fn array_flat_map(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut out = Vec::new();
    for item in items_of(recv) {
        match exec.call_block(&block, smallvec![item])? {
            Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
            other => out.push(other),
        }
    }
    Ok(Value::array(out))
}

fn array_filter_map(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut out = Vec::new();
    for item in items_of(recv) {
        let value = exec.call_block(&block, smallvec![item])?;
        if value.truthy() {
            out.push(value);
        }
    }
    Ok(Value::array(out))
}

fn filter(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    keep: bool,
) -> EvalResult<Value> {
    let Some(block) = block else {
        return Ok(Value::array(items_of(recv)));
    };
    let mut out = Vec::new();
    for item in items_of(recv) {
        if yield_truthy(exec, &block, &item)? == keep {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

fn array_partition(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let (mut yes, mut no) = (Vec::new(), Vec::new());
    for item in items_of(recv) {
        if yield_truthy(exec, &block, &item)? {
            yes.push(item);
        } else {
            no.push(item);
        }
    }
    Ok(Value::array(vec![Value::array(yes), Value::array(no)]))
}

fn array_find(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    for item in items_of(recv) {
        if yield_truthy(exec, &block, &item)? {
            return Ok(item);
        }
    }
    Ok(Value::Nil)
}

fn array_group_by(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut groups = HashValue::new();
    for item in items_of(recv) {
        let key = exec.call_block(&block, smallvec![item.clone()])?;
        match groups.get(&key) {
            Some(group) => array_ref(group).borrow_mut().push(item),
            None => groups.insert(key, Value::array(vec![item])),
        }
    }
    Ok(Value::hash(groups))
}

fn array_tally(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut counts = HashValue::new();
    for item in items_of(recv) {
        let count = counts.get(&item).and_then(Value::as_int).unwrap_or(0);
        counts.insert(item, Value::Int(count + 1));
    }
    Ok(Value::hash(counts))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    All,
    Any,
    None,
    One,
}

/// `all?`/`any?`/`none?`/`one?` with a block, a `===` pattern, or
/// plain truthiness.
fn quantify(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    block: Option<Value>,
    quantifier: Quantifier,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let mut hits = 0;
    let items = items_of(recv);
    let total = items.len();
    for item in items {
        let hit = match (args.first(), &block) {
            (Some(pattern), _) => exec.case_eq(pattern, &item)?,
            (None, Some(block)) => yield_truthy(exec, block, &item)?,
            (None, None) => item.truthy(),
        };
        if hit {
            hits += 1;
        }
        let decided = match quantifier {
            Quantifier::All => !hit,
            Quantifier::Any => hit,
            Quantifier::None => hit,
            Quantifier::One => hits > 1,
        };
        if decided {
            break;
        }
    }
    Ok(Value::Bool(match quantifier {
        Quantifier::All => hits == total,
        Quantifier::Any => hits > 0,
        Quantifier::None => hits == 0,
        Quantifier::One => hits == 1,
    }))
}

fn array_count(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let items = items_of(recv);
    let mut count = 0;
    for item in &items {
        let hit = match (args.first(), &block) {
            (Some(value), _) => exec.equals(item, value)?,
            (None, Some(block)) => yield_truthy(exec, block, item)?,
            (None, None) => true,
        };
        if hit {
            count += 1;
        }
    }
    Ok(Value::Int(count))
}

/// `inject(init) { |memo, x| }`, `inject(:sym)` or `inject(init, :sym)`
fn array_inject(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(2))?;
    let (initial, operator) = match (args.first(), args.get(1), &block) {
        (Some(init), Some(Value::Sym(op)), _) => (Some(init.clone()), Some(op.clone())),
        (Some(Value::Sym(op)), None, None) => (None, Some(op.clone())),
        (Some(init), None, _) => (Some(init.clone()), None),
        _ => (None, None),
    };
    let mut items = items_of(recv).into_iter();
    let Some(mut memo) = initial.or_else(|| items.next()) else {
        return Ok(Value::Nil);
    };
    for item in items {
        memo = match &operator {
            Some(op) => exec.call_method(&memo, op, smallvec![item], None)?,
            None => {
                let block = require_block(exec, block.clone())?;
                exec.call_block(&block, smallvec![memo, item])?
            }
        };
    }
    Ok(memo)
}

fn array_sum(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let mut total = args.first().cloned().unwrap_or(Value::Int(0));
    for item in items_of(recv) {
        let item = match &block {
            Some(block) => exec.call_block(block, smallvec![item])?,
            None => item,
        };
        total = match (&total, &item) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                arith(exec, Arith::Add, &total, &item)?
            }
            _ => exec.call_method(&total, "+", smallvec![item], None)?,
        };
    }
    Ok(total)
}

// =============================================================================
// Ordering
// =============================================================================

/// `min`/`max`, optionally with a comparison block or a count
fn extreme(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    block: Option<Value>,
    want: Ordering,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let mut sorted = sort_values(exec, items_of(recv), block.as_ref())?;
    if want == Ordering::Greater {
        sorted.reverse();
    }
    match args.first() {
        Some(count) => {
            let count = expect_int(exec, count)?.max(0) as usize;
            Ok(Value::array(sorted.into_iter().take(count).collect()))
        }
        None => Ok(sorted.into_iter().next().unwrap_or_default()),
    }
}

fn extreme_by(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    want: Ordering,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut best: Option<(Value, Value)> = None;
    for item in items_of(recv) {
        let key = exec.call_block(&block, smallvec![item.clone()])?;
        let better = match &best {
            None => true,
            Some((best_key, _)) => exec.compare_strict(&key, best_key)? == want,
        };
        if better {
            best = Some((key, item));
        }
    }
    Ok(best.map(|(_, item)| item).unwrap_or_default())
}

// =============================================================================
// Conversion
// =============================================================================

fn array_to_h(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let mut hash = HashValue::new();
    for item in items_of(recv) {
        let pair = match &block {
            Some(block) => exec.call_block(block, smallvec![item])?,
            None => item,
        };
        match pair.array_items() {
            Some(pair) if pair.len() == 2 => hash.insert(pair[0].clone(), pair[1].clone()),
            _ => {
                let class = exec.class_of(&pair);
                return exec.raise(
                    "TypeError",
                    format!("wrong element type {} (expected array)", class.name),
                );
            }
        }
    }
    Ok(Value::hash(hash))
}

fn join_into(
    exec: &mut Exec<'_>,
    value: &Value,
    separator: &str,
    out: &mut Vec<String>,
) -> EvalResult<()> {
    if !exec.enter_inspect(value) {
        return exec.raise("ArgumentError", "recursive array join");
    }
    let result = (|| {
        for item in items_of(value) {
            match &item {
                Value::Array(_) => {
                    let mut nested = Vec::new();
                    join_into(exec, &item, separator, &mut nested)?;
                    out.push(nested.join(separator));
                }
                other => out.push(exec.to_s(other)?),
            }
        }
        Ok(())
    })();
    exec.leave_inspect(value);
    result
}

fn array_join(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let separator = match args.first() {
        Some(Value::Nil) | None => String::new(),
        Some(separator) => expect_str(exec, separator)?,
    };
    let mut parts = Vec::new();
    join_into(exec, recv, &separator, &mut parts)?;
    Ok(Value::str(parts.join(&separator)))
}

/// `[1, "a", :b]`; an array that contains itself prints as `[...]`.
fn array_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    if !exec.enter_inspect(recv) {
        return Ok(Value::str("[...]"));
    }
    let mut parts = Vec::new();
    for item in items_of(recv) {
        match exec.inspect_or_fallback(&item) {
            Ok(text) => parts.push(text),
            Err(unwind) => {
                exec.leave_inspect(recv);
                return Err(unwind);
            }
        }
    }
    exec.leave_inspect(recv);
    Ok(Value::str(format!("[{}]", parts.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err, eval_output};

    #[test]
    fn test_clamped_at() {
        let items = vec![Value::Int(1), Value::Int(2)];
        assert_eq!(at(&items, -1).as_int(), Some(2));
        assert!(at(&items, 2).is_nil());
        assert!(at(&items, -3).is_nil());
    }

    #[test]
    fn test_construction() {
        assert_eq!(eval("Array.new(3)"), "[nil, nil, nil]");
        assert_eq!(eval("Array.new(2, 0)"), "[0, 0]");
        assert_eq!(eval("Array.new(3) { |i| i * i }"), "[0, 1, 4]");
        assert_eq!(eval_err("Array.new(-1)"), "negative array size (ArgumentError)");
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval("[1, 2, 3][-1]"), "3");
        assert_eq!(eval("[1, 2, 3][5]"), "nil");
        assert_eq!(eval("[1, 2, 3, 4][1, 2]"), "[2, 3]");
        assert_eq!(eval("[1, 2, 3, 4][1..]"), "[2, 3, 4]");
        assert_eq!(eval("[1, 2, 3][3, 1]"), "[]");
        assert_eq!(eval("[1, 2, 3][4, 1]"), "nil");
        assert_eq!(eval("a = [1]; a[3] = 4; a"), "[1, nil, nil, 4]");
        assert_eq!(eval("a = [1, 2, 3]; a[0, 2] = [9]; a"), "[9, 3]");
        assert_eq!(eval("a = [1, 2, 3]; a[1..] = 0; a"), "[1, 0]");
        assert_eq!(
            eval_err("a = [1]; a[-3] = 0"),
            "index -3 too small for array; minimum: -1 (IndexError)"
        );
        assert_eq!(
            eval_err("[1, 2].fetch(5)"),
            "index 5 outside of array bounds: -2...2 (IndexError)"
        );
        assert_eq!(eval("[[1, [2]]].dig(0, 1, 0)"), "2");
    }

    #[test]
    fn test_mutation() {
        assert_eq!(eval("a = [1]; a.push(2, 3); a << 4; a"), "[1, 2, 3, 4]");
        assert_eq!(eval("a = [1, 2, 3]; [a.pop, a.shift, a]"), "[3, 1, [2]]");
        assert_eq!(eval("a = [1, 2, 3]; a.pop(2)"), "[2, 3]");
        assert_eq!(eval("a = [2]; a.unshift(0, 1); a"), "[0, 1, 2]");
        assert_eq!(eval("a = [1, 2, 1]; [a.delete(1), a]"), "[1, [2]]");
        assert_eq!(eval("a = [1, 2, 3, 4]; a.delete_if(&:even?); a"), "[1, 3]");
        assert_eq!(eval("a = [1, 2]; a.select! { |x| x > 0 }"), "nil");
        assert_eq!(eval("a = [1, 2]; a.map! { |x| x * 10 }; a"), "[10, 20]");
        assert_eq!(eval("a = [3, 1, 2]; a.sort!; a"), "[1, 2, 3]");
        assert_eq!(eval("[1, 2].insert(-2, :x)"), "[1, :x, 2]");
    }

    #[test]
    fn test_building() {
        assert_eq!(eval("[1, 2] + [3]"), "[1, 2, 3]");
        assert_eq!(eval("[1, 2, 2, 3] - [2]"), "[1, 3]");
        assert_eq!(eval("[1, 2] * 2"), "[1, 2, 1, 2]");
        assert_eq!(eval("[1, 2] * ','"), "\"1,2\"");
        assert_eq!(eval("[1, 1, 2] & [1, 3]"), "[1]");
        assert_eq!(eval("[1, 2] | [2, 3]"), "[1, 2, 3]");
        assert_eq!(eval("[1, [2, [3, [4]]]].flatten"), "[1, 2, 3, 4]");
        assert_eq!(eval("[1, [2, [3]]].flatten(1)"), "[1, 2, [3]]");
        assert_eq!(eval("[1, 2, 3].rotate"), "[2, 3, 1]");
        assert_eq!(eval("[1, 2].zip([3, 4], [5])"), "[[1, 3, 5], [2, 4, nil]]");
        assert_eq!(eval("[1, 2].product([3, 4])"), "[[1, 3], [1, 4], [2, 3], [2, 4]]");
        assert_eq!(eval("[[1, 2], [3, 4]].transpose"), "[[1, 3], [2, 4]]");
        assert_eq!(eval("(1..5).each_slice(2).to_a"), "[[1, 2], [3, 4], [5]]");
        assert_eq!(eval("[1, 2, 3].each_cons(2).to_a"), "[[1, 2], [2, 3]]");
    }

    #[test]
    fn test_enumerable() {
        assert_eq!(eval("[1, 2, 3].map { |x| x * 2 }"), "[2, 4, 6]");
        assert_eq!(eval("[1, 2, 3, 4].select(&:even?)"), "[2, 4]");
        assert_eq!(eval("[1, 2, 3, 4].reject(&:even?)"), "[1, 3]");
        assert_eq!(eval("[1, 2, 3].find { |x| x > 1 }"), "2");
        assert_eq!(eval("[1, 2, 3].partition(&:odd?)"), "[[1, 3], [2]]");
        assert_eq!(eval("%w(a bb cc).group_by(&:size)"), "{1=>[\"a\"], 2=>[\"bb\", \"cc\"]}");
        assert_eq!(eval("%w(a b a).tally"), "{\"a\"=>2, \"b\"=>1}");
        assert_eq!(eval("[[1, 2], [3, 4]].map { |a, b| a + b }"), "[3, 7]");
        assert_eq!(eval("[1, 2].each_with_index.to_a"), "[[1, 0], [2, 1]]");
        assert_eq!(eval("[1, 2].each_with_object([]) { |x, acc| acc << x * 3 }"), "[3, 6]");
        assert_eq!(eval("[1, nil, 2, nil].compact"), "[1, 2]");
        assert_eq!(eval("[1, 2, 2, 3, 1].uniq"), "[1, 2, 3]");
        assert_eq!(eval("[1, 2, 3].filter_map { |x| x * 2 if x.odd? }"), "[2, 6]");
        assert_eq!(eval("[[1, 2], [3]].flat_map { |x| x }"), "[1, 2, 3]");
        assert_eq!(eval("[1, 2, 3, 4].take_while { |x| x < 3 }"), "[1, 2]");
    }

    #[test]
    fn test_predicates() {
        assert_eq!(eval("[1, 2].all? { |x| x > 0 }"), "true");
        assert_eq!(eval("[nil, 1].any?"), "true");
        assert_eq!(eval("[].none?"), "true");
        assert_eq!(eval("[1, 2, 3].one? { |x| x > 2 }"), "true");
        assert_eq!(eval("[1, 'a', :b].all?(Integer)"), "false");
        assert_eq!(eval("[1, 2, 1].count(1)"), "2");
        assert_eq!(eval("[1, 2, 3].count(&:odd?)"), "2");
        assert_eq!(eval("[1, 2].include?(2)"), "true");
        assert_eq!(eval("[1, 2, 3].index(3)"), "2");
    }

    #[test]
    fn test_reduce_and_sum() {
        assert_eq!(eval("[1, 2, 3].reduce(:+)"), "6");
        assert_eq!(eval("[1, 2, 3].inject(10) { |s, x| s + x }"), "16");
        assert_eq!(eval("[2, 3].inject(1, :*)"), "6");
        assert_eq!(eval("[].reduce(:+)"), "nil");
        assert_eq!(eval("[1, 2.5].sum"), "3.5");
        assert_eq!(eval("[[1], [2]].sum([])"), "[1, 2]");
        assert_eq!(eval("(1..4).sum { |x| x * x }"), "30");
    }

    #[test]
    fn test_ordering() {
        assert_eq!(eval("[3, 1, 2].sort"), "[1, 2, 3]");
        assert_eq!(eval("[3, 1, 2].sort { |a, b| b <=> a }"), "[3, 2, 1]");
        assert_eq!(eval("%w(ccc a bb).sort_by(&:size)"), "[\"a\", \"bb\", \"ccc\"]");
        assert_eq!(eval("[3, 1, 2].min"), "1");
        assert_eq!(eval("[3, 1, 2].max(2)"), "[3, 2]");
        assert_eq!(eval("%w(aa b ccc).max_by(&:size)"), "\"ccc\"");
        assert_eq!(eval("[].max"), "nil");
        assert_eq!(eval("[2, 1].minmax"), "[1, 2]");
        assert_eq!(eval_err("[1, 'a'].sort"), "comparison of Integer with \"a\" failed (ArgumentError)");
    }

    #[test]
    fn test_conversion() {
        assert_eq!(eval("[1, [2, 3]].join('-')"), "\"1-2-3\"");
        assert_eq!(eval("[1, nil, 'a'].join"), "\"1a\"");
        assert_eq!(eval("[[:a, 1]].to_h"), "{:a=>1}");
        assert_eq!(eval("a = [1]; a << a; a"), "[1, [...]]");
        assert_eq!(eval_err("a = []; a << a; a.join"), "recursive array join (ArgumentError)");
        assert_eq!(eval("[1, 2] == [1, 2.0]"), "true");
        assert_eq!(eval("[1, 2] <=> [1, 3]"), "-1");
    }

    #[test]
    fn test_each_returns_receiver() {
        assert_eq!(eval_output("[1, 2].each { |x| puts x }"), "1\n2\n");
        assert_eq!(eval("[1, 2].each { |x| x }"), "[1, 2]");
        assert_eq!(eval("[1, 2, 3].each { |x| break x * 10 if x == 2 }"), "20");
        assert_eq!(eval("r = []; [1, 2].reverse_each { |x| r << x }; r"), "[2, 1]");
    }
}
