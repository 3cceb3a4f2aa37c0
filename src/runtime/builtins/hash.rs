//! Hash
//!
//! Blocks receive each entry as one `[key, value]` array, which block
//! parameter binding spreads over `|k, v|`. Enumerable methods not
//! defined here run on the entry pairs through `Array`.

use super::require_block;
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, HashValue, Value};
use smallvec::smallvec;
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(core: &CoreClasses) {
    let hash = &core.hash;
    hash.define_singleton_native("new", hash_new);

    // ===== Access =====
    hash.define_native("[]", hash_aref);
    hash.define_native("[]=", hash_aset);
    hash.define_native("store", hash_aset);
    hash.define_native("fetch", hash_fetch);
    hash.define_native("dig", hash_dig);
    hash.define_native("key?", hash_has_key);
    hash.define_native("has_key?", hash_has_key);
    hash.define_native("include?", hash_has_key);
    hash.define_native("member?", hash_has_key);
    hash.define_native("value?", hash_has_value);
    hash.define_native("has_value?", hash_has_value);
    hash.define_native("key", hash_key);
    hash.define_native("keys", |_, recv, _, _| Ok(Value::array(hash_cell(recv).borrow().keys())));
    hash.define_native("values", |_, recv, _, _| Ok(Value::array(hash_cell(recv).borrow().values())));
    hash.define_native("values_at", hash_values_at);
    hash.define_native("length", |_, recv, _, _| Ok(Value::Int(hash_cell(recv).borrow().len() as i64)));
    hash.define_native("size", |_, recv, _, _| Ok(Value::Int(hash_cell(recv).borrow().len() as i64)));
    hash.define_native("empty?", |_, recv, _, _| Ok(Value::Bool(hash_cell(recv).borrow().is_empty())));
    hash.define_native("default", |_, recv, _, _| Ok(hash_cell(recv).borrow().default.clone()));
    hash.define_native("default=", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        hash_cell(recv).borrow_mut().default = args[0].clone();
        Ok(args[0].clone())
    });

    // ===== Mutation =====
    hash.define_native("delete", hash_delete);
    hash.define_native("delete_if", |exec, recv, _, block| retain(exec, recv, block, false, false));
    hash.define_native("reject!", |exec, recv, _, block| retain(exec, recv, block, false, true));
    hash.define_native("keep_if", |exec, recv, _, block| retain(exec, recv, block, true, false));
    hash.define_native("select!", |exec, recv, _, block| retain(exec, recv, block, true, true));
    hash.define_native("filter!", |exec, recv, _, block| retain(exec, recv, block, true, true));
    hash.define_native("merge!", |exec, recv, args, block| merge_into(exec, recv, &args, block));
    hash.define_native("update", |exec, recv, args, block| merge_into(exec, recv, &args, block));
    hash.define_native("clear", |_, recv, _, _| {
        hash_cell(recv).borrow_mut().clear();
        Ok(recv.clone())
    });
    hash.define_native("replace", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        let other = expect_hash(exec, &args[0])?;
        let cell = hash_cell(recv);
        let mut target = cell.borrow_mut();
        target.clear();
        for (k, v) in other.iter() {
            target.insert(k.clone(), v.clone());
        }
        Ok(recv.clone())
    });

    // ===== Iteration =====
    hash.define_native("each", hash_each);
    hash.define_native("each_pair", hash_each);
    hash.define_native("each_key", |exec, recv, _, block| each_part(exec, recv, block, true));
    hash.define_native("each_value", |exec, recv, _, block| each_part(exec, recv, block, false));
    hash.define_native("select", |exec, recv, _, block| filter(exec, recv, block, true));
    hash.define_native("filter", |exec, recv, _, block| filter(exec, recv, block, true));
    hash.define_native("reject", |exec, recv, _, block| filter(exec, recv, block, false));
    hash.define_native("transform_values", hash_transform_values);
    hash.define_native("transform_keys", hash_transform_keys);
    hash.define_native("merge", hash_merge);
    hash.define_native("invert", |_, recv, _, _| {
        let hash = hash_cell(recv).borrow().clone();
        let inverted: HashValue = hash.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        Ok(Value::hash(inverted))
    });
    hash.define_native("compact", |_, recv, _, _| {
        let hash = hash_cell(recv).borrow().clone();
        let kept: HashValue = hash
            .iter()
            .filter(|(_, v)| !v.is_nil())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Value::hash(kept))
    });
    hash.define_native("slice", |_, recv, args, _| {
        let hash = hash_cell(recv).borrow().clone();
        let picked: HashValue = args
            .iter()
            .filter_map(|k| hash.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        Ok(Value::hash(picked))
    });
    hash.define_native("except", |_, recv, args, _| {
        let mut hash = hash_cell(recv).borrow().clone();
        for key in &args {
            hash.remove(key);
        }
        hash.default = Value::Nil;
        hash.default_proc = None;
        Ok(Value::hash(hash))
    });
    hash.define_native("min_by", |exec, recv, args, block| via_pairs(exec, recv, "min_by", args, block));
    hash.define_native("max_by", |exec, recv, args, block| via_pairs(exec, recv, "max_by", args, block));
    hash.define_native("sort_by", |exec, recv, args, block| via_pairs(exec, recv, "sort_by", args, block));

    // ===== Conversion =====
    hash.define_native("to_a", |_, recv, _, _| Ok(Value::array(hash_cell(recv).borrow().pairs())));
    hash.define_native("to_h", hash_to_h);
    hash.define_native("==", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(Value::Bool(exec.equals(recv, &args[0])?))
    });
    hash.define_native("inspect", hash_inspect);
    hash.define_native("to_s", hash_inspect);
}

// =============================================================================
// Helpers
// =============================================================================

fn hash_cell(value: &Value) -> Rc<RefCell<HashValue>> {
    match value {
        Value::Hash(hash) => hash.clone(),
        _ => Rc::new(RefCell::new(HashValue::new())),
    }
}

fn expect_hash(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<HashValue> {
    match value {
        Value::Hash(hash) => Ok(hash.borrow().clone()),
        other => {
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("no implicit conversion of {} into Hash", class.name))
        }
    }
}

/// Snapshot of the entries, so blocks may modify the hash.
fn entries(value: &Value) -> Vec<(Value, Value)> {
    hash_cell(value)
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn yield_pair(
    exec: &mut Exec<'_>,
    block: &Value,
    key: &Value,
    value: &Value,
) -> EvalResult<Value> {
    exec.call_block(block, smallvec![Value::array(vec![key.clone(), value.clone()])])
}

/// Value for a missing key: the default proc's result or the default.
fn missing(
    exec: &mut Exec<'_>,
    recv: &Value,
    key: &Value,
) -> EvalResult<Value> {
    let (default, default_proc) = {
        let hash = hash_cell(recv);
        let hash = hash.borrow();
        (hash.default.clone(), hash.default_proc.clone())
    };
    match default_proc {
        Some(block) => exec.call_block(&block, smallvec![recv.clone(), key.clone()]),
        None => Ok(default),
    }
}

fn via_pairs(
    exec: &mut Exec<'_>,
    recv: &Value,
    name: &str,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let pairs = Value::array(hash_cell(recv).borrow().pairs());
    exec.call_method(&pairs, name, args, block)
}

// =============================================================================
// Access
// =============================================================================

/// `Hash.new`, `Hash.new(default)` or `Hash.new { |hash, key| ... }`
fn hash_new(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    if block.is_some() && !args.is_empty() {
        return exec.raise("ArgumentError", "wrong number of arguments (given 1, expected 0)");
    }
    let mut hash = HashValue::new();
    hash.default = args.first().cloned().unwrap_or_default();
    hash.default_proc = block;
    Ok(Value::hash(hash))
}

fn hash_aref(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let found = hash_cell(recv).borrow().get(&args[0]).cloned();
    match found {
        Some(value) => Ok(value),
        None => missing(exec, recv, &args[0]),
    }
}

fn hash_aset(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    hash_cell(recv)
        .borrow_mut()
        .insert(args[0].clone(), args[1].clone());
    Ok(args[1].clone())
}

fn hash_fetch(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let found = hash_cell(recv).borrow().get(&args[0]).cloned();
    if let Some(value) = found {
        return Ok(value);
    }
    if let Some(block) = block {
        return exec.call_block(&block, smallvec![args[0].clone()]);
    }
    if let Some(default) = args.get(1) {
        return Ok(default.clone());
    }
    let key = exec.inspect_or_fallback(&args[0])?;
    exec.raise("KeyError", format!("key not found: {}", key))
}

fn hash_dig(
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

fn hash_has_key(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(hash_cell(recv).borrow().contains_key(&args[0])))
}

fn hash_has_value(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    for (_, value) in entries(recv) {
        if exec.equals(&value, &args[0])? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn hash_key(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    for (key, value) in entries(recv) {
        if exec.equals(&value, &args[0])? {
            return Ok(key);
        }
    }
    Ok(Value::Nil)
}

fn hash_values_at(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut out = Vec::with_capacity(args.len());
    for key in &args {
        let found = hash_cell(recv).borrow().get(key).cloned();
        out.push(match found {
            Some(value) => value,
            None => missing(exec, recv, key)?,
        });
    }
    Ok(Value::array(out))
}

// =============================================================================
// Mutation
// =============================================================================

fn hash_delete(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let removed = hash_cell(recv).borrow_mut().remove(&args[0]);
    match (removed, block) {
        (Some(value), _) => Ok(value),
        (None, Some(block)) => exec.call_block(&block, smallvec![args[0].clone()]),
        (None, None) => Ok(Value::Nil),
    }
}

/// Keep the entries whose block result is `keep`. The `strict` forms
/// return `nil` when nothing was removed.
fn retain(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    keep: bool,
    strict: bool,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut removed = false;
    for (key, value) in entries(recv) {
        if yield_pair(exec, &block, &key, &value)?.truthy() != keep {
            hash_cell(recv).borrow_mut().remove(&key);
            removed = true;
        }
    }
    Ok(if strict && !removed { Value::Nil } else { recv.clone() })
}

/// Merge `others` into `target`; a block resolves keys present in both.
fn merge_entries(
    exec: &mut Exec<'_>,
    target: &Rc<RefCell<HashValue>>,
    others: &Args,
    block: Option<Value>,
) -> EvalResult<()> {
    for other in others {
        let other = expect_hash(exec, other)?;
        for (key, value) in other.iter() {
            let existing = target.borrow().get(key).cloned();
            let merged = match (existing, &block) {
                (Some(old), Some(block)) => {
                    exec.call_block(block, smallvec![key.clone(), old, value.clone()])?
                }
                _ => value.clone(),
            };
            target.borrow_mut().insert(key.clone(), merged);
        }
    }
    Ok(())
}

fn merge_into(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    merge_entries(exec, &hash_cell(recv), args, block)?;
    Ok(recv.clone())
}

fn hash_merge(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let copy = Rc::new(RefCell::new(hash_cell(recv).borrow().clone()));
    merge_entries(exec, &copy, &args, block)?;
    Ok(Value::Hash(copy))
}

// =============================================================================
// Iteration
// =============================================================================

fn hash_each(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let Some(block) = block else {
        return Ok(Value::array(hash_cell(recv).borrow().pairs()));
    };
    for (key, value) in entries(recv) {
        yield_pair(exec, &block, &key, &value)?;
    }
    Ok(recv.clone())
}

fn each_part(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    keys: bool,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    for (key, value) in entries(recv) {
        let part = if keys { key } else { value };
        exec.call_block(&block, smallvec![part])?;
    }
    Ok(recv.clone())
}

fn filter(
    exec: &mut Exec<'_>,
    recv: &Value,
    block: Option<Value>,
    keep: bool,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut out = HashValue::new();
    for (key, value) in entries(recv) {
        if yield_pair(exec, &block, &key, &value)?.truthy() == keep {
            out.insert(key, value);
        }
    }
    Ok(Value::hash(out))
}

fn hash_transform_values(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let mut out = HashValue::new();
    for (key, value) in entries(recv) {
        let value = exec.call_block(&block, smallvec![value])?;
        out.insert(key, value);
    }
    Ok(Value::hash(out))
}

fn hash_transform_keys(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let mapping = match args.first() {
        Some(mapping) => Some(expect_hash(exec, mapping)?),
        None => None,
    };
    let block = match mapping {
        Some(_) => block,
        None => Some(require_block(exec, block)?),
    };
    let mut out = HashValue::new();
    for (key, value) in entries(recv) {
        let mapped = mapping.as_ref().and_then(|m| m.get(&key).cloned());
        let key = match (mapped, &block) {
            (Some(mapped), _) => mapped,
            (None, Some(block)) => exec.call_block(block, smallvec![key])?,
            (None, None) => key,
        };
        out.insert(key, value);
    }
    Ok(Value::hash(out))
}

// =============================================================================
// Conversion
// =============================================================================

fn hash_to_h(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let Some(block) = block else {
        return Ok(recv.clone());
    };
    let mut out = HashValue::new();
    for (key, value) in entries(recv) {
        let pair = yield_pair(exec, &block, &key, &value)?;
        match pair.array_items() {
            Some(pair) if pair.len() == 2 => out.insert(pair[0].clone(), pair[1].clone()),
            _ => {
                let class = exec.class_of(&pair);
                return exec.raise(
                    "TypeError",
                    format!("wrong element type {} (expected array)", class.name),
                );
            }
        }
    }
    Ok(Value::hash(out))
}

fn entry_text(
    exec: &mut Exec<'_>,
    key: &Value,
    value: &Value,
) -> EvalResult<String> {
    let key = exec.inspect_or_fallback(key)?;
    let value = exec.inspect_or_fallback(value)?;
    Ok(format!("{}=>{}", key, value))
}

/// `{:a=>1, "b"=>[2]}`; a hash that contains itself prints as `{...}`.
fn hash_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    if !exec.enter_inspect(recv) {
        return Ok(Value::str("{...}"));
    }
    let mut parts = Vec::new();
    for (key, value) in entries(recv) {
        match entry_text(exec, &key, &value) {
            Ok(text) => parts.push(text),
            Err(unwind) => {
                exec.leave_inspect(recv);
                return Err(unwind);
            }
        }
    }
    exec.leave_inspect(recv);
    Ok(Value::str(format!("{{{}}}", parts.join(", "))))
}

#[cfg(test)]
mod tests {
    use crate::runtime::interpreter::tests::{eval, eval_err, eval_output};

    #[test]
    fn test_access_and_defaults() {
        assert_eq!(eval("h = { a: 1 }; h[:a]"), "1");
        assert_eq!(eval("h = { a: 1 }; h[:b]"), "nil");
        assert_eq!(eval("h = Hash.new(0); h[:x] += 2; h"), "{:x=>2}");
        assert_eq!(eval("h = Hash.new { |hash, k| hash[k] = k * 2 }; h[3]; h"), "{3=>6}");
        assert_eq!(eval("{ 'a' => 1 }.fetch('b', 9)"), "9");
        assert_eq!(eval("{}.fetch(:b) { |k| k.to_s }"), "\"b\"");
        assert_eq!(eval_err("{ a: 1 }.fetch(:x)"), "key not found: :x (KeyError)");
        assert_eq!(eval("{ a: { b: [1, 2] } }.dig(:a, :b, 1)"), "2");
        assert_eq!(eval("{ a: 1 }.key?(:a)"), "true");
        assert_eq!(eval("{ a: 1 }.key(1)"), ":a");
    }

    #[test]
    fn test_string_keys_are_copied() {
        assert_eq!(eval("k = 'a'; h = { k => 1 }; k << 'b'; h['a']"), "1");
    }

    #[test]
    fn test_insertion_order() {
        assert_eq!(eval("h = {}; h[:b] = 1; h[:a] = 2; h[:b] = 3; h.keys"), "[:b, :a]");
        assert_eq!(eval("h = { a: 1, b: 2 }; h.delete(:a); h[:a] = 3; h"), "{:b=>2, :a=>3}");
    }

    #[test]
    fn test_iteration() {
        assert_eq!(eval_output("{ a: 1, b: 2 }.each { |k, v| puts \"#{k}=#{v}\" }"), "a=1\nb=2\n");
        assert_eq!(eval("{ a: 1, b: 2 }.map { |k, v| v * 10 }"), "[10, 20]");
        assert_eq!(eval("{ a: 1, b: 2 }.select { |k, v| v > 1 }"), "{:b=>2}");
        assert_eq!(eval("{ a: 1, b: 2 }.reject { |k, v| v > 1 }"), "{:a=>1}");
        assert_eq!(eval("{ a: 1 }.transform_values { |v| v + 1 }"), "{:a=>2}");
        assert_eq!(eval("{ a: 1 }.transform_keys(&:to_s)"), "{\"a\"=>1}");
        assert_eq!(eval("{ a: 2, b: 1 }.min_by { |k, v| v }"), "[:b, 1]");
        assert_eq!(eval("{ a: 2, b: 1 }.sort_by { |k, v| v }.to_h"), "{:b=>1, :a=>2}");
        assert_eq!(eval("{ a: 1, b: 2 }.sum { |k, v| v }"), "3");
        assert_eq!(eval("{ a: 1 }.to_a"), "[[:a, 1]]");
    }

    #[test]
    fn test_merge() {
        assert_eq!(eval("{ a: 1 }.merge({ b: 2 })"), "{:a=>1, :b=>2}");
        assert_eq!(eval("{ a: 1 }.merge({ a: 2 }) { |k, old, new| old + new }"), "{:a=>3}");
        assert_eq!(eval("h = { a: 1 }; h.merge!({ b: 2 }); h.size"), "2");
        assert_eq!(eval("{ a: 1, b: nil }.compact"), "{:a=>1}");
        assert_eq!(eval("{ a: 1, b: 2 }.invert"), "{1=>:a, 2=>:b}");
        assert_eq!(eval("{ a: 1, b: 2 }.slice(:b)"), "{:b=>2}");
    }

    #[test]
    fn test_inspect() {
        assert_eq!(eval("{}"), "{}");
        assert_eq!(eval("{ 1 => 'x', nil => [true] }"), "{1=>\"x\", nil=>[true]}");
        assert_eq!(eval("h = {}; h[:self] = h; h"), "{:self=>{...}}");
        assert_eq!(eval("{ a: 1 } == { a: 1.0 }"), "true");
    }
}
