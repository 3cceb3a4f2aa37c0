//! Core methods
//!
//! Each submodule registers the native methods of one class (or a few
//! closely related ones) on the interpreter's core classes. Natives have
//! the [`NativeFn`](crate::runtime::class::NativeFn) signature: they get
//! the execution context, the receiver, the evaluated arguments and the
//! block, and report script errors by raising.

pub mod array;
pub mod device;
pub mod hash;
pub mod kernel;
pub mod numeric;
pub mod object;
pub mod proc;
pub mod range;
pub mod regexp;
pub mod string;

use crate::runtime::interpreter::{EvalResult, Exec, Interpreter};
use crate::runtime::value::{Args, Value};
use std::rc::Rc;

/// Register every core method and constant.
pub fn register_all(interp: &mut Interpreter) {
    let core = &interp.core;
    object::register(core);
    kernel::register(core);
    numeric::register(core);
    string::register(core);
    array::register(core);
    hash::register(core);
    range::register(core);
    proc::register(core);
    regexp::register(core);
    device::register(core, &mut interp.constants);
}

/// Argument `index`, or `nil`
#[inline]
pub fn arg(
    args: &Args,
    index: usize,
) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn conversion_error<T>(
    exec: &Exec<'_>,
    value: &Value,
    into: &str,
) -> EvalResult<T> {
    let from = match value {
        Value::Nil => "nil".to_string(),
        other => exec.class_of(other).name.clone(),
    };
    exec.raise("TypeError", format!("no implicit conversion of {} into {}", from, into))
}

pub fn expect_int(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        other => conversion_error(exec, other, "Integer"),
    }
}

/// Integer or float argument as `f64`
pub fn expect_num(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<f64> {
    match value.as_f64() {
        Some(x) => Ok(x),
        None => conversion_error(exec, value, "Float"),
    }
}

pub fn expect_str(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<String> {
    match value {
        Value::Str(text) => Ok(text.borrow().clone()),
        other => conversion_error(exec, other, "String"),
    }
}

/// Symbol or string naming a method or variable
pub fn expect_name(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<String> {
    match value {
        Value::Sym(name) => Ok(name.to_string()),
        Value::Str(text) => Ok(text.borrow().clone()),
        other => {
            let text = exec.fallback_string(other);
            exec.raise("TypeError", format!("{} is not a symbol nor a string", text))
        }
    }
}

/// The block, or `LocalJumpError` when the call has none.
pub fn require_block(
    exec: &Exec<'_>,
    block: Option<Value>,
) -> EvalResult<Value> {
    match block {
        Some(block) => Ok(block),
        None => exec.raise("LocalJumpError", "no block given (yield)"),
    }
}

/// Copy of the receiver's items, so blocks may mutate the array while
/// it is iterated.
pub fn items_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.borrow().clone(),
        _ => Vec::new(),
    }
}

/// Shared array behind an `Array` receiver
pub fn array_ref(value: &Value) -> Rc<std::cell::RefCell<Vec<Value>>> {
    match value {
        Value::Array(items) => items.clone(),
        _ => Rc::new(std::cell::RefCell::new(Vec::new())),
    }
}
