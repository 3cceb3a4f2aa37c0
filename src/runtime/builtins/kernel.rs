//! Kernel functions: output, `raise`, `loop`, procs and conversions

use super::{arg, require_block};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec, Unwind};
use crate::runtime::value::{Args, ProcBody, ProcValue, Value};
use smallvec::smallvec;
use std::rc::Rc;

pub fn register(core: &CoreClasses) {
    let object = &core.object;
    object.define_native("p", kernel_p);
    object.define_native("puts", kernel_puts);
    object.define_native("print", kernel_print);
    object.define_native("raise", kernel_raise);
    object.define_native("fail", kernel_raise);
    object.define_native("loop", kernel_loop);
    object.define_native("lambda", kernel_lambda);
    object.define_native("proc", kernel_proc);
    object.define_native("block_given?", |exec, _, _, _| {
        Ok(Value::Bool(exec.frame().block.is_some()))
    });
    object.define_native("__method__", |exec, _, _, _| {
        Ok(match &exec.frame().method {
            Some(ctx) => Value::sym(&ctx.name),
            None => Value::Nil,
        })
    });
    object.define_native("Integer", kernel_integer);
    object.define_native("Float", kernel_float);
    object.define_native("String", |exec, _, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(Value::str(exec.to_s(&args[0])?))
    });
    object.define_native("Array", kernel_array);
    object.define_native("format", kernel_format);
    object.define_native("sprintf", kernel_format);

    core.proc_class.define_singleton_native("new", kernel_proc);
}

// =============================================================================
// Output
// =============================================================================

/// `p`: inspect each argument on its own line, return the arguments.
fn kernel_p(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    for value in &args {
        let text = exec.inspect_or_fallback(value)?;
        exec.write_str(&text)?;
        exec.write_str("\n")?;
    }
    Ok(returned(args))
}

/// What the output primitives return: nil, the only argument, or all of
/// them as an array.
fn returned(args: Args) -> Value {
    match args.len() {
        0 => Value::Nil,
        1 => args[0].clone(),
        _ => Value::array(args.into_vec()),
    }
}

/// `puts`: `to_s` of each argument on its own line, return the arguments.
fn kernel_puts(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    if args.is_empty() {
        exec.write_str("\n")?;
    }
    for value in &args {
        puts_value(exec, value)?;
    }
    Ok(returned(args))
}

/// Arrays print one element per line, recursively.
fn puts_value(
    exec: &mut Exec<'_>,
    value: &Value,
) -> EvalResult<()> {
    match value {
        Value::Array(items) => {
            let items = items.borrow().clone();
            if items.is_empty() {
                return exec.write_str("\n");
            }
            if !exec.enter_inspect(value) {
                return exec.write_str("[...]\n");
            }
            let result = items.iter().try_for_each(|item| puts_value(exec, item));
            exec.leave_inspect(value);
            result
        }
        other => {
            let text = exec.to_s(other)?;
            exec.write_str(&text)?;
            if !text.ends_with('\n') {
                exec.write_str("\n")?;
            }
            Ok(())
        }
    }
}

/// `print`: `to_s` of each argument with no separator, return the arguments.
fn kernel_print(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    for value in &args {
        let text = exec.to_s(value)?;
        exec.write_str(&text)?;
    }
    Ok(returned(args))
}

// =============================================================================
// Exceptions
// =============================================================================

/// `raise`, `raise "msg"`, `raise Class`, `raise Class, "msg"` and
/// `raise exception`
fn kernel_raise(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(2))?;
    let exception = match (args.first(), args.get(1)) {
        (None, _) => match exec.interp.globals.get("$!").cloned() {
            Some(current) if !current.is_nil() => current,
            _ => exec.exception("RuntimeError", "unhandled exception"),
        },
        (Some(Value::Str(text)), None) => {
            let message = text.borrow().clone();
            exec.exception("RuntimeError", &message)
        }
        (Some(Value::Class(class)), message) => {
            if !class.inherits_from(&exec.interp.core.exception) {
                return exec.raise("TypeError", "exception class/object expected");
            }
            let args: Args = message.cloned().into_iter().collect();
            exec.call_method(&Value::Class(class.clone()), "new", args, None)?
        }
        (Some(value), message) if exec.is_exception(value) => {
            if let Some(message) = message {
                exec.call_method(value, "initialize", smallvec![message.clone()], None)?;
            }
            value.clone()
        }
        _ => return exec.raise("TypeError", "exception class/object expected"),
    };
    if !exec.is_exception(&exception) {
        return exec.raise("TypeError", "exception object expected");
    }
    Err(Unwind::Raise(exception))
}

/// Run the block until it breaks. `StopIteration` ends the loop quietly.
fn kernel_loop(
    exec: &mut Exec<'_>,
    _recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    let stop = exec.interp.core.exception_class("StopIteration");
    loop {
        match exec.call_block(&block, Args::new()) {
            Ok(_) => {}
            Err(Unwind::Raise(exception)) if exec.is_a(&exception, &stop) => {
                return Ok(Value::Nil);
            }
            Err(unwind) => return Err(unwind),
        }
    }
}

// =============================================================================
// Procs
// =============================================================================

fn kernel_lambda(
    exec: &mut Exec<'_>,
    _recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    match &block {
        Value::Proc(proc) if !proc.lambda && matches!(proc.body, ProcBody::Block { .. }) => {
            Ok(Value::Proc(Rc::new(ProcValue {
                body: proc.body.clone(),
                lambda: true,
                tag: proc.tag,
            })))
        }
        _ => Ok(block),
    }
}

fn kernel_proc(
    exec: &mut Exec<'_>,
    _recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    match block {
        Some(block) => Ok(block),
        None => exec.raise("ArgumentError", "tried to create Proc object without a block"),
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Strict integer parse: optional sign, `0x`/`0b`/`0o` prefixes and
/// `_` separators between digits.
pub fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_string())
    } else {
        (10, lower.clone())
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn kernel_integer(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
        Value::Float(x) => exec.raise("RangeError", crate::runtime::value::format_float(*x)),
        Value::Str(text) => {
            let text = text.borrow().clone();
            match parse_integer(&text) {
                Some(i) => Ok(Value::Int(i)),
                None => exec.raise(
                    "ArgumentError",
                    format!(
                        "invalid value for Integer(): {}",
                        crate::runtime::value::inspect_str(&text)
                    ),
                ),
            }
        }
        Value::Nil => exec.raise("TypeError", "can't convert nil into Integer"),
        other => {
            if exec.responds_to(other, "to_i") {
                return exec.call_method(other, "to_i", Args::new(), None);
            }
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("can't convert {} into Integer", class.name))
        }
    }
}

fn kernel_float(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Str(text) => {
            let text = text.borrow().clone();
            let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
            let valid = !cleaned.is_empty()
                && cleaned
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'));
            match cleaned.parse::<f64>() {
                Ok(x) if valid => Ok(Value::Float(x)),
                _ => exec.raise(
                    "ArgumentError",
                    format!(
                        "invalid value for Float(): {}",
                        crate::runtime::value::inspect_str(&text)
                    ),
                ),
            }
        }
        Value::Nil => exec.raise("TypeError", "can't convert nil into Float"),
        other => {
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("can't convert {} into Float", class.name))
        }
    }
}

fn kernel_array(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    match arg(&args, 0) {
        Value::Nil => Ok(Value::array(Vec::new())),
        value @ Value::Array(_) => Ok(value),
        value @ (Value::Hash(_) | Value::Range(_)) => {
            exec.call_method(&value, "to_a", Args::new(), None)
        }
        other => Ok(Value::array(vec![other])),
    }
}

fn kernel_format(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let template = super::expect_str(exec, &args[0])?;
    let text = super::string::format(exec, &template, &args[1..])?;
    Ok(Value::str(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err, eval_output};

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer(" -0x1f "), Some(-31));
        assert_eq!(parse_integer("1_000"), Some(1000));
        assert_eq!(parse_integer("1__0"), None);
        assert_eq!(parse_integer("12abc"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_puts_flattens_and_terminates() {
        assert_eq!(eval_output("puts 1, [2, [3]], nil"), "1\n2\n3\n\n");
        assert_eq!(eval_output("puts \"a\\n\""), "a\n");
        assert_eq!(eval_output("puts"), "\n");
        assert_eq!(eval_output("print 1, 2"), "12");
    }

    #[test]
    fn test_output_primitives_return_their_arguments() {
        assert_eq!(eval("puts 'hi'"), "\"hi\"");
        assert_eq!(eval("print 1"), "1");
        assert_eq!(eval("puts 1, 2"), "[1, 2]");
        assert_eq!(eval("puts"), "nil");
        assert_eq!(eval("p :a"), ":a");
    }

    #[test]
    fn test_p_returns_argument() {
        assert_eq!(eval_output("p 'x'"), "\"x\"\n");
        assert_eq!(eval("p 1, 2"), "[1, 2]");
        assert_eq!(eval("p"), "nil");
    }

    #[test]
    fn test_raise_forms() {
        assert_eq!(eval_err("raise 'boom'"), "boom (RuntimeError)");
        assert_eq!(eval_err("raise ArgumentError"), "ArgumentError");
        assert_eq!(eval_err("raise ArgumentError, 'bad'"), "bad (ArgumentError)");
        assert_eq!(eval_err("raise"), "unhandled exception (RuntimeError)");
        assert_eq!(
            eval_err("raise 42"),
            "exception class/object expected (TypeError)"
        );
        assert_eq!(
            eval_err("e = KeyError.new('k'); raise e"),
            "k (KeyError)"
        );
    }

    #[test]
    fn test_loop_and_stop_iteration() {
        assert_eq!(eval("i = 0; loop { i += 1; break if i == 3 }; i"), "3");
        assert_eq!(eval("loop { raise StopIteration }"), "nil");
        assert_eq!(eval("loop { break 7 }"), "7");
    }

    #[test]
    fn test_lambda_and_proc() {
        assert_eq!(eval("l = lambda { |x| x * 2 }; l.call(4)"), "8");
        assert_eq!(eval("l = lambda { |x| x }; l.lambda?"), "true");
        assert_eq!(eval("pr = proc { |x, y| [x, y] }; pr.call(1)"), "[1, nil]");
        assert_eq!(
            eval_err("l = lambda { |x| x }; l.call"),
            "wrong number of arguments (given 0, expected 1) (ArgumentError)"
        );
        assert_eq!(eval("Proc.new { 5 }.call"), "5");
    }

    #[test]
    fn test_block_given() {
        let src = "def f; block_given?; end; [f, f { }]";
        assert_eq!(eval(src), "[false, true]");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(eval("Integer('0b101')"), "5");
        assert_eq!(eval("Integer(3.9)"), "3");
        assert_eq!(eval("Float('1.5')"), "1.5");
        assert_eq!(eval("Array(nil)"), "[]");
        assert_eq!(eval("Array(1..3)"), "[1, 2, 3]");
        assert_eq!(
            eval_err("Integer('abc')"),
            "invalid value for Integer(): \"abc\" (ArgumentError)"
        );
        assert_eq!(
            eval_err("Integer(nil)"),
            "can't convert nil into Integer (TypeError)"
        );
    }
}
