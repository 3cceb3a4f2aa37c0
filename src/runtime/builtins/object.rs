//! BasicObject, Object, Class, Exception, nil, true and false

use super::{arg, expect_name, require_block};
use crate::runtime::class::{ClassKind, CoreClasses, Method};
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, Object, Value};
use smallvec::smallvec;

pub fn register(core: &CoreClasses) {
    let basic = &core.basic_object;
    basic.define_native("initialize", basic_initialize);
    basic.define_native("==", basic_identical);
    basic.define_native("equal?", basic_identical);
    basic.define_native("!", basic_not);
    basic.define_native("!=", basic_not_equal);
    basic.define_native("__send__", object_send);

    let object = &core.object;
    object.define_native("class", object_class);
    object.define_native("inspect", object_inspect);
    object.define_native("to_s", object_to_s);
    object.define_native("nil?", |_, _, _, _| Ok(Value::Bool(false)));
    object.define_native("is_a?", object_is_a);
    object.define_native("kind_of?", object_is_a);
    object.define_native("instance_of?", object_instance_of);
    object.define_native("respond_to?", object_respond_to);
    object.define_native("send", object_send);
    object.define_native("public_send", object_send);
    object.define_native("object_id", object_id);
    object.define_native("===", object_case_eq);
    object.define_native("=~", |_, _, _, _| Ok(Value::Nil));
    object.define_native("tap", object_tap);
    object.define_native("then", object_then);
    object.define_native("itself", |_, recv, _, _| Ok(recv.clone()));
    object.define_native("dup", object_dup);
    object.define_native("clone", object_dup);
    object.define_native("freeze", |_, recv, _, _| Ok(recv.clone()));
    object.define_native("instance_variable_get", object_ivar_get);
    object.define_native("instance_variable_set", object_ivar_set);
    object.define_native("instance_variable_defined?", object_ivar_defined);
    object.define_native("instance_variables", object_ivars);

    let class = &core.class;
    class.define_native("new", class_new);
    class.define_native("allocate", class_allocate);
    class.define_native("name", class_name);
    class.define_native("to_s", class_name);
    class.define_native("inspect", class_name);
    class.define_native("superclass", class_superclass);
    class.define_native("ancestors", class_ancestors);
    class.define_native("===", class_case_eq);
    class.define_native("<", class_lt);
    class.define_native("<=", class_le);
    class.define_native("instance_methods", class_instance_methods);
    class.define_native("method_defined?", class_method_defined);
    class.define_native("attr_reader", class_attr_reader);
    class.define_native("attr_writer", class_attr_writer);
    class.define_native("attr_accessor", class_attr_accessor);

    let exception = &core.exception;
    exception.define_native("initialize", exception_initialize);
    exception.define_native("message", exception_message);
    exception.define_native("to_s", exception_to_s);
    exception.define_native("inspect", exception_inspect);
    exception.define_native("backtrace", |_, _, _, _| Ok(Value::Nil));
    exception.define_singleton_native("exception", exception_new);

    let nil = &core.nil;
    nil.define_native("to_s", |_, _, _, _| Ok(Value::str("")));
    nil.define_native("to_a", |_, _, _, _| Ok(Value::array(Vec::new())));
    nil.define_native("to_i", |_, _, _, _| Ok(Value::Int(0)));
    nil.define_native("to_f", |_, _, _, _| Ok(Value::Float(0.0)));
    nil.define_native("inspect", |_, _, _, _| Ok(Value::str("nil")));
    nil.define_native("nil?", |_, _, _, _| Ok(Value::Bool(true)));
    nil.define_native("&", |_, _, _, _| Ok(Value::Bool(false)));
    nil.define_native("|", |_, _, args, _| Ok(Value::Bool(arg(&args, 0).truthy())));

    for class in [&core.true_class, &core.false_class] {
        class.define_native("to_s", bool_to_s);
        class.define_native("inspect", bool_to_s);
        class.define_native("&", |_, recv, args, _| {
            Ok(Value::Bool(recv.truthy() && arg(&args, 0).truthy()))
        });
        class.define_native("|", |_, recv, args, _| {
            Ok(Value::Bool(recv.truthy() || arg(&args, 0).truthy()))
        });
        class.define_native("^", |_, recv, args, _| {
            Ok(Value::Bool(recv.truthy() != arg(&args, 0).truthy()))
        });
    }
}

// =============================================================================
// BasicObject
// =============================================================================

fn basic_initialize(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(0))?;
    Ok(Value::Nil)
}

fn basic_identical(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(recv.identical(&args[0])))
}

fn basic_not(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(Value::Bool(!recv.truthy()))
}

fn basic_not_equal(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let equal = exec.call_method(recv, "==", args, None)?;
    Ok(Value::Bool(!equal.truthy()))
}

// =============================================================================
// Object
// =============================================================================

fn object_class(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(Value::Class(exec.class_of(recv)))
}

/// `#<Foo @a=1, @b=2>`
fn object_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let Value::Object(object) = recv else {
        return object_to_s(exec, recv, Args::new(), None);
    };
    if recv.identical(&exec.main_object()) {
        return Ok(Value::str("main"));
    }
    let ivars: Vec<(String, Value)> = object
        .ivars
        .borrow()
        .iter()
        .filter(|(name, _)| name.starts_with('@'))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if ivars.is_empty() {
        return Ok(Value::str(format!("#<{}>", object.class.name)));
    }
    if !exec.enter_inspect(recv) {
        return Ok(Value::str(format!("#<{} ...>", object.class.name)));
    }
    let mut parts = Vec::with_capacity(ivars.len());
    for (name, value) in &ivars {
        match exec.inspect_or_fallback(value) {
            Ok(text) => parts.push(format!("{}={}", name, text)),
            Err(unwind) => {
                exec.leave_inspect(recv);
                return Err(unwind);
            }
        }
    }
    exec.leave_inspect(recv);
    Ok(Value::str(format!("#<{} {}>", object.class.name, parts.join(", "))))
}

fn object_to_s(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    if recv.identical(&exec.main_object()) {
        return Ok(Value::str("main"));
    }
    Ok(Value::str(exec.fallback_string(recv)))
}

fn object_is_a(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = match &args[0] {
        Value::Class(class) => class.clone(),
        _ => return exec.raise("TypeError", "class or module required"),
    };
    Ok(Value::Bool(exec.is_a(recv, &class)))
}

fn object_instance_of(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = match &args[0] {
        Value::Class(class) => class.clone(),
        _ => return exec.raise("TypeError", "class or module required"),
    };
    Ok(Value::Bool(std::rc::Rc::ptr_eq(&exec.class_of(recv), &class)))
}

fn object_respond_to(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let name = expect_name(exec, &args[0])?;
    Ok(Value::Bool(exec.responds_to(recv, &name)))
}

fn object_send(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let name = expect_name(exec, &args[0])?;
    let rest: Args = args.into_iter().skip(1).collect();
    exec.call_method(recv, &name, rest, block)
}

fn object_id(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let id = match recv {
        Value::Nil => 8,
        Value::Bool(false) => 0,
        Value::Bool(true) => 20,
        Value::Int(i) => i.wrapping_mul(2).wrapping_add(1),
        other => (other.heap_id().unwrap_or_default() >> 3) as i64,
    };
    Ok(Value::Int(id))
}

fn object_case_eq(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(exec.equals(recv, &args[0])?))
}

fn object_tap(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    exec.call_block(&block, smallvec![recv.clone()])?;
    Ok(recv.clone())
}

fn object_then(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let block = require_block(exec, block)?;
    exec.call_block(&block, smallvec![recv.clone()])
}

/// Shallow copy of strings, arrays, hashes and plain objects
fn object_dup(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(match recv {
        Value::Str(text) => Value::str(text.borrow().clone()),
        Value::Array(items) => Value::array(items.borrow().clone()),
        Value::Hash(hash) => Value::hash(hash.borrow().clone()),
        Value::Object(object) => {
            let copy = Object::new(object.class.clone());
            *copy.ivars.borrow_mut() = object.ivars.borrow().clone();
            Value::Object(copy)
        }
        other => other.clone(),
    })
}

fn ivar_name(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<String> {
    let name = expect_name(exec, value)?;
    if !name.starts_with('@') || name.starts_with("@@") || name.len() < 2 {
        return exec.raise(
            "NameError",
            format!("'{}' is not allowed as an instance variable name", name),
        );
    }
    Ok(name)
}

fn object_ivar_get(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let name = ivar_name(exec, &args[0])?;
    Ok(exec.ivar_get(recv, &name))
}

fn object_ivar_set(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let name = ivar_name(exec, &args[0])?;
    exec.ivar_set(recv, &name, args[1].clone())
}

fn object_ivar_defined(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let name = ivar_name(exec, &args[0])?;
    let defined = match recv {
        Value::Object(object) => object.ivars.borrow().contains_key(&name),
        Value::Class(class) => class.ivars.borrow().contains_key(&name),
        _ => false,
    };
    Ok(Value::Bool(defined))
}

fn object_ivars(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let names: Vec<String> = match recv {
        Value::Object(object) => object.ivars.borrow().keys().cloned().collect(),
        Value::Class(class) => class.ivars.borrow().keys().cloned().collect(),
        _ => Vec::new(),
    };
    Ok(Value::array(
        names
            .iter()
            .filter(|name| name.starts_with('@'))
            .map(|name| Value::sym(name))
            .collect(),
    ))
}

// =============================================================================
// Class
// =============================================================================

fn class_new(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let object = class_allocate(exec, recv, Args::new(), None)?;
    exec.call_method(&object, "initialize", args, block)?;
    Ok(object)
}

fn class_allocate(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    match class.kind {
        ClassKind::Object => {}
        ClassKind::Builtin => {
            return exec.raise(
                "NoMethodError",
                format!("undefined method 'new' for class {}", class.name),
            )
        }
        ClassKind::Module => {
            return exec.raise(
                "NoMethodError",
                format!("undefined method 'new' for module {}", class.name),
            )
        }
    }
    Ok(Value::Object(Object::new(class)))
}

fn class_name(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    Ok(Value::str(class.name.clone()))
}

fn class_superclass(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    Ok(class.superclass.clone().map(Value::Class).unwrap_or_default())
}

fn class_ancestors(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    Ok(Value::array(class.ancestors().into_iter().map(Value::Class).collect()))
}

fn class_case_eq(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = exec.expect_class(recv)?;
    Ok(Value::Bool(exec.is_a(&args[0], &class)))
}

fn class_lt(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = exec.expect_class(recv)?;
    let other = exec.expect_class(&args[0])?;
    Ok(Value::Bool(
        !std::rc::Rc::ptr_eq(&class, &other) && class.inherits_from(&other),
    ))
}

fn class_le(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = exec.expect_class(recv)?;
    let other = exec.expect_class(&args[0])?;
    Ok(Value::Bool(class.inherits_from(&other)))
}

fn class_instance_methods(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    let inherit = args.first().map_or(true, Value::truthy);
    let mut names: Vec<String> = Vec::new();
    let classes = if inherit { class.ancestors() } else { vec![class] };
    for class in classes {
        for name in class.method_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(Value::array(names.iter().map(|name| Value::sym(name)).collect()))
}

fn class_method_defined(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let class = exec.expect_class(recv)?;
    let name = expect_name(exec, &args[0])?;
    Ok(Value::Bool(class.find_method(&name).is_some()))
}

fn define_attrs(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    reader: bool,
    writer: bool,
) -> EvalResult<Value> {
    let class = exec.expect_class(recv)?;
    let mut defined = Vec::with_capacity(args.len());
    for value in args {
        let name = expect_name(exec, value)?;
        let ivar = format!("@{}", name);
        if reader {
            class.define(&name, Method::AttrReader(ivar.clone()));
            defined.push(Value::sym(&name));
        }
        if writer {
            let setter = format!("{}=", name);
            class.define(&setter, Method::AttrWriter(ivar));
            defined.push(Value::sym(&setter));
        }
    }
    Ok(Value::array(defined))
}

fn class_attr_reader(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    define_attrs(exec, recv, &args, true, false)
}

fn class_attr_writer(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    define_attrs(exec, recv, &args, false, true)
}

fn class_attr_accessor(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    define_attrs(exec, recv, &args, true, true)
}

// =============================================================================
// Exception
// =============================================================================

fn exception_initialize(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    if let (Value::Object(object), Some(message)) = (recv, args.first()) {
        let text = match message {
            Value::Nil => None,
            other => Some(exec.to_s(other)?),
        };
        if let Some(text) = text {
            object
                .ivars
                .borrow_mut()
                .insert(crate::runtime::interpreter::MESSAGE_IVAR.to_string(), Value::str(text));
        }
    }
    Ok(Value::Nil)
}

fn exception_new(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.call_method(recv, "new", args, block)
}

/// The message, or the class name when none was given
fn exception_to_s(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let message = exec.message_of(recv);
    if message.is_empty() {
        return Ok(Value::str(exec.class_of(recv).name.clone()));
    }
    Ok(Value::str(message))
}

fn exception_message(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.call_method(recv, "to_s", Args::new(), None)
}

/// `message (ClassName)`, or just the class name
fn exception_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let class = exec.class_of(recv);
    let message = exec.to_s(recv)?;
    if message.is_empty() || message == class.name {
        return Ok(Value::str(class.name.clone()));
    }
    Ok(Value::str(format!("{} ({})", message, class.name)))
}

fn bool_to_s(
    _exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    Ok(Value::str(recv.truthy().to_string()))
}

#[cfg(test)]
mod tests {
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_object_inspect_lists_ivars() {
        assert_eq!(
            eval("class Pt; def initialize; @x = 1; @y = [2]; end; end; Pt.new.inspect"),
            "\"#<Pt @x=1, @y=[2]>\""
        );
        assert_eq!(eval("class Empty; end; Empty.new.inspect"), "\"#<Empty>\"");
    }

    #[test]
    fn test_attr_accessor() {
        assert_eq!(
            eval("class Box; attr_accessor :v; end; b = Box.new; b.v = 5; b.v + 1"),
            "6"
        );
    }

    #[test]
    fn test_exception_formats() {
        assert_eq!(eval("RuntimeError.new('boom').inspect"), "\"boom (RuntimeError)\"");
        assert_eq!(eval("ArgumentError.new.message"), "\"ArgumentError\"");
        assert_eq!(eval("KeyError.new.inspect"), "\"KeyError\"");
    }

    #[test]
    fn test_class_reflection() {
        assert_eq!(eval("Integer.ancestors"), "[Integer, Numeric, Object, BasicObject]");
        assert_eq!(eval("KeyError < StandardError"), "true");
        assert_eq!(eval("Integer === 3"), "true");
        assert_eq!(eval("3.is_a?(Numeric)"), "true");
        assert_eq!(eval("nil.to_a"), "[]");
        assert_eq!(eval("1.respond_to?(:+)"), "true");
        assert_eq!(eval("1.send(:+, 2)"), "3");
    }

    #[test]
    fn test_builtin_class_new_is_rejected() {
        assert_eq!(
            eval_err("Integer.new"),
            "undefined method 'new' for class Integer (NoMethodError)"
        );
    }

    #[test]
    fn test_initialize_arity() {
        assert_eq!(
            eval_err("class Plain; end; Plain.new(1)"),
            "wrong number of arguments (given 1, expected 0) (ArgumentError)"
        );
    }
}
