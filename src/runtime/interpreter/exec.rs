//! Per-statement execution state and the helpers shared by evaluation
//! and the builtins

use super::{Frame, Interpreter};
use crate::runtime::class::Class;
use crate::runtime::value::{Args, Value};
use smallvec::smallvec;
use std::cmp::Ordering;
use std::io::Write;
use std::rc::Rc;

/// Instance variable holding an exception's message. It has no `@`, so
/// scripts cannot see it as an ordinary instance variable.
pub(crate) const MESSAGE_IVAR: &str = "mesg";

/// Non-local exits travelling up the Rust stack
#[derive(Debug)]
pub enum Unwind {
    /// A script exception
    Raise(Value),
    /// `break`; `tag` names the block being left, `None` a loop.
    Break { tag: Option<usize>, value: Value },
    Next(Value),
    /// `return` from the frame with this id
    Return { frame: usize, value: Value },
}

pub type EvalResult<T> = Result<T, Unwind>;

pub struct Exec<'a> {
    pub interp: &'a mut Interpreter,
    out: &'a mut dyn Write,
    frames: Vec<Rc<Frame>>,
    depth: usize,
    /// Containers being inspected, to print cycles as `[...]`
    inspecting: Vec<usize>,
}

impl<'a> Exec<'a> {
    pub fn new(
        interp: &'a mut Interpreter,
        out: &'a mut dyn Write,
    ) -> Self {
        let top = interp.top.clone();
        Exec {
            interp,
            out,
            frames: vec![top],
            depth: 0,
            inspecting: Vec::new(),
        }
    }

    // ---- frames ----

    pub fn frame(&self) -> Rc<Frame> {
        match self.frames.last() {
            Some(frame) => frame.clone(),
            None => self.interp.top.clone(),
        }
    }

    pub fn self_value(&self) -> Value {
        self.frame().self_value.clone()
    }

    /// The top-level `self`
    pub fn main_object(&self) -> Value {
        self.interp.top.self_value.clone()
    }

    /// Run `f` inside `frame`, counting it against the depth limit.
    pub(crate) fn with_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        if self.depth >= self.interp.max_depth {
            return self.raise("SystemStackError", "stack level too deep");
        }
        self.depth += 1;
        self.frames.push(Rc::new(frame));
        let result = f(self);
        self.frames.pop();
        self.depth -= 1;
        result
    }

    /// A frame `return` can still reach is on the stack.
    pub(crate) fn can_return_to(
        &self,
        id: usize,
    ) -> bool {
        self.frames.iter().any(|f| f.id == id && f.returnable)
    }

    pub(crate) fn next_id(&mut self) -> usize {
        self.interp.next_id()
    }

    // ---- exceptions ----

    pub fn exception(
        &self,
        class_name: &str,
        message: &str,
    ) -> Value {
        super::exception_value(self.interp.core.exception_class(class_name), message)
    }

    pub fn raise<T>(
        &self,
        class_name: &str,
        message: impl AsRef<str>,
    ) -> EvalResult<T> {
        Err(Unwind::Raise(self.exception(class_name, message.as_ref())))
    }

    pub fn message_of(
        &self,
        exception: &Value,
    ) -> String {
        match exception {
            Value::Object(object) => match object.ivars.borrow().get(MESSAGE_IVAR) {
                Some(Value::Str(text)) => text.borrow().clone(),
                _ => String::new(),
            },
            _ => String::new(),
        }
    }

    pub fn is_exception(
        &self,
        value: &Value,
    ) -> bool {
        let exception = self.interp.core.exception.clone();
        matches!(value, Value::Object(o) if o.class.inherits_from(&exception))
    }

    // ---- classes ----

    pub fn class_of(
        &self,
        value: &Value,
    ) -> Rc<Class> {
        let core = &self.interp.core;
        match value {
            Value::Nil => core.nil.clone(),
            Value::Bool(true) => core.true_class.clone(),
            Value::Bool(false) => core.false_class.clone(),
            Value::Int(_) => core.integer.clone(),
            Value::Float(_) => core.float.clone(),
            Value::Str(_) => core.string.clone(),
            Value::Sym(_) => core.symbol.clone(),
            Value::Array(_) => core.array.clone(),
            Value::Hash(_) => core.hash.clone(),
            Value::Range(_) => core.range.clone(),
            Value::Regexp(_) => core.regexp.clone(),
            Value::Proc(_) => core.proc_class.clone(),
            Value::Class(_) => core.class.clone(),
            Value::Object(object) => object.class.clone(),
        }
    }

    pub fn is_a(
        &self,
        value: &Value,
        class: &Rc<Class>,
    ) -> bool {
        self.class_of(value).inherits_from(class)
    }

    pub fn expect_class(
        &self,
        value: &Value,
    ) -> EvalResult<Rc<Class>> {
        match value {
            Value::Class(class) => Ok(class.clone()),
            other => {
                let text = self.fallback_string(other);
                self.raise("TypeError", format!("{} is not a class", text))
            }
        }
    }

    // ---- instance variables ----

    pub fn ivar_get(
        &self,
        target: &Value,
        name: &str,
    ) -> Value {
        let found = match target {
            Value::Object(object) => object.ivars.borrow().get(name).cloned(),
            Value::Class(class) => class.ivars.borrow().get(name).cloned(),
            _ => None,
        };
        found.unwrap_or_default()
    }

    pub fn ivar_set(
        &mut self,
        target: &Value,
        name: &str,
        value: Value,
    ) -> EvalResult<Value> {
        match target {
            Value::Object(object) => {
                object.ivars.borrow_mut().insert(name.to_string(), value.clone());
            }
            Value::Class(class) => {
                class.ivars.borrow_mut().insert(name.to_string(), value.clone());
            }
            other => {
                let class = self.class_of(other);
                let text = self.inspect_or_fallback(other)?;
                return self.raise(
                    "FrozenError",
                    format!("can't modify frozen {}: {}", class.name, text),
                );
            }
        }
        Ok(value)
    }

    // ---- output ----

    pub fn write_str(
        &mut self,
        text: &str,
    ) -> EvalResult<()> {
        match self.out.write_all(text.as_bytes()) {
            Ok(()) => Ok(()),
            Err(e) => self.raise("IOError", e.to_string()),
        }
    }

    // ---- conversions ----

    /// How a receiver is named in `NoMethodError` and `NameError`
    pub fn describe(
        &self,
        value: &Value,
    ) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Class(class) => format!("class {}", class.name),
            other if other.identical(&self.main_object()) => "main".to_string(),
            other => format!("an instance of {}", self.class_of(other).name),
        }
    }

    /// `#<ClassName>`, the form used when nothing better is available.
    pub fn fallback_string(
        &self,
        value: &Value,
    ) -> String {
        match value {
            Value::Class(class) => class.name.clone(),
            other => format!("#<{}>", self.class_of(other).name),
        }
    }

    /// Dispatch `inspect`. `None` when the receiver has no such method.
    pub fn inspect(
        &mut self,
        value: &Value,
    ) -> EvalResult<Option<String>> {
        if self.find_method(value, "inspect").is_none() {
            return Ok(None);
        }
        let result = self.call_method(value, "inspect", Args::new(), None)?;
        match result {
            Value::Str(text) => Ok(Some(text.borrow().clone())),
            other => self.to_s(&other).map(Some),
        }
    }

    pub fn inspect_or_fallback(
        &mut self,
        value: &Value,
    ) -> EvalResult<String> {
        match self.inspect(value)? {
            Some(text) => Ok(text),
            None => Ok(self.fallback_string(value)),
        }
    }

    /// Dispatch `to_s`, falling back to `#<ClassName>`.
    pub fn to_s(
        &mut self,
        value: &Value,
    ) -> EvalResult<String> {
        if let Value::Str(text) = value {
            return Ok(text.borrow().clone());
        }
        if self.find_method(value, "to_s").is_none() {
            return Ok(self.fallback_string(value));
        }
        match self.call_method(value, "to_s", Args::new(), None)? {
            Value::Str(text) => Ok(text.borrow().clone()),
            _ => Ok(self.fallback_string(value)),
        }
    }

    /// Start inspecting a container; `false` if it is already being
    /// inspected further up.
    pub(crate) fn enter_inspect(
        &mut self,
        value: &Value,
    ) -> bool {
        match value.heap_id() {
            Some(id) if self.inspecting.contains(&id) => false,
            Some(id) => {
                self.inspecting.push(id);
                true
            }
            None => true,
        }
    }

    pub(crate) fn leave_inspect(
        &mut self,
        value: &Value,
    ) {
        if value.heap_id().is_some() {
            self.inspecting.pop();
        }
    }

    // ---- comparison ----

    /// Ruby `==`
    pub fn equals(
        &mut self,
        a: &Value,
        b: &Value,
    ) -> EvalResult<bool> {
        let equal = match (a, b) {
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64() == b.as_f64()
            }
            (Value::Str(x), Value::Str(y)) => *x.borrow() == *y.borrow(),
            (Value::Array(x), Value::Array(y)) => {
                if Rc::ptr_eq(x, y) {
                    return Ok(true);
                }
                let (xs, ys) = (x.borrow().clone(), y.borrow().clone());
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (left, right) in xs.iter().zip(ys.iter()) {
                    if !self.equals(left, right)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Value::Hash(x), Value::Hash(y)) => {
                if Rc::ptr_eq(x, y) {
                    return Ok(true);
                }
                let (xs, ys) = (x.borrow().clone(), y.borrow().clone());
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (key, left) in xs.iter() {
                    let right = match ys.get(key) {
                        Some(right) => right.clone(),
                        None => return Ok(false),
                    };
                    if !self.equals(left, &right)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Value::Range(x), Value::Range(y)) => {
                x.exclusive == y.exclusive
                    && self.equals(&x.start, &y.start)?
                    && self.equals(&x.end, &y.end)?
            }
            (Value::Regexp(x), Value::Regexp(y)) => x.source == y.source && x.flags == y.flags,
            (Value::Object(_), _) => self.call_method(a, "==", smallvec![b.clone()], None)?.truthy(),
            _ => a.identical(b),
        };
        Ok(equal)
    }

    /// Ruby `<=>`; `None` when the values are not comparable.
    pub fn compare(
        &mut self,
        a: &Value,
        b: &Value,
    ) -> EvalResult<Option<Ordering>> {
        let ordering = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64().partial_cmp(&b.as_f64())
            }
            (Value::Str(x), Value::Str(y)) => Some(x.borrow().as_str().cmp(y.borrow().as_str())),
            (Value::Sym(x), Value::Sym(y)) => Some(x.cmp(y)),
            (Value::Array(x), Value::Array(y)) => {
                let (xs, ys) = (x.borrow().clone(), y.borrow().clone());
                for (left, right) in xs.iter().zip(ys.iter()) {
                    match self.compare(left, right)? {
                        Some(Ordering::Equal) => continue,
                        other => return Ok(other),
                    }
                }
                Some(xs.len().cmp(&ys.len()))
            }
            _ => {
                if self.find_method(a, "<=>").is_none() {
                    return Ok(None);
                }
                match self.call_method(a, "<=>", smallvec![b.clone()], None)? {
                    Value::Int(n) => Some(n.cmp(&0)),
                    _ => None,
                }
            }
        };
        Ok(ordering)
    }

    /// `compare`, raising `ArgumentError` for incomparable values
    pub fn compare_strict(
        &mut self,
        a: &Value,
        b: &Value,
    ) -> EvalResult<Ordering> {
        match self.compare(a, b)? {
            Some(ordering) => Ok(ordering),
            None => {
                let left = self.class_of(a).name.clone();
                let right = match b {
                    Value::Object(_) | Value::Class(_) => self.class_of(b).name.clone(),
                    other => self.inspect_or_fallback(other)?,
                };
                self.raise("ArgumentError", format!("comparison of {} with {} failed", left, right))
            }
        }
    }

    /// `pattern === value`, as used by `case` and `rescue`
    pub fn case_eq(
        &mut self,
        pattern: &Value,
        value: &Value,
    ) -> EvalResult<bool> {
        Ok(self
            .call_method(pattern, "===", smallvec![value.clone()], None)?
            .truthy())
    }
}
