//! Statement and expression evaluation

use super::{assign_var, lookup_var, new_env, Env, EvalResult, Exec, Frame, Unwind};
use crate::frontend::parser::ast::{
    Arg, BeginBlock, ClassDef, Expr, ExprKind, JumpTarget, MethodDef, RescueClause, StrSegment,
    Target, WhenClause,
};
use crate::runtime::builtins::range;
use crate::runtime::class::{Class, ClassKind, Method};
use crate::runtime::value::{Args, HashValue, RangeValue, RegexpValue, Value};
use smallvec::smallvec;
use std::rc::Rc;

/// An assignable place with its receiver and index already evaluated
enum Place {
    Local(String),
    IVar(Value, String),
    GVar(String),
    Const(String),
    Index(Value, Args),
    Attr(Value, String),
}

impl<'a> Exec<'a> {
    pub fn eval_body(
        &mut self,
        body: &[Expr],
        env: &Env,
    ) -> EvalResult<Value> {
        let mut last = Value::Nil;
        for expr in body {
            last = self.eval_expr(expr, env)?;
        }
        Ok(last)
    }

    pub fn eval_expr(
        &mut self,
        expr: &Expr,
        env: &Env,
    ) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::True => Ok(Value::Bool(true)),
            ExprKind::False => Ok(Value::Bool(false)),
            ExprKind::SelfRef => Ok(self.self_value()),
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(segments) => Ok(Value::str(self.interpolate(segments, env)?)),
            ExprKind::Sym(name) => Ok(Value::sym(name)),
            ExprKind::DSym(segments) => {
                let name = self.interpolate(segments, env)?;
                Ok(Value::sym(&name))
            }
            ExprKind::Regexp { parts, flags } => {
                let source = self.interpolate(parts, env)?;
                match RegexpValue::new(&source, flags) {
                    Ok(regexp) => Ok(Value::Regexp(Rc::new(regexp))),
                    Err(e) => self.raise("RegexpError", e.to_string()),
                }
            }
            ExprKind::Array(items) => Ok(Value::array(self.eval_args(items, env)?.into_vec())),
            ExprKind::Hash(pairs) => {
                let mut hash = HashValue::new();
                for (key, value) in pairs {
                    let key = self.eval_expr(key, env)?;
                    let value = self.eval_expr(value, env)?;
                    hash.insert(key, value);
                }
                Ok(Value::hash(hash))
            }
            ExprKind::Range { lo, hi, exclusive } => {
                let start = self.eval_expr(lo, env)?;
                let end = self.eval_expr(hi, env)?;
                self.make_range(start, end, *exclusive)
            }
            ExprKind::LocalVar(name) => Ok(lookup_var(env, name).unwrap_or_default()),
            ExprKind::IVar(name) => Ok(self.ivar_get(&self.self_value(), name)),
            ExprKind::GVar(name) => Ok(self.interp.globals.get(name).cloned().unwrap_or_default()),
            ExprKind::Const { scope, name } => self.eval_const(scope.as_deref(), name, env),
            ExprKind::Assign { target, value } => {
                let value = self.eval_expr(value, env)?;
                let place = self.resolve_place(target, env)?;
                self.write_place(place, value.clone(), env)?;
                Ok(value)
            }
            ExprKind::OpAssign { target, op, value } => self.eval_op_assign(target, op, value, env),
            ExprKind::Call(call) => self.eval_call(call, env),
            ExprKind::Super { args, block } => self.eval_super(args.as_deref(), block.as_ref(), env),
            ExprKind::Yield(args) => {
                let args = self.eval_args(args, env)?;
                self.yield_block(args)
            }
            ExprKind::Not(operand) => Ok(Value::Bool(!self.eval_expr(operand, env)?.truthy())),
            ExprKind::And(left, right) => {
                let left = self.eval_expr(left, env)?;
                if !left.truthy() {
                    return Ok(left);
                }
                self.eval_expr(right, env)
            }
            ExprKind::Or(left, right) => {
                let left = self.eval_expr(left, env)?;
                if left.truthy() {
                    return Ok(left);
                }
                self.eval_expr(right, env)
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.eval_expr(cond, env)?.truthy() {
                    self.eval_body(then_body, env)
                } else {
                    self.eval_body(else_body, env)
                }
            }
            ExprKind::While {
                cond,
                body,
                until,
                do_while,
            } => self.eval_while(cond, body, *until, *do_while, env),
            ExprKind::Case {
                subject,
                whens,
                else_body,
            } => self.eval_case(subject.as_deref(), whens, else_body.as_deref(), env),
            ExprKind::Begin(block) => self.eval_begin(block, env),
            ExprKind::Seq(body) => self.eval_body(body, env),
            ExprKind::Def(def) => self.eval_def(def),
            ExprKind::Class(def) => self.eval_class(def, env),
            ExprKind::Return(value) => {
                let value = self.eval_opt(value.as_deref(), env)?;
                let id = self.frame().id;
                if !self.can_return_to(id) {
                    return self.raise("LocalJumpError", "unexpected return");
                }
                Err(Unwind::Return { frame: id, value })
            }
            ExprKind::Break(value, target) => {
                let value = self.eval_opt(value.as_deref(), env)?;
                match target {
                    JumpTarget::Loop => Err(Unwind::Break { tag: None, value }),
                    JumpTarget::Block => Err(Unwind::Break {
                        tag: self.frame().block_tag,
                        value,
                    }),
                    JumpTarget::Invalid => self.raise("SyntaxError", "Invalid break"),
                }
            }
            ExprKind::Next(value, target) => {
                let value = self.eval_opt(value.as_deref(), env)?;
                match target {
                    JumpTarget::Invalid => self.raise("SyntaxError", "Invalid next"),
                    JumpTarget::Loop | JumpTarget::Block => Err(Unwind::Next(value)),
                }
            }
        }
    }

    fn eval_opt(
        &mut self,
        expr: Option<&Expr>,
        env: &Env,
    ) -> EvalResult<Value> {
        match expr {
            Some(expr) => self.eval_expr(expr, env),
            None => Ok(Value::Nil),
        }
    }

    /// Evaluate call arguments, expanding `*splat`s.
    pub(crate) fn eval_args(
        &mut self,
        args: &[Arg],
        env: &Env,
    ) -> EvalResult<Args> {
        let mut values = Args::new();
        for arg in args {
            match arg {
                Arg::Expr(expr) => values.push(self.eval_expr(expr, env)?),
                Arg::Splat(expr) => {
                    let value = self.eval_expr(expr, env)?;
                    values.extend(self.splat(value)?);
                }
            }
        }
        Ok(values)
    }

    fn splat(
        &mut self,
        value: Value,
    ) -> EvalResult<Vec<Value>> {
        Ok(match value {
            Value::Nil => Vec::new(),
            Value::Array(items) => items.borrow().clone(),
            Value::Hash(hash) => hash.borrow().pairs(),
            Value::Range(r) => range::items(self, &r)?,
            other => vec![other],
        })
    }

    fn interpolate(
        &mut self,
        segments: &[StrSegment],
        env: &Env,
    ) -> EvalResult<String> {
        let mut text = String::new();
        for segment in segments {
            match segment {
                StrSegment::Lit(lit) => text.push_str(lit),
                StrSegment::Code(body) => {
                    let value = self.eval_body(body, env)?;
                    text.push_str(&self.to_s(&value)?);
                }
            }
        }
        Ok(text)
    }

    pub(crate) fn make_range(
        &mut self,
        start: Value,
        end: Value,
        exclusive: bool,
    ) -> EvalResult<Value> {
        let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Float(_));
        let compatible = start.is_nil()
            || end.is_nil()
            || (numeric(&start) && numeric(&end))
            || Rc::ptr_eq(&self.class_of(&start), &self.class_of(&end));
        if !compatible {
            return self.raise("ArgumentError", "bad value for range");
        }
        Ok(Value::Range(Rc::new(RangeValue {
            start,
            end,
            exclusive,
        })))
    }

    fn eval_const(
        &mut self,
        scope: Option<&Expr>,
        name: &str,
        env: &Env,
    ) -> EvalResult<Value> {
        let prefix = match scope {
            Some(scope) => {
                let value = self.eval_expr(scope, env)?;
                match value {
                    Value::Class(class) => format!("{}::", class.name),
                    other => {
                        let text = self.inspect_or_fallback(&other)?;
                        return self.raise("TypeError", format!("{} is not a class/module", text));
                    }
                }
            }
            None => String::new(),
        };
        match self.interp.constants.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.raise("NameError", format!("uninitialized constant {}{}", prefix, name)),
        }
    }

    // ---- assignment ----

    fn resolve_place(
        &mut self,
        target: &Target,
        env: &Env,
    ) -> EvalResult<Place> {
        Ok(match target {
            Target::Local(name) => Place::Local(name.clone()),
            Target::IVar(name) => Place::IVar(self.self_value(), name.clone()),
            Target::GVar(name) => Place::GVar(name.clone()),
            Target::Const(name) => Place::Const(name.clone()),
            Target::Index { recv, args } => {
                let recv = self.eval_expr(recv, env)?;
                let args = self.eval_args(args, env)?;
                Place::Index(recv, args)
            }
            Target::Attr { recv, name } => {
                let recv = self.eval_expr(recv, env)?;
                Place::Attr(recv, name.clone())
            }
        })
    }

    /// Current value of a place. A missing constant reads as `nil` only
    /// when `lenient` (for `||=`).
    fn read_place(
        &mut self,
        place: &Place,
        lenient: bool,
        env: &Env,
    ) -> EvalResult<Value> {
        match place {
            Place::Local(name) => Ok(lookup_var(env, name).unwrap_or_default()),
            Place::IVar(target, name) => Ok(self.ivar_get(target, name)),
            Place::GVar(name) => Ok(self.interp.globals.get(name).cloned().unwrap_or_default()),
            Place::Const(name) => match self.interp.constants.get(name) {
                Some(value) => Ok(value.clone()),
                None if lenient => Ok(Value::Nil),
                None => self.raise("NameError", format!("uninitialized constant {}", name)),
            },
            Place::Index(recv, args) => self.call_method(recv, "[]", args.clone(), None),
            Place::Attr(recv, name) => self.call_method(recv, name, Args::new(), None),
        }
    }

    fn write_place(
        &mut self,
        place: Place,
        value: Value,
        env: &Env,
    ) -> EvalResult<()> {
        match place {
            Place::Local(name) => assign_var(env, &name, value),
            Place::IVar(target, name) => {
                self.ivar_set(&target, &name, value)?;
            }
            Place::GVar(name) => {
                self.interp.globals.insert(name, value);
            }
            Place::Const(name) => {
                self.interp.constants.insert(name, value);
            }
            Place::Index(recv, mut args) => {
                args.push(value);
                self.call_method(&recv, "[]=", args, None)?;
            }
            Place::Attr(recv, name) => {
                self.call_method(&recv, &format!("{}=", name), smallvec![value], None)?;
            }
        }
        Ok(())
    }

    fn eval_op_assign(
        &mut self,
        target: &Target,
        op: &str,
        value: &Expr,
        env: &Env,
    ) -> EvalResult<Value> {
        let place = self.resolve_place(target, env)?;
        let current = self.read_place(&place, op == "||", env)?;
        let result = match op {
            "||" if current.truthy() => return Ok(current),
            "&&" if !current.truthy() => return Ok(current),
            "||" | "&&" => self.eval_expr(value, env)?,
            _ => {
                let rhs = self.eval_expr(value, env)?;
                self.call_method(&current, op, smallvec![rhs], None)?
            }
        };
        self.write_place(place, result.clone(), env)?;
        Ok(result)
    }

    // ---- control flow ----

    fn eval_while(
        &mut self,
        cond: &Expr,
        body: &[Expr],
        until: bool,
        do_while: bool,
        env: &Env,
    ) -> EvalResult<Value> {
        let mut skip_test = do_while;
        loop {
            if !skip_test && self.eval_expr(cond, env)?.truthy() == until {
                break;
            }
            skip_test = false;
            match self.eval_body(body, env) {
                Ok(_) | Err(Unwind::Next(_)) => {}
                Err(Unwind::Break { tag: None, value }) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Nil)
    }

    fn eval_case(
        &mut self,
        subject: Option<&Expr>,
        whens: &[WhenClause],
        else_body: Option<&[Expr]>,
        env: &Env,
    ) -> EvalResult<Value> {
        let subject = match subject {
            Some(expr) => Some(self.eval_expr(expr, env)?),
            None => None,
        };
        for clause in whens {
            for arg in &clause.values {
                let patterns = match arg {
                    Arg::Expr(expr) => vec![self.eval_expr(expr, env)?],
                    Arg::Splat(expr) => {
                        let value = self.eval_expr(expr, env)?;
                        self.splat(value)?
                    }
                };
                for pattern in patterns {
                    let hit = match &subject {
                        Some(value) => self.case_eq(&pattern, value)?,
                        None => pattern.truthy(),
                    };
                    if hit {
                        return self.eval_body(&clause.body, env);
                    }
                }
            }
        }
        match else_body {
            Some(body) => self.eval_body(body, env),
            None => Ok(Value::Nil),
        }
    }

    /// `begin`/`rescue`/`else`/`ensure`, also the body of every method.
    pub(crate) fn eval_begin(
        &mut self,
        block: &BeginBlock,
        env: &Env,
    ) -> EvalResult<Value> {
        let result = match self.eval_body(&block.body, env) {
            Err(Unwind::Raise(exception)) if !block.rescues.is_empty() => {
                self.rescue(&block.rescues, exception, env)
            }
            Ok(value) => match &block.else_body {
                Some(else_body) => self.eval_body(else_body, env),
                None => Ok(value),
            },
            other => other,
        };
        if let Some(ensure) = &block.ensure {
            self.eval_body(ensure, env)?;
        }
        result
    }

    fn rescue(
        &mut self,
        clauses: &[RescueClause],
        exception: Value,
        env: &Env,
    ) -> EvalResult<Value> {
        for clause in clauses {
            let classes = if clause.classes.is_empty() {
                vec![Value::Class(self.interp.core.exception_class("StandardError"))]
            } else {
                let mut classes = Vec::new();
                for expr in &clause.classes {
                    match self.eval_expr(expr, env)? {
                        Value::Array(items) => classes.extend(items.borrow().iter().cloned()),
                        other => classes.push(other),
                    }
                }
                classes
            };
            let mut matched = false;
            for class in &classes {
                match class {
                    Value::Class(class) => {
                        if self.is_a(&exception, class) {
                            matched = true;
                            break;
                        }
                    }
                    _ => {
                        return self.raise("TypeError", "class or module required for rescue clause")
                    }
                }
            }
            if matched {
                // `$!` is the exception being handled only while its clause runs
                let previous = self.interp.globals.insert("$!".to_string(), exception.clone());
                if let Some(var) = &clause.var {
                    assign_var(env, var, exception);
                }
                let result = self.eval_body(&clause.body, env);
                self.interp
                    .globals
                    .insert("$!".to_string(), previous.unwrap_or_default());
                return result;
            }
        }
        Err(Unwind::Raise(exception))
    }

    // ---- definitions ----

    fn eval_def(
        &mut self,
        def: &Rc<MethodDef>,
    ) -> EvalResult<Value> {
        let frame = self.frame();
        if def.singleton {
            match &frame.self_value {
                Value::Class(class) => class.define_singleton(&def.name, Method::User(def.clone())),
                _ => {
                    return self.raise(
                        "NotImplementedError",
                        "singleton methods are only supported on classes",
                    )
                }
            }
        } else {
            frame.def_target.define(&def.name, Method::User(def.clone()));
        }
        Ok(Value::sym(&def.name))
    }

    fn eval_class(
        &mut self,
        def: &Rc<ClassDef>,
        env: &Env,
    ) -> EvalResult<Value> {
        let superclass = match &def.superclass {
            Some(expr) => match self.eval_expr(expr, env)? {
                Value::Class(class) if class.kind != ClassKind::Module => Some(class),
                _ => return self.raise("TypeError", "superclass must be a Class"),
            },
            None => None,
        };
        let kind_name = if def.module { "module" } else { "class" };
        let class = match self.interp.constants.get(&def.name).cloned() {
            Some(Value::Class(existing)) if (existing.kind == ClassKind::Module) != def.module => {
                return self.raise("TypeError", format!("{} is not a {}", def.name, kind_name));
            }
            Some(Value::Class(existing)) => {
                if let Some(requested) = &superclass {
                    let same = existing
                        .superclass
                        .as_ref()
                        .is_some_and(|current| Rc::ptr_eq(current, requested));
                    if !same {
                        return self.raise(
                            "TypeError",
                            format!("superclass mismatch for class {}", def.name),
                        );
                    }
                }
                existing
            }
            Some(_) => {
                return self.raise("TypeError", format!("{} is not a {}", def.name, kind_name))
            }
            None => {
                let class = if def.module {
                    Class::new(&def.name, None, ClassKind::Module)
                } else {
                    let parent = superclass.unwrap_or_else(|| self.interp.core.object.clone());
                    Class::subclass(&def.name, &parent)
                };
                self.interp
                    .constants
                    .insert(def.name.clone(), Value::Class(class.clone()));
                class
            }
        };
        let frame = Frame {
            self_value: Value::Class(class.clone()),
            def_target: class,
            block: None,
            method: None,
            id: self.next_id(),
            block_tag: None,
            returnable: false,
        };
        let body_env = new_env(None);
        self.with_frame(frame, |exec| exec.eval_body(&def.body, &body_env))
    }
}
