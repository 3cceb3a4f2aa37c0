//! Method dispatch, blocks and argument binding

use super::{declare_var, new_env, Env, EvalResult, Exec, Frame, MethodCtx, Unwind};
use crate::frontend::parser::ast::{Arg, BlockArg, BlockDef, CallExpr, MethodDef, Params};
use crate::runtime::builtins::range;
use crate::runtime::class::{Class, Method};
use crate::runtime::value::{Args, ProcBody, ProcValue, Value};
use std::rc::Rc;

/// Result of a method lookup
#[derive(Debug, Clone)]
pub struct Found {
    pub owner: Rc<Class>,
    pub method: Method,
    /// Found among singleton methods
    pub singleton: bool,
}

impl<'a> Exec<'a> {
    /// Singleton methods of a class receiver first, then the instance
    /// methods of the receiver's class.
    pub fn find_method(
        &self,
        recv: &Value,
        name: &str,
    ) -> Option<Found> {
        if let Value::Class(class) = recv {
            if let Some((owner, method)) = class.find_singleton_method(name) {
                return Some(Found {
                    owner,
                    method,
                    singleton: true,
                });
            }
        }
        self.class_of(recv)
            .find_method(name)
            .map(|(owner, method)| Found {
                owner,
                method,
                singleton: false,
            })
    }

    pub fn responds_to(
        &self,
        recv: &Value,
        name: &str,
    ) -> bool {
        self.find_method(recv, name).is_some()
    }

    pub fn call_method(
        &mut self,
        recv: &Value,
        name: &str,
        args: Args,
        block: Option<Value>,
    ) -> EvalResult<Value> {
        match self.find_method(recv, name) {
            Some(found) => self.invoke(recv, found, args, block),
            None => self.method_missing(recv, name, args, block),
        }
    }

    /// Ranges and hashes borrow the enumerable methods of `Array`.
    fn method_missing(
        &mut self,
        recv: &Value,
        name: &str,
        args: Args,
        block: Option<Value>,
    ) -> EvalResult<Value> {
        let borrows_array = self.interp.core.array.find_method(name).is_some();
        let items = match recv {
            Value::Range(r) if borrows_array => Some(range::items(self, r)?),
            Value::Hash(hash) if borrows_array => Some(hash.borrow().pairs()),
            _ => None,
        };
        if let Some(items) = items {
            return self.call_method(&Value::array(items), name, args, block);
        }
        let message = format!("undefined method '{}' for {}", name, self.describe(recv));
        self.raise("NoMethodError", message)
    }

    fn invoke(
        &mut self,
        recv: &Value,
        found: Found,
        args: Args,
        block: Option<Value>,
    ) -> EvalResult<Value> {
        match found.method {
            Method::Native(f) => f(self, recv, args, block),
            Method::User(def) => {
                self.invoke_user(recv, &found.owner, &def, found.singleton, args, block)
            }
            Method::AttrReader(ivar) => {
                self.check_args(args.len(), 0, Some(0))?;
                Ok(self.ivar_get(recv, &ivar))
            }
            Method::AttrWriter(ivar) => {
                self.check_args(args.len(), 1, Some(1))?;
                let value = args.into_iter().next().unwrap_or_default();
                self.ivar_set(recv, &ivar, value)
            }
        }
    }

    fn invoke_user(
        &mut self,
        recv: &Value,
        owner: &Rc<Class>,
        def: &Rc<MethodDef>,
        singleton: bool,
        args: Args,
        block: Option<Value>,
    ) -> EvalResult<Value> {
        let id = self.next_id();
        let frame = Frame {
            self_value: recv.clone(),
            def_target: owner.clone(),
            block: block.clone(),
            method: Some(Rc::new(MethodCtx {
                owner: owner.clone(),
                name: def.name.clone(),
                args: args.clone(),
                singleton,
            })),
            id,
            block_tag: None,
            returnable: true,
        };
        let env = new_env(None);
        let result = self.with_frame(frame, |exec| {
            exec.bind_params(&def.params, args, block, &env, true)?;
            exec.eval_begin(&def.body, &env)
        });
        match result {
            Err(Unwind::Return { frame, value }) if frame == id => Ok(value),
            other => other,
        }
    }

    /// Raise `ArgumentError` unless `min <= given <= max`.
    pub fn check_args(
        &self,
        given: usize,
        min: usize,
        max: Option<usize>,
    ) -> EvalResult<()> {
        let fits = given >= min && max.map_or(true, |max| given <= max);
        if fits {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{}..{}", min, max),
            None => format!("{}+", min),
        };
        self.raise(
            "ArgumentError",
            format!("wrong number of arguments (given {}, expected {})", given, expected),
        )
    }

    /// Bind arguments to parameters in `env`. Methods and lambdas check
    /// the count; blocks pad with `nil`, drop extras and spread a single
    /// array over several parameters.
    fn bind_params(
        &mut self,
        params: &Params,
        args: Args,
        block: Option<Value>,
        env: &Env,
        strict: bool,
    ) -> EvalResult<()> {
        let required = params.required.len();
        let optional = params.optional.len();
        let mut args = args.into_vec();
        if strict {
            let max = match params.rest {
                Some(_) => None,
                None => Some(required + optional),
            };
            self.check_args(args.len(), required, max)?;
        } else if args.len() == 1
            && (required + optional > 1 || (required > 0 && params.rest.is_some()))
        {
            if let Some(items) = args[0].array_items() {
                args = items;
            }
        }
        let mut args = args.into_iter();
        for name in &params.required {
            declare_var(env, name, args.next().unwrap_or_default());
        }
        for (name, default) in &params.optional {
            let value = match args.next() {
                Some(value) => value,
                None => self.eval_expr(default, env)?,
            };
            declare_var(env, name, value);
        }
        if let Some(rest) = &params.rest {
            declare_var(env, rest, Value::array(args.collect()));
        }
        if let Some(name) = &params.block {
            declare_var(env, name, block.unwrap_or_default());
        }
        Ok(())
    }

    // ---- blocks ----

    fn make_block(
        &mut self,
        def: &Rc<BlockDef>,
        env: &Env,
    ) -> (Value, usize) {
        let tag = self.next_id();
        let proc = ProcValue {
            body: ProcBody::Block {
                def: def.clone(),
                env: env.clone(),
                frame: self.frame(),
            },
            lambda: false,
            tag,
        };
        (Value::Proc(Rc::new(proc)), tag)
    }

    /// The block passed to a call, and the tag a `break` out of a literal
    /// block carries.
    fn block_arg(
        &mut self,
        block: Option<&BlockArg>,
        env: &Env,
    ) -> EvalResult<(Option<Value>, Option<usize>)> {
        match block {
            None => Ok((None, None)),
            Some(BlockArg::Literal(def)) => {
                let (proc, tag) = self.make_block(def, env);
                Ok((Some(proc), Some(tag)))
            }
            Some(BlockArg::Pass(expr)) => match self.eval_expr(expr, env)? {
                Value::Nil => Ok((None, None)),
                proc @ Value::Proc(_) => Ok((Some(proc), None)),
                Value::Sym(name) => Ok((Some(self.symbol_proc(name)), None)),
                other => {
                    let class = self.class_of(&other);
                    self.raise(
                        "TypeError",
                        format!("wrong argument type {} (expected Proc)", class.name),
                    )
                }
            },
        }
    }

    /// `&:name` as a proc
    pub fn symbol_proc(
        &mut self,
        name: Rc<str>,
    ) -> Value {
        let tag = self.next_id();
        Value::Proc(Rc::new(ProcValue {
            body: ProcBody::Symbol(name),
            lambda: false,
            tag,
        }))
    }

    /// Invoke a block, proc or lambda.
    pub fn call_proc(
        &mut self,
        proc: &Rc<ProcValue>,
        args: Args,
        block: Option<Value>,
    ) -> EvalResult<Value> {
        let (def, env, frame) = match &proc.body {
            ProcBody::Symbol(name) => {
                let mut args = args.into_iter();
                let Some(recv) = args.next() else {
                    return self.raise("ArgumentError", "no receiver given");
                };
                return self.call_method(&recv, name, args.collect(), block);
            }
            ProcBody::Block { def, env, frame } => (def.clone(), env.clone(), frame.clone()),
        };
        let mut frame = (*frame).clone();
        frame.block_tag = Some(proc.tag);
        if proc.lambda {
            frame.id = self.next_id();
            frame.returnable = true;
        } else {
            frame.returnable = false;
        }
        let id = frame.id;
        let lambda = proc.lambda;
        let scope = new_env(Some(env));
        let result = self.with_frame(frame, |exec| {
            exec.bind_params(&def.params, args, block, &scope, lambda)?;
            exec.eval_body(&def.body, &scope)
        });
        match result {
            Err(Unwind::Next(value)) => Ok(value),
            Err(Unwind::Return { frame, value }) if lambda && frame == id => Ok(value),
            Err(Unwind::Break {
                tag: Some(tag),
                value,
            }) if lambda && tag == proc.tag => Ok(value),
            other => other,
        }
    }

    /// Call a block value with arguments.
    pub fn call_block(
        &mut self,
        block: &Value,
        args: Args,
    ) -> EvalResult<Value> {
        match block {
            Value::Proc(proc) => self.call_proc(proc, args, None),
            other => self.call_method(other, "call", args, None),
        }
    }

    pub(crate) fn yield_block(
        &mut self,
        args: Args,
    ) -> EvalResult<Value> {
        match self.frame().block.clone() {
            Some(block) => self.call_block(&block, args),
            None => self.raise("LocalJumpError", "no block given (yield)"),
        }
    }

    // ---- call expressions ----

    pub(crate) fn eval_call(
        &mut self,
        call: &CallExpr,
        env: &Env,
    ) -> EvalResult<Value> {
        let recv = match &call.recv {
            Some(expr) => self.eval_expr(expr, env)?,
            None => self.self_value(),
        };
        if call.vcall && !self.responds_to(&recv, &call.name) {
            let message = format!(
                "undefined local variable or method '{}' for {}",
                call.name,
                self.describe(&recv)
            );
            return self.raise("NameError", message);
        }
        let args = self.eval_args(&call.args, env)?;
        let (block, tag) = self.block_arg(call.block.as_ref(), env)?;
        let result = self.call_method(&recv, &call.name, args, block);
        catch_break(result, tag)
    }

    pub(crate) fn eval_super(
        &mut self,
        args: Option<&[Arg]>,
        block: Option<&BlockArg>,
        env: &Env,
    ) -> EvalResult<Value> {
        let frame = self.frame();
        let Some(ctx) = frame.method.clone() else {
            return self.raise("RuntimeError", "super called outside of method");
        };
        let args = match args {
            Some(args) => self.eval_args(args, env)?,
            None => ctx.args.clone(),
        };
        let (block, tag) = match block {
            Some(block) => self.block_arg(Some(block), env)?,
            None => (frame.block.clone(), None),
        };
        let parent = ctx.owner.superclass.clone();
        let found = if ctx.singleton {
            parent
                .as_ref()
                .and_then(|parent| parent.find_singleton_method(&ctx.name))
                .map(|(owner, method)| Found {
                    owner,
                    method,
                    singleton: true,
                })
                .or_else(|| {
                    self.interp
                        .core
                        .class
                        .find_method(&ctx.name)
                        .map(|(owner, method)| Found {
                            owner,
                            method,
                            singleton: false,
                        })
                })
        } else {
            parent
                .as_ref()
                .and_then(|parent| parent.find_method(&ctx.name))
                .map(|(owner, method)| Found {
                    owner,
                    method,
                    singleton: false,
                })
        };
        let Some(found) = found else {
            let message = format!(
                "super: no superclass method '{}' for {}",
                ctx.name,
                self.describe(&frame.self_value)
            );
            return self.raise("NoMethodError", message);
        };
        let result = self.invoke(&frame.self_value, found, args, block);
        catch_break(result, tag)
    }
}

/// A `break` out of the literal block given to this call ends the call.
fn catch_break(
    result: EvalResult<Value>,
    tag: Option<usize>,
) -> EvalResult<Value> {
    match (result, tag) {
        (
            Err(Unwind::Break {
                tag: Some(broken),
                value,
            }),
            Some(tag),
        ) if broken == tag => Ok(value),
        (result, _) => result,
    }
}
