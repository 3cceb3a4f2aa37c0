//! Tree-walking interpreter
//!
//! An [`Interpreter`] owns everything that survives between statements:
//! the core classes, constants, globals, the top-level local scope and the
//! board. Each [`Interpreter::run`] call compiles one statement and walks
//! its tree with a short-lived [`Exec`], which carries the call stack and
//! the console the script writes to.

mod call;
mod eval;
mod exec;

pub use call::Found;
pub use exec::{EvalResult, Exec, Unwind};
pub(crate) use exec::MESSAGE_IVAR;

use crate::frontend::compiler::Compiler;
use crate::repl::backend_trait::{EngineInitError, RunOutcome};
use crate::runtime::board::{self, Board};
use crate::runtime::builtins;
use crate::runtime::class::{Class, CoreClasses};
use crate::runtime::value::{Args, Object, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::debug;

/// Call depth at which `SystemStackError` is raised
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Local variable scope
pub type Env = Rc<RefCell<Scope>>;

#[derive(Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

// Scopes can reach themselves through captured blocks, so only names are shown.
impl fmt::Debug for Scope {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Scope")
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .field("nested", &self.parent.is_some())
            .finish()
    }
}

pub fn new_env(parent: Option<Env>) -> Env {
    Rc::new(RefCell::new(Scope {
        vars: HashMap::new(),
        parent,
    }))
}

/// Look `name` up through the enclosing scopes.
pub fn lookup_var(
    env: &Env,
    name: &str,
) -> Option<Value> {
    let mut scope = env.clone();
    loop {
        let parent = {
            let current = scope.borrow();
            if let Some(value) = current.vars.get(name) {
                return Some(value.clone());
            }
            current.parent.clone()
        };
        scope = parent?;
    }
}

/// Update the innermost existing binding, or create one in `env`.
pub fn assign_var(
    env: &Env,
    name: &str,
    value: Value,
) {
    let mut scope = env.clone();
    loop {
        let parent = {
            let mut current = scope.borrow_mut();
            if let Some(slot) = current.vars.get_mut(name) {
                *slot = value;
                return;
            }
            current.parent.clone()
        };
        match parent {
            Some(parent) => scope = parent,
            None => break,
        }
    }
    declare_var(env, name, value);
}

/// Bind `name` in `env` itself, shadowing outer scopes.
pub fn declare_var(
    env: &Env,
    name: &str,
    value: Value,
) {
    env.borrow_mut().vars.insert(name.to_string(), value);
}

/// The method a frame is executing, for `super`
#[derive(Debug)]
pub struct MethodCtx {
    pub owner: Rc<Class>,
    pub name: String,
    pub args: Args,
    pub singleton: bool,
}

/// Activation record. Block frames copy the frame they were created in,
/// so `self`, `yield` and `return` inside a block act on the method.
#[derive(Debug, Clone)]
pub struct Frame {
    pub self_value: Value,
    /// Where `def` puts new methods
    pub def_target: Rc<Class>,
    pub block: Option<Value>,
    pub method: Option<Rc<MethodCtx>>,
    pub id: usize,
    /// Tag of the block being run, if this frame runs one.
    pub block_tag: Option<usize>,
    /// `return` may end this frame: methods, lambdas and the top level.
    pub returnable: bool,
}

pub struct Interpreter {
    pub core: CoreClasses,
    pub constants: IndexMap<String, Value>,
    pub globals: HashMap<String, Value>,
    pub board: Box<dyn Board>,
    top_env: Env,
    top: Rc<Frame>,
    compiler: Compiler,
    max_depth: usize,
    next_id: usize,
}

impl fmt::Debug for Interpreter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("constants", &self.constants.keys().collect::<Vec<_>>())
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("top_env", &self.top_env)
            .field("compiler", &self.compiler)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Interpreter {
    /// Boot the core classes and bring the board up.
    pub fn new(mut board: Box<dyn Board>) -> Result<Self, EngineInitError> {
        board::bring_up(board.as_mut()).map_err(|e| EngineInitError::new(e.to_string()))?;
        let core = CoreClasses::boot();
        let main = Value::Object(Object::new(core.object.clone()));
        let top = Rc::new(Frame {
            self_value: main,
            def_target: core.object.clone(),
            block: None,
            method: None,
            id: 0,
            block_tag: None,
            returnable: true,
        });
        let mut constants = IndexMap::new();
        for class in core.all() {
            constants.insert(class.name.clone(), Value::Class(class));
        }
        let mut interp = Interpreter {
            core,
            constants,
            globals: HashMap::new(),
            board,
            top_env: new_env(None),
            top,
            compiler: Compiler::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            next_id: 1,
        };
        builtins::register_all(&mut interp);
        debug!(classes = interp.constants.len(), "interpreter ready");
        Ok(interp)
    }

    pub fn set_max_depth(
        &mut self,
        depth: usize,
    ) {
        self.max_depth = depth;
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Names of the persistent top-level locals
    pub fn top_level_locals(&self) -> HashSet<String> {
        self.top_env.borrow().vars.keys().cloned().collect()
    }

    pub fn local(
        &self,
        name: &str,
    ) -> Option<Value> {
        lookup_var(&self.top_env, name)
    }

    /// Compile and execute one statement against the top-level context.
    pub fn run(
        &mut self,
        source: &str,
        out: &mut dyn Write,
    ) -> RunOutcome<Value> {
        let locals = self.top_level_locals();
        let program = match self.compiler.compile(source, &locals) {
            Ok(program) => program,
            Err(e) => {
                debug!(error = %e, "compile failed");
                let class = self.core.exception_class("SyntaxError");
                return RunOutcome::Raised(exception_value(class, &e.to_string()));
            }
        };
        let env = self.top_env.clone();
        for name in &program.locals {
            if lookup_var(&env, name).is_none() {
                declare_var(&env, name, Value::Nil);
            }
        }
        let mut exec = Exec::new(self, out);
        match exec.eval_body(&program.body, &env) {
            Ok(value) => RunOutcome::Returned(value),
            Err(Unwind::Raise(exc)) => RunOutcome::Raised(exc),
            Err(Unwind::Return { value, .. }) | Err(Unwind::Next(value)) => {
                RunOutcome::Returned(value)
            }
            Err(Unwind::Break { .. }) => {
                let class = self.core.exception_class("LocalJumpError");
                RunOutcome::Raised(exception_value(class, "break from proc-closure"))
            }
        }
    }

    /// `inspect` through method dispatch. `None` when the value's class
    /// has no `inspect` or the call fails.
    pub fn inspect_value(
        &mut self,
        value: &Value,
        out: &mut dyn Write,
    ) -> Option<String> {
        let mut exec = Exec::new(self, out);
        exec.inspect(value).ok().flatten()
    }

    /// `to_s` through method dispatch, or `#<Class>` when that fails.
    pub fn display_string(
        &mut self,
        value: &Value,
    ) -> String {
        let mut sink = io::sink();
        let mut exec = Exec::new(self, &mut sink);
        match exec.to_s(value) {
            Ok(text) => text,
            Err(_) => exec.fallback_string(value),
        }
    }
}

/// Exception object of `class` carrying `message`
pub fn exception_value(
    class: Rc<Class>,
    message: &str,
) -> Value {
    let object = Object::new(class);
    object
        .ivars
        .borrow_mut()
        .insert(MESSAGE_IVAR.to_string(), Value::str(message));
    Value::Object(object)
}

#[cfg(test)]
pub(crate) mod tests;
