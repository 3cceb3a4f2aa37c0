//! Class objects and the core class hierarchy

use crate::frontend::parser::ast::MethodDef;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Built-in method implementation
pub type NativeFn = fn(&mut Exec<'_>, &Value, Args, Option<Value>) -> EvalResult<Value>;

#[derive(Clone)]
pub enum Method {
    User(Rc<MethodDef>),
    Native(NativeFn),
    /// `attr_reader`; holds the instance variable name with its `@`.
    AttrReader(String),
    AttrWriter(String),
}

impl fmt::Debug for Method {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Method::User(def) => write!(f, "User({})", def.name),
            Method::Native(_) => write!(f, "Native"),
            Method::AttrReader(ivar) => write!(f, "AttrReader({})", ivar),
            Method::AttrWriter(ivar) => write!(f, "AttrWriter({})", ivar),
        }
    }
}

/// What `new` allocates for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Plain objects with instance variables.
    Object,
    /// Immediates and built-in containers; instances come from literals
    /// or a class-specific `new`.
    Builtin,
    /// A `module` body: a method holder with no instances.
    Module,
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub kind: ClassKind,
    methods: RefCell<IndexMap<String, Method>>,
    singleton_methods: RefCell<IndexMap<String, Method>>,
    /// Class-level instance variables
    pub ivars: RefCell<IndexMap<String, Value>>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        kind: ClassKind,
    ) -> Rc<Class> {
        Rc::new(Class {
            name: name.to_string(),
            superclass,
            kind,
            methods: RefCell::new(IndexMap::new()),
            singleton_methods: RefCell::new(IndexMap::new()),
            ivars: RefCell::new(IndexMap::new()),
        })
    }

    /// New class inheriting `parent`'s instance kind
    pub fn subclass(
        name: &str,
        parent: &Rc<Class>,
    ) -> Rc<Class> {
        Class::new(name, Some(parent.clone()), parent.kind)
    }

    pub fn define(
        &self,
        name: &str,
        method: Method,
    ) {
        self.methods.borrow_mut().insert(name.to_string(), method);
    }

    pub fn define_singleton(
        &self,
        name: &str,
        method: Method,
    ) {
        self.singleton_methods
            .borrow_mut()
            .insert(name.to_string(), method);
    }

    pub fn define_native(
        &self,
        name: &str,
        f: NativeFn,
    ) {
        self.define(name, Method::Native(f));
    }

    pub fn define_singleton_native(
        &self,
        name: &str,
        f: NativeFn,
    ) {
        self.define_singleton(name, Method::Native(f));
    }

    /// Instance method lookup along the superclass chain. Returns the
    /// class that defines it.
    pub fn find_method(
        self: &Rc<Self>,
        name: &str,
    ) -> Option<(Rc<Class>, Method)> {
        let mut class = Some(self.clone());
        while let Some(current) = class {
            if let Some(method) = current.methods.borrow().get(name) {
                return Some((current.clone(), method.clone()));
            }
            class = current.superclass.clone();
        }
        None
    }

    /// Singleton (class-level) method lookup along the superclass chain
    pub fn find_singleton_method(
        self: &Rc<Self>,
        name: &str,
    ) -> Option<(Rc<Class>, Method)> {
        let mut class = Some(self.clone());
        while let Some(current) = class {
            if let Some(method) = current.singleton_methods.borrow().get(name) {
                return Some((current.clone(), method.clone()));
            }
            class = current.superclass.clone();
        }
        None
    }

    pub fn has_own_method(
        &self,
        name: &str,
    ) -> bool {
        self.methods.borrow().contains_key(name)
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.borrow().keys().cloned().collect()
    }

    pub fn singleton_method_names(&self) -> Vec<String> {
        self.singleton_methods.borrow().keys().cloned().collect()
    }

    /// `self` followed by every superclass
    pub fn ancestors(self: &Rc<Self>) -> Vec<Rc<Class>> {
        let mut chain = Vec::new();
        let mut class = Some(self.clone());
        while let Some(current) = class {
            class = current.superclass.clone();
            chain.push(current);
        }
        chain
    }

    pub fn inherits_from(
        self: &Rc<Self>,
        other: &Rc<Class>,
    ) -> bool {
        self.ancestors().iter().any(|c| Rc::ptr_eq(c, other))
    }
}

/// Exception classes and their parents, parents first
const EXCEPTION_TREE: &[(&str, &str)] = &[
    ("ScriptError", "Exception"),
    ("NotImplementedError", "ScriptError"),
    ("SyntaxError", "ScriptError"),
    ("StandardError", "Exception"),
    ("ArgumentError", "StandardError"),
    ("IOError", "StandardError"),
    ("IndexError", "StandardError"),
    ("KeyError", "IndexError"),
    ("StopIteration", "IndexError"),
    ("LocalJumpError", "StandardError"),
    ("NameError", "StandardError"),
    ("NoMethodError", "NameError"),
    ("RangeError", "StandardError"),
    ("RegexpError", "StandardError"),
    ("RuntimeError", "StandardError"),
    ("FrozenError", "RuntimeError"),
    ("TypeError", "StandardError"),
    ("ZeroDivisionError", "StandardError"),
    ("SystemStackError", "Exception"),
];

/// The classes every engine starts with
#[derive(Debug)]
pub struct CoreClasses {
    pub basic_object: Rc<Class>,
    pub object: Rc<Class>,
    pub class: Rc<Class>,
    pub nil: Rc<Class>,
    pub true_class: Rc<Class>,
    pub false_class: Rc<Class>,
    pub numeric: Rc<Class>,
    pub integer: Rc<Class>,
    pub float: Rc<Class>,
    pub string: Rc<Class>,
    pub symbol: Rc<Class>,
    pub array: Rc<Class>,
    pub hash: Rc<Class>,
    pub range: Rc<Class>,
    pub regexp: Rc<Class>,
    pub match_data: Rc<Class>,
    pub proc_class: Rc<Class>,
    pub exception: Rc<Class>,
    /// Exception classes by name, independent of constant reassignment.
    pub exceptions: IndexMap<&'static str, Rc<Class>>,
}

impl CoreClasses {
    pub fn boot() -> Self {
        let basic_object = Class::new("BasicObject", None, ClassKind::Object);
        let object = Class::subclass("Object", &basic_object);
        let builtin = |name: &str, parent: &Rc<Class>| {
            Class::new(name, Some(parent.clone()), ClassKind::Builtin)
        };
        let numeric = builtin("Numeric", &object);
        let exception = Class::subclass("Exception", &object);

        let mut exceptions = IndexMap::new();
        exceptions.insert("Exception", exception.clone());
        for (name, parent) in EXCEPTION_TREE {
            let parent = exceptions
                .get(parent)
                .cloned()
                .unwrap_or_else(|| exception.clone());
            exceptions.insert(*name, Class::subclass(name, &parent));
        }

        CoreClasses {
            class: builtin("Class", &object),
            nil: builtin("NilClass", &object),
            true_class: builtin("TrueClass", &object),
            false_class: builtin("FalseClass", &object),
            integer: builtin("Integer", &numeric),
            float: builtin("Float", &numeric),
            string: builtin("String", &object),
            symbol: builtin("Symbol", &object),
            array: builtin("Array", &object),
            hash: builtin("Hash", &object),
            range: builtin("Range", &object),
            regexp: builtin("Regexp", &object),
            match_data: builtin("MatchData", &object),
            proc_class: builtin("Proc", &object),
            numeric,
            basic_object,
            object,
            exception,
            exceptions,
        }
    }

    /// Every core class, for registering constants
    pub fn all(&self) -> Vec<Rc<Class>> {
        let mut classes = vec![
            self.basic_object.clone(),
            self.object.clone(),
            self.class.clone(),
            self.nil.clone(),
            self.true_class.clone(),
            self.false_class.clone(),
            self.numeric.clone(),
            self.integer.clone(),
            self.float.clone(),
            self.string.clone(),
            self.symbol.clone(),
            self.array.clone(),
            self.hash.clone(),
            self.range.clone(),
            self.regexp.clone(),
            self.match_data.clone(),
            self.proc_class.clone(),
        ];
        classes.extend(self.exceptions.values().cloned());
        classes
    }

    pub fn exception_class(
        &self,
        name: &str,
    ) -> Rc<Class> {
        self.exceptions
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.exception.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_lookup_walks_superclasses() {
        let core = CoreClasses::boot();
        core.object.define("hello", Method::AttrReader("@x".into()));
        let (owner, _) = core.integer.find_method("hello").unwrap();
        assert!(Rc::ptr_eq(&owner, &core.object));
        assert!(core.basic_object.find_method("hello").is_none());
    }

    #[test]
    fn test_singleton_methods_are_inherited() {
        let core = CoreClasses::boot();
        let base = Class::subclass("Base", &core.object);
        let derived = Class::subclass("Derived", &base);
        base.define_singleton("make", Method::AttrReader("@x".into()));
        assert!(derived.find_singleton_method("make").is_some());
        assert!(derived.find_method("make").is_none());
    }

    #[test]
    fn test_exception_tree() {
        let core = CoreClasses::boot();
        let key_error = core.exception_class("KeyError");
        assert!(key_error.inherits_from(&core.exception_class("IndexError")));
        assert!(key_error.inherits_from(&core.exception_class("StandardError")));
        let stack = core.exception_class("SystemStackError");
        assert!(!stack.inherits_from(&core.exception_class("StandardError")));
        assert_eq!(key_error.kind, ClassKind::Object);
    }

    #[test]
    fn test_ancestors_order() {
        let core = CoreClasses::boot();
        let names: Vec<String> = core.integer.ancestors().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Integer", "Numeric", "Object", "BasicObject"]);
    }
}
