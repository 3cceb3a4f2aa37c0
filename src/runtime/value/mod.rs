//! Runtime values
//!
//! `Value` is the representation of every script object. Immediates
//! (`nil`, booleans, numbers, symbols) are stored inline; everything
//! mutable or identity-bearing is behind an `Rc`, so cloning a `Value`
//! never copies the object it refers to.

pub mod format;

pub use format::{format_float, inspect_str, inspect_sym};

use crate::frontend::parser::ast::BlockDef;
use crate::runtime::class::Class;
use crate::runtime::interpreter::{Env, Frame};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Call arguments
pub type Args = SmallVec<[Value; 4]>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<RefCell<String>>),
    Sym(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<HashValue>>),
    Range(Rc<RangeValue>),
    Regexp(Rc<RegexpValue>),
    Proc(Rc<ProcValue>),
    Class(Rc<Class>),
    Object(Rc<Object>),
}

impl Value {
    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(Rc::new(RefCell::new(text.into())))
    }

    pub fn sym(name: &str) -> Value {
        Value::Sym(Rc::from(name))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn hash(hash: HashValue) -> Value {
        Value::Hash(Rc::new(RefCell::new(hash)))
    }

    /// Everything except `nil` and `false` is true.
    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float, for mixed arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Object identity (`equal?`). Immediates compare by value.
    pub fn identical(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Sym(a), Value::Sym(b)) => a == b,
            _ => match (self.heap_id(), other.heap_id()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Address of the shared object, if the value has one.
    pub fn heap_id(&self) -> Option<usize> {
        let id = match self {
            Value::Str(s) => Rc::as_ptr(s) as *const u8 as usize,
            Value::Array(a) => Rc::as_ptr(a) as *const u8 as usize,
            Value::Hash(h) => Rc::as_ptr(h) as *const u8 as usize,
            Value::Range(r) => Rc::as_ptr(r) as *const u8 as usize,
            Value::Regexp(r) => Rc::as_ptr(r) as *const u8 as usize,
            Value::Proc(p) => Rc::as_ptr(p) as *const u8 as usize,
            Value::Class(c) => Rc::as_ptr(c) as *const u8 as usize,
            Value::Object(o) => Rc::as_ptr(o) as *const u8 as usize,
            _ => return None,
        };
        Some(id)
    }

    /// Snapshot of an array's elements
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", inspect_str(&s.borrow())),
            Value::Sym(s) => write!(f, "{}", inspect_sym(s)),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Hash(h) => f
                .debug_map()
                .entries(h.borrow().iter().map(|(k, v)| (k.clone(), v.clone())))
                .finish(),
            Value::Range(r) => write!(
                f,
                "{:?}{}{:?}",
                r.start,
                if r.exclusive { "..." } else { ".." },
                r.end
            ),
            Value::Regexp(r) => write!(f, "/{}/{}", r.source, r.flags),
            Value::Proc(p) => write!(f, "#<Proc{}>", if p.lambda { " (lambda)" } else { "" }),
            Value::Class(c) => write!(f, "{}", c.name),
            Value::Object(o) => write!(f, "#<{}>", o.class.name),
        }
    }
}

/// Hash key derived from a value. Strings are keyed by content, numbers
/// by value and type, other heap objects by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Sym(Rc<str>),
    Array(Vec<HashKey>),
    Range(Box<HashKey>, Box<HashKey>, bool),
    Id(usize),
}

impl HashKey {
    pub fn of(value: &Value) -> HashKey {
        match value {
            Value::Nil => HashKey::Nil,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Int(i) => HashKey::Int(*i),
            // -0.0 and 0.0 are the same key
            Value::Float(x) => HashKey::Float(if *x == 0.0 { 0 } else { x.to_bits() }),
            Value::Str(s) => HashKey::Str(s.borrow().clone()),
            Value::Sym(s) => HashKey::Sym(s.clone()),
            Value::Array(items) => HashKey::Array(items.borrow().iter().map(HashKey::of).collect()),
            Value::Range(r) => HashKey::Range(
                Box::new(HashKey::of(&r.start)),
                Box::new(HashKey::of(&r.end)),
                r.exclusive,
            ),
            other => HashKey::Id(other.heap_id().unwrap_or_default()),
        }
    }
}

/// Insertion-ordered hash table
#[derive(Debug, Clone, Default)]
pub struct HashValue {
    entries: IndexMap<HashKey, (Value, Value)>,
    /// Returned by `[]` for missing keys.
    pub default: Value,
    /// Block given to `Hash.new`, called with the hash and the key.
    pub default_proc: Option<Value>,
}

impl HashValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        key: &Value,
    ) -> Option<&Value> {
        self.entries.get(&HashKey::of(key)).map(|(_, v)| v)
    }

    pub fn contains_key(
        &self,
        key: &Value,
    ) -> bool {
        self.entries.contains_key(&HashKey::of(key))
    }

    /// Insert or update. String keys are copied so later mutation of
    /// the caller's string does not move the entry.
    pub fn insert(
        &mut self,
        key: Value,
        value: Value,
    ) {
        let key = match key {
            Value::Str(s) => Value::str(s.borrow().clone()),
            other => other,
        };
        let hash_key = HashKey::of(&key);
        match self.entries.get_mut(&hash_key) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(hash_key, (key, value));
            }
        }
    }

    pub fn remove(
        &mut self,
        key: &Value,
    ) -> Option<Value> {
        self.entries.shift_remove(&HashKey::of(key)).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.values().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.values().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.values().map(|(_, v)| v.clone()).collect()
    }

    /// `[key, value]` pairs as arrays
    pub fn pairs(&self) -> Vec<Value> {
        self.iter()
            .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
            .collect()
    }
}

impl FromIterator<(Value, Value)> for HashValue {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut hash = HashValue::new();
        for (k, v) in iter {
            hash.insert(k, v);
        }
        hash
    }
}

#[derive(Debug)]
pub struct RangeValue {
    pub start: Value,
    pub end: Value,
    pub exclusive: bool,
}

impl RangeValue {
    /// Integer bounds, with the exclusive end already applied.
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        let lo = self.start.as_int()?;
        let hi = self.end.as_int()?;
        Some((lo, if self.exclusive { hi - 1 } else { hi }))
    }
}

#[derive(Debug)]
pub struct RegexpValue {
    pub source: String,
    pub flags: String,
    pub regex: regex::Regex,
}

impl RegexpValue {
    /// Compile `source` with Ruby-style option letters (`i`, `m`, `x`).
    pub fn new(
        source: &str,
        flags: &str,
    ) -> Result<Self, regex::Error> {
        let mut inline = String::new();
        for flag in flags.chars() {
            match flag {
                'i' => inline.push('i'),
                'm' => inline.push('s'),
                'x' => inline.push('x'),
                _ => {}
            }
        }
        let pattern = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", inline, source)
        };
        let regex = regex::Regex::new(&pattern)?;
        let mut flags: Vec<char> = flags.chars().filter(|c| "imx".contains(*c)).collect();
        flags.sort_by_key(|c| "mix".find(*c));
        flags.dedup();
        Ok(Self {
            source: source.to_string(),
            flags: flags.into_iter().collect(),
            regex,
        })
    }
}

/// Block, proc or lambda
#[derive(Debug)]
pub struct ProcValue {
    pub body: ProcBody,
    pub lambda: bool,
    /// Identifies the call this block was attached to, for `break`.
    pub tag: usize,
}

#[derive(Debug, Clone)]
pub enum ProcBody {
    Block {
        def: Rc<BlockDef>,
        env: Env,
        frame: Rc<Frame>,
    },
    /// `&:name`
    Symbol(Rc<str>),
}

/// Instance of a user class or of an exception class
#[derive(Debug)]
pub struct Object {
    pub class: Rc<Class>,
    pub ivars: RefCell<IndexMap<String, Value>>,
}

impl Object {
    pub fn new(class: Rc<Class>) -> Rc<Object> {
        Rc::new(Object {
            class,
            ivars: RefCell::new(IndexMap::new()),
        })
    }
}

#[cfg(test)]
mod tests;
