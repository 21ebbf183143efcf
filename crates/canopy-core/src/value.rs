//! Dynamic values and records.
//!
//! Props, state, and environment contents are modelled as [`Record`]s: ordered
//! string-keyed maps of [`Value`]s with structural equality. Ordering is
//! deterministic (insertion order) so that traversals and test assertions are
//! stable. [`Props`] wraps a record in an `Rc` so reference identity is
//! observable: a props object that is handed to a component twice without
//! being rebuilt is recognizable via [`Props::ptr_eq`] and de-duplicated by
//! the update path.

use std::ops::Deref;
use std::rc::Rc;

use indexmap::IndexMap;

/// Small dynamic value. Structural equality is what the pure-update policy
/// compares field by field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Ordered field bag. `merge` overwrites existing fields in place and appends
/// new ones at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn merge(&mut self, partial: &Record) {
        for (key, value) in partial.iter() {
            self.entries.insert(key.to_string(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether applying `partial` would change at least one field's value.
    pub fn changes_any(&self, partial: &Record) -> bool {
        partial.iter().any(|(key, value)| self.get(key) != Some(value))
    }
}

/// Immutable-from-the-component's-perspective input data, replaced wholesale
/// on update. Cloning is cheap (`Rc`); [`Props::ptr_eq`] detects a redundant
/// update carrying the very same object.
#[derive(Debug, Clone, Default)]
pub struct Props(Rc<Record>);

impl Props {
    pub fn new(record: Record) -> Self {
        Self(Rc::new(record))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn record(&self) -> &Record {
        &self.0
    }
}

impl Deref for Props {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.0
    }
}

/// Builds a [`Record`] from `key => value` pairs.
#[macro_export]
macro_rules! record {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut record = $crate::Record::new();
        $( record.set($key, $value); )*
        record
    }};
}
