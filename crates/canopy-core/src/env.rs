//! Shared environments with copy-on-write delegation.
//!
//! An [`Env`] is a layered lookup: a local override table plus an optional
//! base layer. A child component shares its parent's environment by cloning
//! the handle; [`Env::fork`] creates a delegate layer on top of it. Writes
//! after a fork land in the delegate, while reads of un-overridden keys keep
//! resolving through the base layer live: a later write to the base is
//! visible to every delegate that has not overridden that key. A component
//! that forked independently will not re-sync with a fork made later above
//! it; last writer wins per subtree.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::{Record, Value};

#[derive(Clone)]
pub struct Env {
    inner: Rc<EnvInner>,
}

struct EnvInner {
    base: Option<Env>,
    entries: RefCell<IndexMap<String, Value>>,
}

impl Env {
    /// Root environment with no base layer.
    pub fn new(record: Record) -> Self {
        let mut entries = IndexMap::new();
        for (key, value) in record.iter() {
            entries.insert(key.to_string(), value.clone());
        }
        Self {
            inner: Rc::new(EnvInner {
                base: None,
                entries: RefCell::new(entries),
            }),
        }
    }

    pub fn empty() -> Self {
        Self::new(Record::new())
    }

    /// Delegate layer over `self`. The fork starts with no local overrides.
    pub fn fork(&self) -> Env {
        Self {
            inner: Rc::new(EnvInner {
                base: Some(self.clone()),
                entries: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Whether two handles share the same storage. This is the sharing test
    /// the copy-on-write update path performs before writing.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Local overrides first, then the base chain.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.inner.entries.borrow().get(key) {
            return Some(value.clone());
        }
        self.inner.base.as_ref().and_then(|base| base.get(key))
    }

    /// Writes a local override; the base layer is never touched.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .entries
            .borrow_mut()
            .insert(key.into(), value.into());
    }

    pub fn merge(&self, partial: &Record) {
        let mut entries = self.inner.entries.borrow_mut();
        for (key, value) in partial.iter() {
            entries.insert(key.to_string(), value.clone());
        }
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("overrides", &self.inner.entries.borrow().len())
            .field("layered", &self.inner.base.is_some())
            .finish()
    }
}
