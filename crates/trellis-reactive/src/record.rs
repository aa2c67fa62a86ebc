#![forbid(unsafe_code)]

//! Observable record: named fields, each a [`Mutable`].
//!
//! Field cells are never swapped out once created. Whole-record writes
//! ([`RecordInstance::set_all`], [`RecordInstance::replace`]) copy values into
//! the existing cells, so closures attached to a field keep working.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use trellis_core::{Error, Result};

use crate::closure::Closure;
use crate::dependents::{ClosureHandle, Dependents, NodeId};
use crate::mutable::Mutable;
use crate::value::{Value, object_from_fields};

struct RecordInner {
    fields: RefCell<IndexMap<String, Mutable>>,
    dependents: RefCell<Dependents>,
}

#[derive(Clone)]
pub struct RecordInstance {
    inner: Rc<RecordInner>,
}

impl fmt::Debug for RecordInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.fields.try_borrow() {
            Ok(fields) => f.debug_map().entries(fields.iter()).finish(),
            Err(_) => f.write_str("RecordInstance(<borrowed>)"),
        }
    }
}

impl Default for RecordInstance {
    fn default() -> Self {
        Self::new(std::iter::empty::<(String, Value)>())
    }
}

impl RecordInstance {
    pub fn new<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), Mutable::new(v)))
            .collect();
        Self {
            inner: Rc::new(RecordInner {
                fields: RefCell::new(fields),
                dependents: RefCell::new(Dependents::default()),
            }),
        }
    }

    pub(crate) fn from_json(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::new(map.into_iter().map(|(k, v)| (k, Value::from_json(v))))
    }

    /// The cell for field `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Mutable> {
        self.inner.fields.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Field cells in declaration order. The cells are shared.
    #[must_use]
    pub fn fields(&self) -> IndexMap<String, Mutable> {
        self.inner.fields.borrow().clone()
    }

    /// Write one field, creating it when absent, then notify the record.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        match self.get(key) {
            Some(field) => field.set(value)?,
            None => {
                self.inner
                    .fields
                    .borrow_mut()
                    .insert(key.to_owned(), Mutable::new(value));
            }
        }
        self.notify()
    }

    /// [`set`](Self::set), returning the record for chaining.
    pub fn set_and_return(&self, key: &str, value: Value) -> Result<Self> {
        self.set(key, value)?;
        Ok(self.clone())
    }

    /// Copy every field of `value` that this record also has. Fields the
    /// record lacks are ignored.
    pub fn set_all(&self, value: &Value) -> Result<()> {
        let other = value
            .as_record()
            .ok_or_else(|| Error::mismatch("record", value.resolve().type_name()))?;
        if other.ptr_eq(self) {
            return self.notify();
        }
        for (key, source) in other.fields() {
            if let Some(field) = self.get(&key) {
                field.set(source.get().resolve())?;
            }
        }
        self.notify()
    }

    /// Replace every field's value from `other`.
    ///
    /// Fails without touching anything when `other` lacks one of this
    /// record's fields. Field cells keep their identity: values are written
    /// silently first, then each field notifies, then the record does.
    pub fn replace(&self, other: &RecordInstance) -> Result<()> {
        let fields = self.fields();
        if let Some(missing) = fields.keys().find(|k| !other.contains_key(k)) {
            return Err(Error::MissingRecordField {
                field: missing.clone(),
            });
        }
        for (key, field) in &fields {
            if let Some(source) = other.get(key) {
                field.set_without_update(source.get().resolve())?;
            }
        }
        for field in fields.values() {
            field.notify()?;
        }
        self.notify()
    }

    /// Flattened JSON object of the current field values.
    #[must_use]
    pub fn to_object(&self) -> serde_json::Value {
        object_from_fields(&self.inner.fields.borrow())
    }

    /// Deep copies of every field value, keyed by field name.
    #[must_use]
    pub fn cloned_fields(&self) -> IndexMap<String, Value> {
        self.fields()
            .into_iter()
            .map(|(k, field)| (k, field.get().deep_clone()))
            .collect()
    }

    /// Independent record with deep-copied field values.
    #[must_use]
    pub fn get_clone(&self) -> Self {
        Self::new(
            self.fields()
                .into_iter()
                .map(|(k, field)| (k, field.get().resolve().deep_clone())),
        )
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn add_closure(&self, closure: Closure) -> ClosureHandle {
        self.inner.dependents.borrow_mut().add(closure)
    }

    pub fn remove_closure(&self, handle: ClosureHandle) {
        let _removed = self.inner.dependents.borrow_mut().remove(handle);
    }

    pub fn unlink_node(&self, node: NodeId) -> usize {
        let removed = self.inner.dependents.borrow_mut().unlink_node(node);
        removed.len()
    }

    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.borrow().len()
    }

    #[must_use]
    pub fn has_dependents_for(&self, node: NodeId) -> bool {
        self.inner.dependents.borrow().has_node(node)
    }

    pub fn notify(&self) -> Result<()> {
        let closures = self.inner.dependents.borrow().snapshot();
        for closure in closures {
            closure.update()?;
        }
        Ok(())
    }
}
