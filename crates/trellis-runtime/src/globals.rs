#![forbid(unsafe_code)]

//! Named application state.
//!
//! [`Globals`] maps variable names to values, usually observables. Lookups
//! take dotted paths (`"user.name"`) and walk record fields. The soft
//! accessors ([`Globals::get_value`], [`Globals::set_value`]) log unknown
//! variables and carry on; the strict ones return
//! [`Error::UnknownVariable`].
//!
//! A registry can be attached to a [`RenderSession`] so the theme and device
//! switches reach the page.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use trellis_core::{Error, Result};
use trellis_dom::{Device, RenderSession};
use trellis_reactive::{Dependency, Mutable, MutableList, Value};

type LoadListener = Box<dyn Fn() -> Result<()>>;

/// Named variables plus the page lifecycle hooks that go with them.
#[derive(Default)]
pub struct Globals {
    vars: RefCell<IndexMap<String, Value>>,
    session: RefCell<Weak<RenderSession>>,
    on_load: RefCell<Vec<LoadListener>>,
    loaded: Cell<bool>,
}

impl fmt::Debug for Globals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Globals")
            .field("vars", &self.vars.borrow().keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded.get())
            .finish_non_exhaustive()
    }
}

/// Split `a.b.c` into `a` and the remaining field names.
fn split_path(path: &str) -> (&str, Vec<&str>) {
    let mut parts = path.split('.');
    let head = parts.next().unwrap_or_default();
    (head, parts.filter(|p| !p.is_empty()).collect())
}

fn is_observable(value: &Value) -> bool {
    matches!(value, Value::Mutable(_) | Value::List(_) | Value::Record(_))
}

impl Globals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a JSON object. Arrays become lists, objects
    /// become records and everything else a [`Mutable`].
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(Error::descriptor("state must be a JSON object"));
        };
        let globals = Self::new();
        for (name, value) in map {
            globals.insert(&name, Value::from_json(value));
        }
        Ok(globals)
    }

    /// Register `name`. Plain values are wrapped in a [`Mutable`] so they
    /// can be bound and written.
    pub fn insert(&self, name: &str, value: Value) {
        let value = if is_observable(&value) {
            value
        } else {
            Value::Mutable(Mutable::new(value))
        };
        tracing::trace!(name, kind = value.type_name(), "global registered");
        self.vars.borrow_mut().insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }

    // -- lookup ----------------------------------------------------------------

    /// The observable handle at `path`: the variable itself, or the cell of
    /// the record field the path names.
    pub fn lookup(&self, path: &str) -> Result<Value> {
        let (name, fields) = split_path(path);
        let unknown = || Error::UnknownVariable {
            path: path.to_owned(),
        };
        let mut current = self.vars.borrow().get(name).cloned().ok_or_else(unknown)?;
        for field in fields {
            let record = current.as_record().ok_or_else(unknown)?;
            current = Value::Mutable(record.get(field).ok_or_else(unknown)?);
        }
        Ok(current)
    }

    /// The observable at `path` as a [`Dependency`].
    pub fn dependency(&self, path: &str) -> Result<Dependency> {
        Ok(Dependency::wrap(self.lookup(path)?))
    }

    /// The current value at `path`, or `None` (logged) when nothing is
    /// registered there.
    #[must_use]
    pub fn get_value(&self, path: &str) -> Option<Value> {
        match self.lookup(path) {
            Ok(value) => Some(Dependency::wrap(value).get_value()),
            Err(_) => {
                tracing::warn!(%path, "variable is not registered, ignoring");
                None
            }
        }
    }

    /// Write `value` at `path`. Unknown variables are logged and ignored;
    /// type errors from the write itself propagate.
    pub fn set_value(&self, path: &str, value: Value) -> Result<()> {
        let target = match self.lookup(path) {
            Ok(target) => target,
            Err(_) => {
                tracing::warn!(%path, "variable is not registered, ignoring");
                return Ok(());
            }
        };
        tracing::debug!(%path, "set value");
        match target {
            Value::Mutable(m) => m.set(value),
            Value::List(list) => list.set_all(value),
            Value::Record(record) => record.set_all(&value),
            other => {
                tracing::warn!(%path, kind = other.type_name(), "variable is not observable, ignoring");
                Ok(())
            }
        }
    }

    /// Write a JSON value at `path`.
    pub fn set_json(&self, path: &str, json: serde_json::Value) -> Result<()> {
        self.set_value(path, Value::from_json(json))
    }

    /// Flip the boolean at `path`.
    pub fn toggle(&self, path: &str) -> Result<()> {
        let current = self.get_value(path).is_some_and(|v| v.is_truthy());
        self.set_value(path, Value::from(!current))
    }

    /// Add `by` to the integer at `path`.
    pub fn increment(&self, path: &str, by: i64) -> Result<()> {
        let Some(current) = self.get_value(path) else {
            return Ok(());
        };
        let current = current
            .as_i64()
            .ok_or_else(|| Error::mismatch("integer", current.type_name()))?;
        self.set_value(path, Value::from(current + by))
    }

    // -- lists -------------------------------------------------------------------

    /// The list registered at `path`.
    pub fn list(&self, path: &str) -> Result<MutableList> {
        let value = self.lookup(path)?;
        value
            .as_list()
            .ok_or_else(|| Error::mismatch("list", value.resolve().type_name()))
    }

    pub fn append(&self, path: &str, item: Value) -> Result<()> {
        self.list(path)?.push(item)
    }

    pub fn pop(&self, path: &str) -> Result<()> {
        self.list(path)?.pop()
    }

    pub fn insert_at(&self, path: &str, index: usize, item: Value) -> Result<()> {
        self.list(path)?.insert_at(index, item)
    }

    pub fn delete_at(&self, path: &str, index: usize) -> Result<()> {
        self.list(path)?.delete_at(index)
    }

    pub fn clear_all(&self, path: &str) -> Result<()> {
        self.list(path)?.clear_all()
    }

    /// Replace the whole list at `path`.
    pub fn set_list(&self, path: &str, value: Value) -> Result<()> {
        self.list(path)?.set_all(value)
    }

    // -- session -------------------------------------------------------------

    /// Route theme and device switches to `session`.
    pub fn attach_session(&self, session: &Rc<RenderSession>) {
        *self.session.borrow_mut() = Rc::downgrade(session);
    }

    fn session(&self) -> Option<Rc<RenderSession>> {
        let session = self.session.borrow().upgrade();
        if session.is_none() {
            tracing::warn!("no render session attached, ignoring");
        }
        session
    }

    pub fn toggle_dark_mode(&self) -> Result<()> {
        match self.session() {
            Some(session) => session.set_dark_mode(!session.is_dark_mode()),
            None => Ok(()),
        }
    }

    pub fn enable_dark_mode(&self) -> Result<()> {
        self.session().map_or(Ok(()), |s| s.set_dark_mode(true))
    }

    pub fn enable_light_mode(&self) -> Result<()> {
        self.session().map_or(Ok(()), |s| s.set_dark_mode(false))
    }

    pub fn set_device(&self, device: Device) -> Result<()> {
        self.session().map_or(Ok(()), |s| s.set_device(device))
    }

    /// Pick the device for a viewport `width` under the session's breakpoint.
    pub fn set_viewport_width(&self, width: u32) -> Result<()> {
        match self.session() {
            Some(session) => session.set_device(Device::for_width(session.config(), width)),
            None => Ok(()),
        }
    }

    // -- lifecycle -----------------------------------------------------------

    /// Run `listener` once the page has loaded, or now if it already has.
    pub fn on_load(&self, listener: impl Fn() -> Result<()> + 'static) -> Result<()> {
        if self.loaded.get() {
            return listener();
        }
        self.on_load.borrow_mut().push(Box::new(listener));
        Ok(())
    }

    /// Mark the page loaded and run the queued listeners in registration
    /// order. Later calls do nothing.
    pub fn emit_on_load(&self) -> Result<()> {
        if self.loaded.replace(true) {
            return Ok(());
        }
        let listeners = std::mem::take(&mut *self.on_load.borrow_mut());
        tracing::debug!(count = listeners.len(), "emit on_load");
        for listener in listeners {
            listener()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }
}
