#![forbid(unsafe_code)]

//! The dynamic value carried by observables and property writes.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Number};

use crate::list::MutableList;
use crate::mutable::Mutable;
use crate::record::RecordInstance;

/// Longest chain of nested [`Mutable`]s [`Value::resolve`] follows.
const MAX_RESOLVE_DEPTH: usize = 64;

/// Any value an observable can hold or a property can receive.
///
/// `Mutable`, `List` and `Record` are shared handles: cloning the `Value`
/// clones the handle, not the contents. Use [`Value::deep_clone`] for an
/// independent copy. Equality is structural through those handles.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    /// An or-type value: `tag` selects the variant, `payload` its data.
    Variant { tag: u8, payload: Box<Value> },
    Mutable(Mutable),
    List(MutableList),
    Record(RecordInstance),
    /// Host data the runtime passes through untouched (component handles).
    Opaque(Rc<dyn Any>),
}

impl Value {
    #[must_use]
    pub fn variant(tag: u8, payload: impl Into<Value>) -> Self {
        Self::Variant {
            tag,
            payload: Box::new(payload.into()),
        }
    }

    #[must_use]
    pub fn opaque<T: Any>(value: T) -> Self {
        Self::Opaque(Rc::new(value))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Variant { .. } => "variant",
            Self::Mutable(_) => "mutable",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Follow nested [`Mutable`]s down to the value they hold.
    #[must_use]
    pub fn resolve(&self) -> Value {
        let mut current = self.clone();
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                Self::Mutable(m) => current = m.get(),
                other => return other,
            }
        }
        tracing::warn!("mutable chain too deep to resolve");
        Self::Null
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.resolve(), Self::Null)
    }

    /// Truthiness used by conditions: null, false, zero and "" are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self.resolve() {
            Self::Null => false,
            Self::Boolean(b) => b,
            Self::Integer(i) => i != 0,
            Self::Decimal(d) => d != 0.0,
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.resolve() {
            Self::Boolean(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self.resolve() {
            Self::Integer(i) => Some(i),
            Self::Decimal(d) if d.fract() == 0.0 => Some(d as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.resolve() {
            Self::Integer(i) => Some(i as f64),
            Self::Decimal(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self.resolve() {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<MutableList> {
        match self.resolve() {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<RecordInstance> {
        match self.resolve() {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// `(tag, payload)` of a variant value.
    #[must_use]
    pub fn as_variant(&self) -> Option<(u8, Value)> {
        match self.resolve() {
            Self::Variant { tag, payload } => Some((tag, *payload)),
            _ => None,
        }
    }

    /// Downcast an [`Value::Opaque`] payload.
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        match self.resolve() {
            Self::Opaque(rc) => rc.downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Resolved value of field `name` when this is a record.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.as_record()?.get(name).map(|m| m.get().resolve())
    }

    /// Plain text form used for inner HTML, attribute and style values.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self.resolve() {
            Self::Null | Self::Opaque(_) => String::new(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s,
            Self::Variant { payload, .. } => payload.to_text(),
            other @ (Self::List(_) | Self::Record(_) | Self::Mutable(_)) => {
                other.to_json().to_string()
            }
        }
    }

    /// Fully flattened JSON form. Variants become `[tag, payload]`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self.resolve() {
            Self::Null | Self::Opaque(_) | Self::Mutable(_) => Json::Null,
            Self::Boolean(b) => Json::Bool(b),
            Self::Integer(i) => Json::Number(i.into()),
            Self::Decimal(d) => Number::from_f64(d).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s),
            Self::Variant { tag, payload } => {
                Json::Array(vec![Json::Number(tag.into()), payload.to_json()])
            }
            Self::List(list) => Json::Array(list.to_values().iter().map(Value::to_json).collect()),
            Self::Record(record) => record.to_object(),
        }
    }

    /// Build a value from JSON: arrays become lists, objects become records.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Decimal(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => {
                Self::List(MutableList::new(items.into_iter().map(Self::from_json)))
            }
            Json::Object(map) => Self::Record(RecordInstance::from_json(map)),
        }
    }

    /// Independent copy: nested observables are recreated, not shared.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Mutable(m) => Self::Mutable(m.get_clone()),
            Self::List(l) => Self::List(l.get_clone()),
            Self::Record(r) => Self::Record(r.get_clone()),
            Self::Variant { tag, payload } => Self::Variant {
                tag: *tag,
                payload: Box::new(payload.deep_clone()),
            },
            other => other.clone(),
        }
    }
}

pub(crate) fn object_from_fields(fields: &IndexMap<String, Mutable>) -> serde_json::Value {
    let mut map = Map::with_capacity(fields.len());
    for (key, field) in fields {
        map.insert(key.clone(), field.get().to_json());
    }
    serde_json::Value::Object(map)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolve(), other.resolve()) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (
                Self::Variant { tag: ta, payload: pa },
                Self::Variant { tag: tb, payload: pb },
            ) => ta == tb && pa == pb,
            (Self::List(a), Self::List(b)) => {
                a.ptr_eq(&b) || a.to_values() == b.to_values()
            }
            (Self::Record(a), Self::Record(b)) => {
                if a.ptr_eq(&b) {
                    return true;
                }
                let (fa, fb) = (a.fields(), b.fields());
                fa.len() == fb.len()
                    && fa.iter().all(|(key, field)| {
                        fb.get(key).is_some_and(|other| field.get() == other.get())
                    })
            }
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Variant { tag, payload } => f
                .debug_struct("Variant")
                .field("tag", tag)
                .field("payload", payload)
                .finish(),
            Self::Mutable(m) => f.debug_tuple("Mutable").field(m).finish(),
            Self::List(l) => f.debug_tuple("List").field(l).finish(),
            Self::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Mutable> for Value {
    fn from(v: Mutable) -> Self {
        Self::Mutable(v)
    }
}

impl From<MutableList> for Value {
    fn from(v: MutableList) -> Self {
        Self::List(v)
    }
}

impl From<RecordInstance> for Value {
    fn from(v: RecordInstance) -> Self {
        Self::Record(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}
