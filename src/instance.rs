//! Converted record values.
//!
//! An [`Instance`] is immutable once built. Only the converter can create
//! one, after every field has been resolved; there is no way to write a
//! field afterwards.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{RecfigError, Result};
use crate::record::{Record, RecordId};
use crate::schema::{FieldSpec, Schema};
use crate::value::Value;

#[derive(Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Instance {
    pub(crate) fn bind(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.fields().len(), values.len());
        Self { schema, values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).map(|i| &self.values[i])
    }

    /// Look up a dotted path through nested records and mappings.
    pub fn get_path(&self, dotted: &str) -> Option<&Value> {
        let mut segments = dotted.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Record(inner) => inner.get(segment)?,
                Value::Mapping(entries) => entries.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Fields with their values, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldSpec, &Value)> {
        self.schema.fields().iter().zip(&self.values)
    }

    pub fn record_name(&self) -> &'static str {
        self.schema.name()
    }

    pub fn record_id(&self) -> RecordId {
        self.schema.id()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is<R: Record>(&self) -> bool {
        self.record_id() == RecordId::of::<R>()
    }

    /// Bind this instance to a plain serde type, typically the record's own Rust struct.
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::to_value(self)
            .and_then(serde_json::from_value)
            .map_err(|source| RecfigError::Bind {
                record: self.record_name(),
                source,
            })
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.record_id() == other.record_id()
            && self
                .fields()
                .zip(other.fields())
                .filter(|((field, _), _)| field.compare())
                .all(|((_, a), (_, b))| a == b)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.record_name());
        for (field, value) in self.fields().filter(|(field, _)| field.repr()) {
            out.field(field.name(), &Shown(value));
        }
        out.finish()
    }
}

struct Shown<'a>(&'a Value);

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.fields() {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}
