//! Decode a flat environment table into a nested [`Mapping`].
//!
//! Variables are selected by prefix; the remainder is split on the nested
//! delimiter into a key path. The leaf text is decoded according to the
//! descriptor found by walking the schema along that path:
//!
//! | descriptor          | text                                                    |
//! |---------------------|---------------------------------------------------------|
//! | bool                | `true/false/1/0/yes/no/on/off`, else an error           |
//! | integer, float      | parsed, else an error                                   |
//! | `Optional(inner)`   | `none`/`null` is null, else decoded as `inner`          |
//! | `Sequence(elem)`    | split on `,`, items trimmed and decoded as `elem`       |
//! | `Mapping(_, value)` | a JSON object, or `k=v` pairs split on `,`              |
//! | nested record       | a JSON object becomes a mapping                         |
//! | enum                | the value of the member whose value text matches        |
//! | anything else       | kept as text                                            |
//!
//! Environment text has no "already typed" form, so decoding is strict where
//! the converter is lenient.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{RecfigError, Result};
use crate::schema::{FieldSpec, Schema, SchemaRegistry};
use crate::value::{self, Mapping, Value};

/// How environment variables map onto record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub prefix: String,
    /// Separates nesting levels. Single `_` within a segment is literal.
    pub nested_delimiter: String,
    /// When false, the prefix matches in any case and segments are lowercased.
    pub case_sensitive: bool,
}

impl EnvConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            nested_delimiter: "__".to_string(),
            case_sensitive: false,
        }
    }

    pub fn nested_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.nested_delimiter = delimiter.into();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    fn strip_prefix<'k>(&self, key: &'k str) -> Option<&'k str> {
        if self.case_sensitive {
            return key.strip_prefix(&self.prefix);
        }
        let head = key.get(..self.prefix.len())?;
        head.eq_ignore_ascii_case(&self.prefix)
            .then(|| &key[self.prefix.len()..])
    }

    fn segments(&self, rest: &str) -> Vec<String> {
        rest.split(self.nested_delimiter.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| {
                if self.case_sensitive {
                    s.to_string()
                } else {
                    s.to_lowercase()
                }
            })
            .collect()
    }
}

/// Build a nested mapping from the variables in `vars` that carry the prefix.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn decode(
    config: &EnvConfig,
    schema: &Schema,
    registry: &SchemaRegistry,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<Mapping> {
    let mut selected: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(key, _)| config.strip_prefix(key).is_some())
        .collect();
    selected.sort();

    let mut mapping = Mapping::new();
    for (key, raw) in &selected {
        let Some(rest) = config.strip_prefix(key) else {
            continue;
        };
        let mut segments = config.segments(rest);
        if segments.is_empty() {
            continue;
        }
        let descriptor = lookup(registry, schema, &mut segments, config.case_sensitive);
        let path = segments.join(".");
        let value = decode_leaf(descriptor.as_ref(), raw, &path)?;
        trace!(var = %key, %path, "decoded environment variable");
        insert_nested(&mut mapping, &segments, value, key);
    }
    Ok(mapping)
}

/// Walk `segments` through the schema, returning the descriptor they reach.
/// Segments naming record fields are rewritten to the declared field name.
fn lookup(
    registry: &SchemaRegistry,
    schema: &Schema,
    segments: &mut [String],
    case_sensitive: bool,
) -> Option<TypeDescriptor> {
    let (first, rest) = segments.split_first_mut()?;
    let field = find_field(schema, first, case_sensitive)?;
    if field.name() != first.as_str() {
        *first = field.name().to_string();
    }
    descend(registry, field.descriptor(), rest, case_sensitive)
}

fn descend(
    registry: &SchemaRegistry,
    descriptor: &TypeDescriptor,
    rest: &mut [String],
    case_sensitive: bool,
) -> Option<TypeDescriptor> {
    if rest.is_empty() {
        return Some(descriptor.clone());
    }
    match descriptor.unwrap_optional() {
        TypeDescriptor::NestedRecord(id) => {
            let nested: Arc<Schema> = registry.get(*id)?;
            lookup(registry, &nested, rest, case_sensitive)
        }
        TypeDescriptor::Mapping(_, value) => descend(registry, value, &mut rest[1..], case_sensitive),
        _ => None,
    }
}

fn find_field<'s>(schema: &'s Schema, segment: &str, case_sensitive: bool) -> Option<&'s FieldSpec> {
    schema.field(segment).or_else(|| {
        if case_sensitive {
            return None;
        }
        schema
            .fields()
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(segment))
    })
}

fn decode_leaf(descriptor: Option<&TypeDescriptor>, raw: &str, path: &str) -> Result<Value> {
    let Some(descriptor) = descriptor else {
        return Ok(Value::from(raw));
    };
    match descriptor {
        TypeDescriptor::Optional(inner) => {
            let trimmed = raw.trim();
            if trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("null") {
                Ok(Value::Null)
            } else {
                decode_leaf(Some(inner), raw, path)
            }
        }
        TypeDescriptor::Primitive(kind) => decode_primitive(*kind, raw, path),
        TypeDescriptor::Sequence(element) => {
            if raw.trim().is_empty() {
                return Ok(Value::Sequence(Vec::new()));
            }
            raw.split(',')
                .enumerate()
                .map(|(i, item)| decode_leaf(Some(element), item.trim(), &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence)
        }
        TypeDescriptor::Mapping(_, element) => decode_mapping(element, raw, path),
        TypeDescriptor::NestedRecord(_) => Ok(json_object(raw)
            .map(Value::Mapping)
            .unwrap_or_else(|| Value::from(raw))),
        TypeDescriptor::Enum(desc) => Ok(desc
            .position_by_text(raw)
            .map_or_else(|| Value::from(raw), |i| desc.members()[i].value.clone())),
        TypeDescriptor::Opaque => Ok(Value::from(raw)),
    }
}

fn decode_primitive(kind: PrimitiveKind, raw: &str, path: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let decoded = match kind {
        PrimitiveKind::String => return Ok(Value::from(raw)),
        PrimitiveKind::Bool => value::parse_bool(trimmed).map(Value::Bool),
        PrimitiveKind::Integer => trimmed.parse().ok().map(Value::Integer),
        PrimitiveKind::Float => trimmed.parse().ok().map(Value::Float),
    };
    decoded.ok_or_else(|| RecfigError::TypeCoercion {
        path: path.to_string(),
        raw: raw.to_string(),
        expected: kind.name(),
    })
}

fn decode_mapping(element: &TypeDescriptor, raw: &str, path: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    if let Some(entries) = json_object(raw) {
        return Ok(Value::Mapping(entries));
    }
    let mut entries = Mapping::new();
    for pair in raw.split(',') {
        let Some((key, item)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let item_path = format!("{path}.{key}");
        entries.insert(key.to_string(), decode_leaf(Some(element), item.trim(), &item_path)?);
    }
    Ok(Value::Mapping(entries))
}

fn json_object(raw: &str) -> Option<Mapping> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Insert `value` at `segments`, creating intermediate mappings.
/// A nested mapping always wins over a scalar at the same key.
fn insert_nested(mapping: &mut Mapping, segments: &[String], value: Value, var: &str) {
    let Some((key, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        if matches!(mapping.get(key), Some(Value::Mapping(_))) && !matches!(value, Value::Mapping(_)) {
            warn!(var, key = %key, "ignoring variable that conflicts with nested keys");
            return;
        }
        mapping.insert(key.clone(), value);
        return;
    }

    let slot = mapping
        .entry(key.clone())
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !matches!(slot, Value::Mapping(_)) {
        warn!(var, key = %key, "replacing scalar with nested keys");
        *slot = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(sub) = slot {
        insert_nested(sub, rest, value, var);
    }
}
