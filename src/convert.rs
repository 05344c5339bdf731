//! The bidirectional converter between instances and generic mappings.
//!
//! # `from_mapping`
//!
//! Fields are bound in schema order. A field missing from the input takes
//! its default (factories run fresh each time); a missing field without a
//! default is [`RecfigError::MissingField`]. Present values are dispatched on
//! the field's [`TypeDescriptor`]:
//!
//! - `Primitive` values are coerced with a single attempt (see the table
//!   below). When the attempt fails the raw value is **kept**, not rejected.
//! - `Enum` values must match a member ([`enums::coerce`]); this is strict.
//! - `Sequence`, `Mapping` and `NestedRecord` recurse when the raw value has
//!   the matching shape and pass through unchanged otherwise.
//! - `Opaque` values pass through.
//!
//! `null` is accepted for every field as-is, without coercion.
//!
//! | target  | accepted                                             |
//! |---------|------------------------------------------------------|
//! | bool    | `true/false/1/0/yes/no/on/off` (any case), integers  |
//! | integer | numeric text, floats with no fraction, bools         |
//! | float   | integers, numeric text, bools                        |
//! | string  | integers, floats, bools                              |
//!
//! # `to_mapping`
//!
//! The reverse walk: nested records become nested mappings, enum members
//! become their underlying value, everything else is copied. Cyclic data is
//! not detected.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::enums;
use crate::error::{RecfigError, Result};
use crate::instance::Instance;
use crate::record::{FieldConverter, Record};
use crate::schema::{FieldSpec, Schema, SchemaRegistry};
use crate::value::{self, Mapping, Value};

type KeyTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Converter bound to a schema registry.
#[derive(Clone)]
pub struct Converter<'r> {
    registry: &'r SchemaRegistry,
    key_transform: Option<KeyTransform>,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            key_transform: None,
        }
    }

    /// Rename record field keys produced by [`to_mapping`](Self::to_mapping).
    pub fn with_key_transform(
        mut self,
        transform: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_transform = Some(Arc::new(transform));
        self
    }

    pub fn from_mapping(&self, schema: &Arc<Schema>, mapping: Mapping) -> Result<Instance> {
        self.build(schema, mapping, "")
    }

    /// Register `R` if needed and convert `mapping` into an instance of it.
    pub fn from_mapping_of<R: Record>(&self, mapping: Mapping) -> Result<Instance> {
        let schema = self.registry.register::<R>();
        self.from_mapping(&schema, mapping)
    }

    pub fn to_mapping(&self, instance: &Instance) -> Mapping {
        instance
            .fields()
            .map(|(field, value)| (self.key(field.name()), self.plain(value)))
            .collect()
    }

    /// A field's default after conversion, in `to_mapping` form.
    pub(crate) fn default_value(&self, field: &FieldSpec, path: &str) -> Option<Value> {
        let raw = field.default().materialize()?;
        self.convert_field(field, raw, path)
            .ok()
            .map(|v| self.plain(&v))
    }

    fn build(&self, schema: &Arc<Schema>, mut mapping: Mapping, prefix: &str) -> Result<Instance> {
        let mut values = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let path = join_path(prefix, field.name());
            let raw = if field.init() {
                mapping.swap_remove(field.name())
            } else {
                None
            };
            let value = match raw.or_else(|| field.default().materialize()) {
                Some(raw) => self.convert_field(field, raw, &path)?,
                None if !field.init() => Value::Null,
                None => return Err(RecfigError::MissingField { path }),
            };
            values.push(value);
        }
        if !mapping.is_empty() {
            trace!(
                record = schema.name(),
                keys = ?mapping.keys().collect::<Vec<_>>(),
                "ignoring keys with no matching field"
            );
        }
        Ok(Instance::bind(Arc::clone(schema), values))
    }

    fn convert_field(&self, field: &FieldSpec, raw: Value, path: &str) -> Result<Value> {
        self.convert_value(field.descriptor(), field.converter(), raw, path)
    }

    fn convert_value(
        &self,
        descriptor: &TypeDescriptor,
        hook: Option<&dyn FieldConverter>,
        raw: Value,
        path: &str,
    ) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match descriptor {
            TypeDescriptor::Primitive(kind) => match hook {
                Some(hook) => apply_hook(hook, raw, path),
                None => Ok(coerce_primitive(*kind, raw, path)),
            },
            TypeDescriptor::Opaque => match hook {
                Some(hook) => apply_hook(hook, raw, path),
                None => Ok(raw),
            },
            TypeDescriptor::Enum(desc) => enums::coerce_field(desc, raw, path),
            TypeDescriptor::Optional(inner) => self.convert_value(inner, hook, raw, path),
            TypeDescriptor::Sequence(element) => match raw {
                Value::Sequence(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.convert_value(element, None, item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Sequence),
                other => Ok(other),
            },
            TypeDescriptor::Mapping(_, element) => match raw {
                Value::Mapping(entries) => entries
                    .into_iter()
                    .map(|(key, item)| {
                        let item_path = join_path(path, &key);
                        self.convert_value(element, None, item, &item_path)
                            .map(|v| (key, v))
                    })
                    .collect::<Result<Mapping>>()
                    .map(Value::Mapping),
                other => Ok(other),
            },
            TypeDescriptor::NestedRecord(id) => match raw {
                Value::Mapping(entries) => {
                    let schema = self.registry.schema(*id)?;
                    self.build(&schema, entries, path).map(Value::Record)
                }
                other => Ok(other),
            },
        }
    }

    fn key(&self, name: &str) -> String {
        match &self.key_transform {
            Some(transform) => transform(name),
            None => name.to_string(),
        }
    }

    fn plain(&self, value: &Value) -> Value {
        match value {
            Value::Member(member) => member.value().clone(),
            Value::Record(inner) => Value::Mapping(self.to_mapping(inner)),
            Value::Sequence(items) => Value::Sequence(items.iter().map(|v| self.plain(v)).collect()),
            Value::Mapping(entries) => Value::Mapping(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.plain(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn apply_hook(hook: &dyn FieldConverter, raw: Value, path: &str) -> Result<Value> {
    let fallback = raw.clone();
    match hook.convert(raw) {
        Ok(converted) => Ok(converted),
        Err(reason) if hook.strict() => Err(RecfigError::InvalidValue {
            path: path.to_string(),
            reason,
        }),
        Err(reason) => {
            debug!(path, %reason, "field converter failed, keeping raw value");
            Ok(fallback)
        }
    }
}

fn primitive_matches(kind: PrimitiveKind, raw: &Value) -> bool {
    matches!(
        (kind, raw),
        (PrimitiveKind::Bool, Value::Bool(_))
            | (PrimitiveKind::Integer, Value::Integer(_))
            | (PrimitiveKind::Float, Value::Float(_))
            | (PrimitiveKind::String, Value::String(_))
    )
}

/// One coercion attempt; on failure the raw value comes back unchanged.
fn coerce_primitive(kind: PrimitiveKind, raw: Value, path: &str) -> Value {
    if primitive_matches(kind, &raw) {
        return raw;
    }
    let coerced = match (kind, &raw) {
        (PrimitiveKind::Bool, Value::String(s)) => value::parse_bool(s).map(Value::Bool),
        (PrimitiveKind::Bool, Value::Integer(i)) => Some(Value::Bool(*i != 0)),
        (PrimitiveKind::Integer, Value::String(s)) => s.trim().parse().ok().map(Value::Integer),
        (PrimitiveKind::Integer, Value::Float(f)) => float_to_integer(*f).map(Value::Integer),
        (PrimitiveKind::Integer, Value::Bool(b)) => Some(Value::Integer(i64::from(*b))),
        (PrimitiveKind::Float, Value::Integer(i)) => Some(Value::Float(*i as f64)),
        (PrimitiveKind::Float, Value::String(s)) => s.trim().parse().ok().map(Value::Float),
        (PrimitiveKind::Float, Value::Bool(b)) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
        (PrimitiveKind::String, Value::Integer(_) | Value::Float(_) | Value::Bool(_)) => {
            value::scalar_text(&raw).map(Value::String)
        }
        _ => None,
    };
    coerced.unwrap_or_else(|| {
        debug!(
            path,
            expected = kind.name(),
            found = raw.type_name(),
            "keeping uncoerced value"
        );
        raw
    })
}

fn float_to_integer(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// `max_connections` → `maxConnections`.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `max_connections` → `max-connections`.
pub fn kebab_case(name: &str) -> String {
    name.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Node, Painted, Secret, TestConfig};

    fn mapping(json: &str) -> Mapping {
        serde_json::from_str(json).unwrap()
    }

    fn convert(registry: &SchemaRegistry, json: &str) -> Result<Instance> {
        Converter::new(registry).from_mapping_of::<TestConfig>(mapping(json))
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, "{}").unwrap();
        assert_eq!(instance.get("host"), Some(&Value::from("localhost")));
        assert_eq!(instance.get("port"), Some(&Value::Integer(8080)));
        assert_eq!(instance.get_path("database.pool_size"), Some(&Value::Integer(5)));
        assert_eq!(instance.get_path("database.url"), Some(&Value::Null));
        assert_eq!(instance.get("tags"), Some(&Value::Sequence(vec![])));
    }

    #[test]
    fn missing_required_field_names_path() {
        let registry = SchemaRegistry::new();
        let err = Converter::new(&registry)
            .from_mapping_of::<Painted>(Mapping::new())
            .unwrap_err();
        match err {
            RecfigError::MissingField { path } => assert_eq!(path, "name"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn nested_missing_field_is_qualified() {
        let registry = SchemaRegistry::new();
        let err = Converter::new(&registry)
            .from_mapping_of::<Node>(mapping(r#"{"name": "root", "children": [{"value": 1}]}"#))
            .unwrap_err();
        match err {
            RecfigError::MissingField { path } => assert_eq!(path, "children[0].name"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn primitives_coerce_from_text() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, r#"{"port": " 9000 ", "debug": "yes"}"#).unwrap();
        assert_eq!(instance.get("port"), Some(&Value::Integer(9000)));
        assert_eq!(instance.get("debug"), Some(&Value::Bool(true)));
    }

    #[test]
    fn failed_coercion_keeps_raw_value() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, r#"{"port": "eighty", "debug": [1]}"#).unwrap();
        assert_eq!(instance.get("port"), Some(&Value::from("eighty")));
        assert_eq!(
            instance.get("debug"),
            Some(&Value::Sequence(vec![Value::Integer(1)]))
        );
    }

    #[test]
    fn float_with_fraction_stays_float() {
        let registry = SchemaRegistry::new();
        let whole = convert(&registry, r#"{"port": 80.0}"#).unwrap();
        assert_eq!(whole.get("port"), Some(&Value::Integer(80)));
        let fractional = convert(&registry, r#"{"port": 80.5}"#).unwrap();
        assert_eq!(fractional.get("port"), Some(&Value::Float(80.5)));
    }

    #[test]
    fn null_is_kept_for_any_field() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, r#"{"port": null}"#).unwrap();
        assert_eq!(instance.get("port"), Some(&Value::Null));
    }

    #[test]
    fn enum_field_is_strict() {
        let registry = SchemaRegistry::new();
        let err = convert(&registry, r#"{"mode": "turbo"}"#).unwrap_err();
        assert!(matches!(err, RecfigError::EnumConversion { ref path, .. } if path == "mode"));
    }

    #[test]
    fn sequences_recurse_and_non_sequences_pass() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, r#"{"tags": [1, "b"]}"#).unwrap();
        assert_eq!(
            instance.get("tags"),
            Some(&Value::Sequence(vec![Value::from("1"), Value::from("b")]))
        );
        let passthrough = convert(&registry, r#"{"tags": "a,b"}"#).unwrap();
        assert_eq!(passthrough.get("tags"), Some(&Value::from("a,b")));
    }

    #[test]
    fn nested_record_passthrough_for_scalars() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, r#"{"database": 3}"#).unwrap();
        assert_eq!(instance.get("database"), Some(&Value::Integer(3)));
    }

    #[test]
    fn existing_instance_is_kept() {
        let registry = SchemaRegistry::new();
        let converter = Converter::new(&registry);
        let first = convert(&registry, r#"{"database": {"pool_size": 9}}"#).unwrap();
        let db = first.get("database").unwrap().clone();
        let mut input = Mapping::new();
        input.insert("database".into(), db.clone());
        let second = converter.from_mapping_of::<TestConfig>(input).unwrap();
        assert_eq!(second.get("database"), Some(&db));
    }

    #[test]
    fn round_trip_through_mapping() {
        let registry = SchemaRegistry::new();
        let converter = Converter::new(&registry);
        let instance = convert(
            &registry,
            r#"{"host": "h", "port": 1, "mode": "SLOW", "tags": ["x"], "database": {"url": "pg://"}}"#,
        )
        .unwrap();
        let plain = converter.to_mapping(&instance);
        assert_eq!(plain["mode"], Value::from("slow"));
        assert!(plain["database"].as_mapping().is_some());
        let again = converter.from_mapping_of::<TestConfig>(plain).unwrap();
        assert_eq!(again, instance);
    }

    #[test]
    fn to_mapping_keeps_field_order() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, "{}").unwrap();
        let plain = Converter::new(&registry).to_mapping(&instance);
        let keys: Vec<&str> = plain.keys().map(String::as_str).collect();
        assert_eq!(keys, ["host", "port", "debug", "mode", "tags", "database", "limits"]);
    }

    #[test]
    fn key_transform_renames_nested_keys() {
        let registry = SchemaRegistry::new();
        let instance = convert(&registry, "{}").unwrap();
        let plain = Converter::new(&registry)
            .with_key_transform(camel_case)
            .to_mapping(&instance);
        let db = plain["database"].as_mapping().unwrap();
        assert!(db.contains_key("poolSize"));
    }

    #[test]
    fn factory_default_is_fresh_per_conversion() {
        let registry = SchemaRegistry::new();
        let converter = Converter::new(&registry);
        let a = converter.from_mapping_of::<Node>(mapping(r#"{"name": "a"}"#)).unwrap();
        let b = converter.from_mapping_of::<Node>(mapping(r#"{"name": "b"}"#)).unwrap();
        assert_eq!(a.get("children"), Some(&Value::Sequence(vec![])));
        assert_eq!(b.get("children"), Some(&Value::Sequence(vec![])));
    }

    #[test]
    fn non_init_field_ignores_input() {
        let registry = SchemaRegistry::new();
        let instance = Converter::new(&registry)
            .from_mapping_of::<Secret>(mapping(r#"{"user": "u", "token": "t", "created": 5}"#))
            .unwrap();
        assert_eq!(instance.get("created"), Some(&Value::Integer(0)));
    }

    #[test]
    fn lenient_hook_keeps_raw_on_failure() {
        let registry = SchemaRegistry::new();
        let converter = Converter::new(&registry);
        let ok = converter
            .from_mapping_of::<Painted>(mapping(r##"{"name": "n", "color": "RED"}"##))
            .unwrap();
        assert_eq!(ok.get("color"), Some(&Value::from("#ff0000")));
        let kept = converter
            .from_mapping_of::<Painted>(mapping(r##"{"name": "n", "color": "mauve"}"##))
            .unwrap();
        assert_eq!(kept.get("color"), Some(&Value::from("mauve")));
    }

    #[test]
    fn strict_hook_raises_invalid_value() {
        let registry = SchemaRegistry::new();
        let err = Converter::new(&registry)
            .from_mapping_of::<Painted>(mapping(r#"{"name": "n", "opacity": "opaque"}"#))
            .unwrap_err();
        match err {
            RecfigError::InvalidValue { path, .. } => assert_eq!(path, "opacity"),
            other => panic!("Expected InvalidValue, got: {other:?}"),
        }
    }

    #[test]
    fn case_helpers() {
        assert_eq!(camel_case("max_connections"), "maxConnections");
        assert_eq!(camel_case("_private"), "private");
        assert_eq!(kebab_case("pool_size"), "pool-size");
    }
}
