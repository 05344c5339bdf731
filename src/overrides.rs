//! Convert dotted-key overrides into a nested [`Mapping`].
//!
//! Each `("database.url", Value)` pair is expanded into the nested mapping
//! structure needed for deep-merge with the other sources.

use crate::descriptor::TypeDescriptor;
use crate::error::{RecfigError, Result};
use crate::record::RecordId;
use crate::schema::{Schema, SchemaRegistry};
use crate::value::{Mapping, Value};

/// Convert dotted-key overrides into a nested mapping.
///
/// `("database.url", "pg://")` becomes `{database: {url: "pg://"}}`.
///
/// If multiple entries target the same key, the last one wins. A path that
/// runs through an existing non-mapping value is an error.
pub fn overrides_to_mapping(entries: &[(String, Value)]) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    for (dotted_key, value) in entries {
        set_nested(&mut mapping, dotted_key, value.clone())?;
    }
    Ok(mapping)
}

fn set_nested(mapping: &mut Mapping, dotted_key: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(RecfigError::InvalidOverride {
            key: dotted_key.to_string(),
            reason: "empty key segment".into(),
        });
    }
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| RecfigError::InvalidOverride {
            key: dotted_key.to_string(),
            reason: "empty key".into(),
        })?;

    let mut current = mapping;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = match slot {
            Value::Mapping(sub) => sub,
            other => {
                return Err(RecfigError::InvalidOverride {
                    key: dotted_key.to_string(),
                    reason: format!(
                        "'{}' is already set to a {}",
                        segments[..=depth].join("."),
                        other.type_name()
                    ),
                });
            }
        };
    }

    current.insert(leaf.to_string(), value);
    Ok(())
}

/// Whether a flattened override key lands on a field of `schema`.
///
/// Leaf fields are accepted (`host`, `database.url`); nested record names
/// are not. Keys continuing past a mapping or opaque field (`limits.api`)
/// are accepted, since those fields take arbitrary entries.
pub fn accepts_key(registry: &SchemaRegistry, schema: &Schema, key: &str) -> bool {
    let segments: Vec<&str> = key.split('.').collect();
    accepts_segments(registry, schema, &segments, &mut vec![schema.id()])
}

fn accepts_segments(
    registry: &SchemaRegistry,
    schema: &Schema,
    segments: &[&str],
    visiting: &mut Vec<RecordId>,
) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Some(field) = schema.field(first) else {
        return false;
    };
    match field.descriptor().unwrap_optional() {
        TypeDescriptor::NestedRecord(id) if !visiting.contains(id) => {
            let Some(nested) = registry.get(*id) else {
                return rest.is_empty();
            };
            visiting.push(*id);
            let accepted = accepts_segments(registry, &nested, rest, visiting);
            visiting.pop();
            accepted
        }
        TypeDescriptor::Mapping(..) | TypeDescriptor::Opaque => {
            rest.iter().all(|s| !s.is_empty())
        }
        _ => rest.is_empty(),
    }
}
