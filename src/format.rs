//! Document formats: bytes to [`Mapping`] and back.
//!
//! The converter and the orchestrator only ever see mappings. Choosing a
//! format from a file extension is done here, at the file boundary.

use std::path::Path;

use crate::error::BoxError;
use crate::value::{Mapping, Value};

pub trait Format: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extensions this format claims, lowercase and without the dot.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, bytes: &[u8]) -> Result<Mapping, BoxError>;

    fn serialize(&self, mapping: &Mapping) -> Result<Vec<u8>, BoxError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl Format for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<Mapping, BoxError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(toml::from_str(text)?)
    }

    /// TOML has no null, so null entries are left out. A null sequence item
    /// is an error.
    fn serialize(&self, mapping: &Mapping) -> Result<Vec<u8>, BoxError> {
        let text = toml::to_string_pretty(&strip_nulls(mapping, "")?)?;
        Ok(text.into_bytes())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<Mapping, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn serialize(&self, mapping: &Mapping) -> Result<Vec<u8>, BoxError> {
        let mut bytes = serde_json::to_vec_pretty(mapping)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

static FORMATS: [&dyn Format; 2] = [&TomlFormat, &JsonFormat];

/// The built-in formats, in discovery order.
pub fn builtin() -> &'static [&'static dyn Format] {
    &FORMATS
}

/// Pick a format from the extension of `path`.
pub fn for_path(path: &Path) -> Option<&'static dyn Format> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    builtin()
        .iter()
        .copied()
        .find(|f| f.extensions().contains(&ext.as_str()))
}

/// Leave out null entries. A null inside a sequence has no TOML form and
/// cannot be left out without shifting the items after it, so it is an error.
fn strip_nulls(mapping: &Mapping, path: &str) -> Result<Mapping, BoxError> {
    let mut out = Mapping::new();
    for (key, value) in mapping {
        let path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        match value {
            Value::Null => {}
            other => {
                out.insert(key.clone(), strip_value(other, &path)?);
            }
        }
    }
    Ok(out)
}

fn strip_value(value: &Value, path: &str) -> Result<Value, BoxError> {
    match value {
        Value::Null => Err(format!("'{path}' holds a null, which TOML cannot represent").into()),
        Value::Mapping(entries) => Ok(Value::Mapping(strip_nulls(entries, path)?)),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| strip_value(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        other => Ok(other.clone()),
    }
}
