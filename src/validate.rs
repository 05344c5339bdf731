//! Strict-mode validation: detect unknown keys in config documents.
//!
//! Walks each document alongside the schema, descending into nested records
//! (including optional ones and sequences of records). Mapping-typed fields
//! accept any key. Each unknown key is reported with its document path and,
//! for TOML text, a best-effort line number.

use std::path::PathBuf;

use crate::descriptor::TypeDescriptor;
use crate::error::{RecfigError, Result};
use crate::resolve::Document;
use crate::schema::{Schema, SchemaRegistry};
use crate::value::{Mapping, Value};

/// Validate that a document contains no keys unknown to `schema`.
pub fn validate_unknown_keys(
    registry: &SchemaRegistry,
    schema: &Schema,
    doc: &Document,
) -> Result<()> {
    let mut unknown_keys: Vec<String> = Vec::new();
    collect_unknown(registry, schema, &doc.mapping, "", &mut unknown_keys);

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let path = doc
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&doc.name));
    let errors: Vec<RecfigError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = doc.text.as_deref().map_or(0, |text| find_key_line(text, &key));
            RecfigError::UnknownKey {
                key,
                path: path.clone(),
                line,
            }
        })
        .collect();

    Err(RecfigError::UnknownKeys(errors))
}

fn collect_unknown(
    registry: &SchemaRegistry,
    schema: &Schema,
    mapping: &Mapping,
    prefix: &str,
    unknown: &mut Vec<String>,
) {
    for (key, value) in mapping {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match schema.field(key) {
            Some(field) => check_value(registry, field.descriptor(), value, &dotted, unknown),
            None => unknown.push(dotted),
        }
    }
}

fn check_value(
    registry: &SchemaRegistry,
    descriptor: &TypeDescriptor,
    value: &Value,
    path: &str,
    unknown: &mut Vec<String>,
) {
    match (descriptor.unwrap_optional(), value) {
        (TypeDescriptor::NestedRecord(id), Value::Mapping(entries)) => {
            if let Some(nested) = registry.get(*id) {
                collect_unknown(registry, &nested, entries, path, unknown);
            }
        }
        (TypeDescriptor::Sequence(element), Value::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_value(registry, element, item, &format!("{path}[{i}]"), unknown);
            }
        }
        _ => {}
    }
}

/// Find the 1-indexed line number for a key in TOML content.
///
/// For a dotted key like `"database.typo"`, tracks the current `[section]` header
/// while scanning and only matches the leaf key when inside the correct section.
///
/// Handles standard `[section]` headers and bare key assignments; quoted keys,
/// inline tables and array-of-tables entries are not located.
/// Returns 0 if the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let Some((leaf, expected_section)) = segments.split_last() else {
        return 0;
    };

    let mut current_section: Vec<&str> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header.split('.').map(str::trim).collect();
            continue;
        }

        if current_section.as_slice() == expected_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
