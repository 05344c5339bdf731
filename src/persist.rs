//! Instance persistence: write a record to a document file and read it back.
//!
//! The format is chosen from the file extension. Creates parent directories
//! as needed.

use std::path::Path;

use crate::convert::Converter;
use crate::error::{RecfigError, Result};
use crate::file;
use crate::format;
use crate::instance::Instance;
use crate::record::Record;
use crate::schema::SchemaRegistry;
use crate::value::Mapping;

/// Options for [`to_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// When false, top-level fields still equal to their default are left out.
    pub include_defaults: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            include_defaults: true,
        }
    }
}

/// Pure function: the mapping that would be written for `instance`.
pub fn to_document(registry: &SchemaRegistry, instance: &Instance, opts: SaveOptions) -> Mapping {
    let converter = Converter::new(registry);
    let mapping = converter.to_mapping(instance);
    if opts.include_defaults {
        return mapping;
    }
    let schema = instance.schema();
    mapping
        .into_iter()
        .filter(|(key, value)| {
            schema
                .field(key)
                .and_then(|field| converter.default_value(field, key))
                .is_none_or(|default| &default != value)
        })
        .collect()
}

/// I/O wrapper: serialize `instance` and write it to `path`.
pub fn to_path(
    registry: &SchemaRegistry,
    instance: &Instance,
    path: &Path,
    opts: SaveOptions,
) -> Result<()> {
    let format = format::for_path(path).ok_or_else(|| RecfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let document = to_document(registry, instance, opts);
    let bytes = format
        .serialize(&document)
        .map_err(|source| RecfigError::SerializeError {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| RecfigError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(path, bytes).map_err(|e| RecfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), record = instance.record_name(), "saved record");
    Ok(())
}

/// Read `path` and convert it into an instance of `R`.
///
/// Unlike discovery, a missing file here is an error.
pub fn from_path<R: Record>(registry: &SchemaRegistry, path: &Path) -> Result<Instance> {
    let doc = file::read_document(path)?.ok_or_else(|| RecfigError::IoError {
        path: path.to_path_buf(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    Converter::new(registry).from_mapping_of::<R>(doc.mapping)
}
