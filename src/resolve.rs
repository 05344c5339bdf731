//! Core resolution pipeline: rank every layer, merge, and convert.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Layers, lowest rank first:
//!
//! 0. Declared field defaults, as an empty mapping. Defaults are applied by
//!    the converter for whatever is still missing after the merge.
//! 1. Config documents in caller order (ranks `1..=k`)
//! 2. The environment-decoded mapping (rank `k + 1`)
//! 3. Explicit overrides (rank `k + 2`, highest)
//!
//! In strict mode each document is checked for unknown keys before merging.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::convert::Converter;
use crate::env::{self, EnvConfig};
use crate::error::Result;
use crate::instance::Instance;
use crate::merge::merge_all;
use crate::schema::{Schema, SchemaRegistry};
use crate::validate;
use crate::value::Mapping;

/// One parsed configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Display name used in logs and in unknown-key errors without a path.
    pub name: String,
    pub path: Option<PathBuf>,
    /// Source text, kept for TOML so unknown keys can be located by line.
    pub text: Option<String>,
    pub mapping: Mapping,
}

impl Document {
    pub fn from_mapping(name: impl Into<String>, mapping: Mapping) -> Self {
        Self {
            name: name.into(),
            path: None,
            text: None,
            mapping,
        }
    }
}

/// Which layer a ranked mapping came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Defaults,
    Document(String),
    Env,
    Overrides,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Defaults => f.write_str("defaults"),
            Origin::Document(name) => write!(f, "document {name}"),
            Origin::Env => f.write_str("environment"),
            Origin::Overrides => f.write_str("overrides"),
        }
    }
}

/// A mapping with its place in the cascade. Higher rank wins on conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSource {
    pub origin: Origin,
    pub rank: usize,
    pub mapping: Mapping,
}

/// All pre-loaded data needed to resolve a record. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// Documents in precedence order: first = lowest priority, last = highest.
    pub documents: Vec<Document>,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// `None` means env disabled.
    pub env: Option<EnvConfig>,
    /// Nested overrides, already expanded from dotted keys.
    pub overrides: Mapping,
    /// Whether to reject unknown keys in documents.
    pub strict: bool,
}

/// Build the ranked layer list, lowest rank first.
pub fn rank_sources(
    registry: &SchemaRegistry,
    schema: &Schema,
    input: ResolveInput,
) -> Result<Vec<RankedSource>> {
    let ResolveInput {
        documents,
        env_vars,
        env,
        overrides,
        strict,
    } = input;

    let mut ranked = Vec::with_capacity(documents.len() + 3);
    ranked.push(RankedSource {
        origin: Origin::Defaults,
        rank: 0,
        mapping: Mapping::new(),
    });

    for doc in documents {
        if strict {
            validate::validate_unknown_keys(registry, schema, &doc)?;
        }
        ranked.push(RankedSource {
            origin: Origin::Document(doc.name),
            rank: ranked.len(),
            mapping: doc.mapping,
        });
    }

    if let Some(config) = &env {
        let mapping = env::decode(config, schema, registry, env_vars)?;
        ranked.push(RankedSource {
            origin: Origin::Env,
            rank: ranked.len(),
            mapping,
        });
    }

    ranked.push(RankedSource {
        origin: Origin::Overrides,
        rank: ranked.len(),
        mapping: overrides,
    });

    Ok(ranked)
}

/// Deep-merge ranked layers in ascending rank order.
pub fn merge_ranked(mut sources: Vec<RankedSource>) -> Mapping {
    sources.sort_by_key(|s| s.rank);
    merge_all(sources.into_iter().map(|s| {
        debug!(origin = %s.origin, rank = s.rank, keys = s.mapping.len(), "merging layer");
        s.mapping
    }))
}

/// Resolve a record instance from pre-loaded inputs.
pub fn resolve(
    registry: &SchemaRegistry,
    schema: &Arc<Schema>,
    input: ResolveInput,
) -> Result<Instance> {
    let ranked = rank_sources(registry, schema, input)?;
    let merged = merge_ranked(ranked);
    Converter::new(registry).from_mapping(schema, merged)
}
