//! Type-directed record marshalling and layered settings. Describe a record,
//! point at your sources, and go.
//!
//! Recfig converts between typed record instances and plain ordered
//! mappings, and builds those instances from a cascade of sources: config
//! documents, environment variables, and programmatic overrides.
//!
//! ```ignore
//! let config: AppConfig = Recfig::builder::<AppConfig>()
//!     .app_name("myapp")
//!     .load_typed()?;
//! ```
//!
//! That single call looks for `myapp.toml` / `myapp.json` in the working
//! directory, merges `MYAPP_*` environment variables, fills in declared
//! defaults, and hands you a typed struct.
//!
//! # Records as source of truth
//!
//! A record type implements [`Record`], declaring its fields in order:
//!
//! ```ignore
//! impl Record for AppConfig {
//!     const NAME: &'static str = "AppConfig";
//!
//!     fn describe(fields: &mut Fields) {
//!         fields.field::<String>("host").default("localhost");
//!         fields.field::<u16>("port");
//!         fields.field::<DbConfig>("database").default(Mapping::new());
//!     }
//! }
//! ```
//!
//! The declared type of every field is classified once, at registration,
//! into a closed [`TypeDescriptor`]: primitive, enum, optional, sequence,
//! mapping, nested record, or opaque. All later work pattern-matches on that
//! descriptor. Registration happens in a [`SchemaRegistry`] on first use and
//! is safe under concurrent first use.
//!
//! Fields without a default are required. `Option<T>` fields accept `null`.
//! Field order is significant: it drives binding and the key order of
//! [`Converter::to_mapping`].
//!
//! # Conversion
//!
//! [`Converter::from_mapping`] walks the schema and converts each raw value
//! according to its descriptor. Scalar coercion is **fail-soft**: `"8080"`
//! becomes `8080` for an integer field, but a value that cannot be coerced is
//! kept as-is rather than rejected. Enum fields are **strict**: the raw value
//! must match a member by value or (case-insensitively) by name, otherwise
//! loading fails with [`RecfigError::EnumConversion`].
//!
//! A field may carry a [`FieldConverter`] hook (colors, paths, units). It
//! replaces the built-in coercion for that field and chooses for itself
//! whether a failure is fail-soft or strict.
//!
//! [`Converter::to_mapping`] is the reverse walk. Enum members become their
//! underlying value, nested records become nested mappings, and an optional
//! key transform renames record keys (see [`camel_case`], [`kebab_case`]).
//!
//! # Layer precedence
//!
//! ```text
//! Declared defaults     fields.field(..).default(..)
//!        ↑ overridden by
//! Config documents      discovered files, then explicit sources in order
//!        ↑ overridden by
//! Environment vars      PREFIX_KEY, PREFIX_SECTION__KEY
//!        ↑ overridden by
//! Overrides             .override_value() / .overrides_from()
//! ```
//!
//! Every layer is **sparse**. You only specify the keys you want to override
//! in that layer; unset keys fall through to the layer below. The layers are
//! combined with [`deep_merge`]: nested mappings merge key by key, anything
//! else (including sequences) is replaced wholesale by the higher layer.
//!
//! # Documents
//!
//! Documents are mappings parsed by a [`Format`] chosen from the file
//! extension: TOML ([`TomlFormat`]) and JSON ([`JsonFormat`]). They come
//! from discovery ([`search_paths()`](SettingsBuilder::search_paths), see
//! [`SearchPath`] and [`SearchMode`]) and from explicit sources:
//! [`file()`](SettingsBuilder::file), [`mapping()`](SettingsBuilder::mapping)
//! and [`loader()`](SettingsBuilder::loader). Missing files are skipped.
//!
//! # Environment variables
//!
//! With env prefix `MYAPP_`, variables map via double-underscore nesting:
//!
//! | Env var | Key |
//! |---------|-----|
//! | `MYAPP_HOST` | `host` |
//! | `MYAPP_DATABASE__URL` | `database.url` |
//! | `MYAPP_LIMITS__API` | `limits.api` (mapping entry) |
//!
//! Single `_` within a segment is literal. Unless
//! [`case_sensitive(true)`](SettingsBuilder::case_sensitive) is set, segments
//! match field names ignoring case (`MYAPP_MAXCONN` sets `maxConn`) and
//! anything else is lowercased.
//!
//! Values are decoded by the descriptor of the field they land on: numbers
//! and booleans must parse (a bad value is [`RecfigError::TypeCoercion`]),
//! sequences split on `,`, mappings accept JSON or `k=v,k2=v2`, enum text
//! matching a member's value becomes that value (`2` for an integer member),
//! and `none` clears an optional field.
//!
//! # Strict mode
//!
//! Strict mode is **off by default**. When on, a document key that matches
//! no field fails loading with the document path, key, and (for TOML) the
//! line number:
//!
//! ```text
//! Unknown key 'typo_key' in /home/user/.config/myapp/myapp.toml (line 5)
//! ```
//!
//! # Reload and save
//!
//! [`SettingsBuilder::build`] returns [`Settings`], which keeps the builder
//! so that [`reload()`](Settings::reload) can re-run the whole pipeline.
//! A failed reload leaves the current instance untouched.
//! [`save()`](Settings::save) writes the instance back as TOML or JSON,
//! optionally leaving out fields still at their default.
//!
//! # Error handling
//!
//! All fallible operations return [`RecfigError`]. Errors are designed to
//! be user-facing: field paths are qualified (`database.url`,
//! `servers[0].port`), and the raw value and expected type are included.

pub mod convert;
pub mod descriptor;
pub mod enums;
pub mod env;
pub mod error;
pub mod format;
pub mod instance;
pub mod merge;
pub mod persist;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod value;

mod builder;
mod file;
mod flatten;
mod overrides;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Recfig, Settings, SettingsBuilder};
pub use convert::{Converter, camel_case, kebab_case};
pub use descriptor::{EnumDescriptor, EnumMember, PrimitiveKind, TypeDescriptor};
pub use enums::Member;
pub use env::EnvConfig;
pub use error::{RecfigError, Result};
pub use format::{Format, JsonFormat, TomlFormat};
pub use instance::Instance;
pub use merge::{deep_merge, merge_all};
pub use persist::SaveOptions;
pub use record::{
    Describe, EnumDef, FieldConverter, FieldDecl, FieldDefault, Fields, Record, RecordId,
    RecordType, TypeExpr,
};
pub use resolve::{Document, Origin, RankedSource, ResolveInput};
pub use schema::{FieldSpec, Schema, SchemaRegistry};
pub use types::{SearchMode, SearchPath, Source};
pub use value::{Mapping, Value};
