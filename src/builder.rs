use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::env::EnvConfig;
use crate::error::{RecfigError, Result};
use crate::file;
use crate::flatten;
use crate::instance::Instance;
use crate::merge::merge_all;
use crate::overrides;
use crate::persist::{self, SaveOptions};
use crate::record::Record;
use crate::resolve::{self, Document, RankedSource, ResolveInput};
use crate::schema::{Schema, SchemaRegistry};
use crate::types::{SearchMode, SearchPath, Source};
use crate::value::{Mapping, Value};

/// Entry point for building layered settings.
pub struct Recfig;

impl Recfig {
    pub fn builder<R: Record>() -> SettingsBuilder<R> {
        SettingsBuilder::new()
    }
}

#[derive(Debug, Clone)]
enum Override {
    Dotted(String, Value),
    Nested(Mapping),
}

impl Override {
    fn into_mapping(self) -> Result<Mapping> {
        match self {
            Override::Dotted(key, value) => overrides::overrides_to_mapping(&[(key, value)]),
            Override::Nested(mapping) => Ok(mapping),
        }
    }
}

/// Builder for configuring and loading layered settings for record `R`.
///
/// Documents come from two places (see [`types`](crate::types)):
///
/// - **Discovery**: [`search_paths()`](Self::search_paths) and
///   [`search_mode()`](Self::search_mode), looking for `{config_name}.toml|json`.
/// - **Explicit sources**: [`file()`](Self::file), [`mapping()`](Self::mapping)
///   and [`loader()`](Self::loader), in the order they are added.
///
/// Environment variables and overrides are layered on top.
pub struct SettingsBuilder<R: Record> {
    app_name: Option<String>,
    config_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    sources: Vec<Source>,
    env_prefix: Option<String>,
    env_nested_delimiter: Option<String>,
    case_sensitive: bool,
    env_enabled: bool,
    env_vars: Option<Vec<(String, String)>>,
    overrides: Vec<Override>,
    strict: bool,
    registry: Arc<SchemaRegistry>,
    _phantom: PhantomData<R>,
}

impl<R: Record> SettingsBuilder<R> {
    fn new() -> Self {
        Self {
            app_name: None,
            config_name: None,
            search_paths: None,
            search_mode: SearchMode::default(),
            sources: Vec::new(),
            env_prefix: None,
            env_nested_delimiter: None,
            case_sensitive: false,
            env_enabled: true,
            env_vars: None,
            overrides: Vec::new(),
            strict: false,
            registry: Arc::new(SchemaRegistry::new()),
            _phantom: PhantomData,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `config_name` → `"{app_name}"`
    /// - `env_prefix` → `"{APP_NAME}_"` (uppercased, `-` becomes `_`)
    /// - `SearchPath::Platform` resolves to this app's config directory
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Base name of discovered documents, without extension (default: `app_name`).
    pub fn config_name(mut self, name: &str) -> Self {
        self.config_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths (`[Cwd]`) entirely.
    ///
    /// Paths are listed in **priority-ascending** order: the last entry has the
    /// highest priority. See [`SearchPath`] for the available variants.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Cwd])
            .push(path);
        self
    }

    /// Set the search mode (default: [`SearchMode::Merge`]).
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Add a `.toml` or `.json` document. A missing file contributes nothing.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into()));
        self
    }

    /// Add an in-memory document.
    pub fn mapping(mut self, name: &str, mapping: Mapping) -> Self {
        self.sources.push(Source::Mapping {
            name: name.to_string(),
            mapping,
        });
        self
    }

    /// Add a document produced by `load`, called again on every load and reload.
    pub fn loader(
        mut self,
        name: &str,
        load: impl Fn() -> Result<Mapping> + Send + Sync + 'static,
    ) -> Self {
        self.sources.push(Source::Loader {
            name: name.to_string(),
            load: Arc::new(load),
        });
        self
    }

    /// Override the environment variable prefix (default: `"{APP_NAME}_"`).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Separator between nesting levels in variable names (default: `"__"`).
    pub fn env_nested_delimiter(mut self, delimiter: &str) -> Self {
        self.env_nested_delimiter = Some(delimiter.to_string());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Use this table instead of the process environment.
    pub fn env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env_vars = Some(vars.into_iter().collect());
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, unknown keys in documents produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Share a schema registry with other builders or converters.
    pub fn registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Add an override for a dotted key, e.g. `("database.url", "pg://")`.
    pub fn override_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides
            .push(Override::Dotted(key.to_string(), value.into()));
        self
    }

    /// Add a nested override mapping.
    pub fn overrides(mut self, mapping: Mapping) -> Self {
        self.overrides.push(Override::Nested(mapping));
        self
    }

    /// Add overrides from any serializable source, auto-matching by field name.
    ///
    /// Serializes `source` into flat key-value pairs, skips `None` values, and keeps
    /// only keys that match leaf fields of `R`. Non-matching keys are silently ignored,
    /// so unrelated fields like `verbose` are excluded.
    ///
    /// Composes with [`override_value`](Self::override_value). Later calls take precedence.
    pub fn overrides_from<S: Serialize>(mut self, source: &S) -> Result<Self> {
        let pairs = flatten::flatten(source).map_err(|e| RecfigError::InvalidOverride {
            key: "<source>".into(),
            reason: e.to_string(),
        })?;
        let schema = self.schema();
        for (key, value) in pairs {
            if let Some(v) = value
                && overrides::accepts_key(&self.registry, &schema, &key)
            {
                self.overrides.push(Override::Dotted(key, v));
            }
        }
        Ok(self)
    }

    fn schema(&self) -> Arc<Schema> {
        self.registry.register::<R>()
    }

    /// Resolve the effective document name, if discovery applies.
    fn effective_config_name(&self) -> Option<&str> {
        self.config_name.as_deref().or(self.app_name.as_deref())
    }

    /// Resolve the effective search paths.
    fn effective_search_paths(&self) -> Vec<SearchPath> {
        if let Some(paths) = &self.search_paths {
            return paths.clone();
        }
        vec![SearchPath::Cwd]
    }

    /// Resolve the effective env configuration (None if env is disabled or unnamed).
    fn effective_env(&self) -> Option<EnvConfig> {
        if !self.env_enabled {
            return None;
        }
        let prefix = match (&self.env_prefix, &self.app_name) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(app)) => format!("{}_", app.to_uppercase().replace('-', "_")),
            (None, None) => return None,
        };
        let mut config = EnvConfig::new(prefix).case_sensitive(self.case_sensitive);
        if let Some(delimiter) = &self.env_nested_delimiter {
            config = config.nested_delimiter(delimiter.clone());
        }
        Some(config)
    }

    fn override_mapping(&self) -> Result<Mapping> {
        let layers = self
            .overrides
            .iter()
            .cloned()
            .map(Override::into_mapping)
            .collect::<Result<Vec<_>>>()?;
        Ok(merge_all(layers))
    }

    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = match self.effective_config_name() {
            Some(name) => file::load_config_files(
                &self.effective_search_paths(),
                name,
                self.app_name.as_deref(),
                self.search_mode,
            )?,
            None => Vec::new(),
        };

        for source in &self.sources {
            let name = source.name();
            let document = match source {
                Source::File(path) => file::read_document(path)?,
                Source::Mapping { mapping, .. } => {
                    Some(Document::from_mapping(name.clone(), mapping.clone()))
                }
                Source::Loader { load, .. } => Some(Document::from_mapping(name.clone(), load()?)),
            };
            match document {
                Some(doc) => documents.push(doc),
                None => debug!(source = %name, "config file not found, skipping"),
            }
        }
        Ok(documents)
    }

    /// Build the `ResolveInput` from current builder state.
    fn build_input(&self) -> Result<ResolveInput> {
        let env = self.effective_env();
        let env_vars = match (&env, &self.env_vars) {
            (None, _) => Vec::new(),
            (Some(_), Some(vars)) => vars.clone(),
            (Some(_), None) => std::env::vars().collect(),
        };

        Ok(ResolveInput {
            documents: self.load_documents()?,
            env_vars,
            env,
            overrides: self.override_mapping()?,
            strict: self.strict,
        })
    }

    /// The ranked layers a load would merge, lowest rank first.
    pub fn ranked_sources(&self) -> Result<Vec<RankedSource>> {
        let input = self.build_input()?;
        resolve::rank_sources(&self.registry, &self.schema(), input)
    }

    /// Load and resolve the record through all layers.
    pub fn load(&self) -> Result<Instance> {
        let input = self.build_input()?;
        resolve::resolve(&self.registry, &self.schema(), input)
    }

    /// Load and bind the result to `R` itself.
    pub fn load_typed(&self) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.load()?.into_typed()
    }

    /// Load once and keep the builder around for [`Settings::reload`].
    pub fn build(self) -> Result<Settings<R>> {
        let instance = self.load()?;
        Ok(Settings {
            builder: self,
            instance,
        })
    }
}

/// A loaded record plus everything needed to load it again.
pub struct Settings<R: Record> {
    builder: SettingsBuilder<R>,
    instance: Instance,
}

impl<R: Record> Settings<R> {
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn typed(&self) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.instance.into_typed()
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.builder.registry
    }

    /// Re-run the whole pipeline. On error the current instance is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.instance = self.builder.load()?;
        debug!(record = R::NAME, "settings reloaded");
        Ok(())
    }

    pub fn save(&self, path: &Path, opts: SaveOptions) -> Result<()> {
        persist::to_path(&self.builder.registry, &self.instance, path, opts)
    }
}
