//! Where configuration documents come from.
//!
//! Two kinds of document sources feed the merge, in this order:
//!
//! 1. **Discovered files**: `{dir}/{config_name}.toml` or `.json` found by
//!    walking the [`SearchPath`] list, combined according to [`SearchMode`].
//! 2. **Explicit sources**: [`Source`]s added on the builder, in the order
//!    they were added. They outrank every discovered file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Mapping;

/// Where to search for config files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    /// Needs an app name.
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(String),
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
}

/// How discovered files combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Every file found is merged; later search paths win.
    #[default]
    Merge,
    /// Only the file in the highest-priority directory is used.
    FirstMatch,
}

/// Produces a mapping on demand. Called again on every reload.
pub type Loader = Arc<dyn Fn() -> Result<Mapping> + Send + Sync>;

/// An explicit configuration document source.
#[derive(Clone)]
pub enum Source {
    /// A `.toml` or `.json` file. A missing file contributes nothing.
    File(PathBuf),
    /// An in-memory mapping.
    Mapping { name: String, mapping: Mapping },
    /// A callback, for sources the crate does not read itself.
    Loader { name: String, load: Loader },
}

impl Source {
    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Mapping { name, .. } | Source::Loader { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Mapping { name, mapping } => f
                .debug_struct("Mapping")
                .field("name", name)
                .field("keys", &mapping.len())
                .finish(),
            Source::Loader { name, .. } => f.debug_struct("Loader").field("name", name).finish(),
        }
    }
}
