//! File discovery and loading for config documents.
//!
//! # Discovery
//!
//! Each [`SearchPath`] resolves to one directory. Directories are listed in
//! **priority-ascending** order: the last entry has the highest priority.
//! Within a directory, `{config_name}.toml` is tried before
//! `{config_name}.json`.
//!
//! # Resolution
//!
//! - [`SearchMode::Merge`]: all found files are returned in priority order and
//!   deep-merged later on, so later files override earlier ones.
//! - [`SearchMode::FirstMatch`]: the directories are searched from the
//!   **highest-priority end** and the first file found is the sole result.
//!
//! Missing files are skipped in both modes. Only actual I/O errors
//! (permissions, etc.) are propagated.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RecfigError, Result};
use crate::format;
use crate::resolve::Document;
use crate::types::{SearchMode, SearchPath};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (no app name, no home directory).
pub fn resolve_search_path(sp: &SearchPath, app_name: Option<&str>) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name?)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Expand all search paths into concrete directories (priority-ascending).
/// Paths that cannot be resolved are skipped.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: Option<&str>) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| {
            let dir = resolve_search_path(sp, app_name);
            if dir.is_none() {
                debug!(search_path = ?sp, "search path does not resolve, skipping");
            }
            dir
        })
        .collect()
}

/// Discover and load config documents named `config_name`, respecting [`SearchMode`].
pub fn load_config_files(
    search_paths: &[SearchPath],
    config_name: &str,
    app_name: Option<&str>,
    mode: SearchMode,
) -> Result<Vec<Document>> {
    let dirs = expand_search_paths(search_paths, app_name);

    match mode {
        SearchMode::Merge => load_all(&dirs, config_name),
        SearchMode::FirstMatch => load_first_match(&dirs, config_name),
    }
}

fn candidates<'a>(dir: &'a Path, config_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    format::builtin()
        .iter()
        .flat_map(|f| f.extensions().iter())
        .map(move |ext| dir.join(format!("{config_name}.{ext}")))
}

/// Load every config document found across directories (for Merge mode).
fn load_all(dirs: &[PathBuf], config_name: &str) -> Result<Vec<Document>> {
    let mut results = Vec::new();
    for dir in dirs {
        for path in candidates(dir, config_name) {
            if let Some(doc) = read_document(&path)? {
                results.push(doc);
            }
        }
    }
    Ok(results)
}

/// Load only the highest-priority config document found (for FirstMatch mode).
///
/// Searches from the end of the directory list (highest priority) backward.
fn load_first_match(dirs: &[PathBuf], config_name: &str) -> Result<Vec<Document>> {
    for dir in dirs.iter().rev() {
        for path in candidates(dir, config_name) {
            if let Some(doc) = read_document(&path)? {
                return Ok(vec![doc]);
            }
        }
    }
    Ok(vec![])
}

/// Read and parse a document, choosing the format by extension.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_document(path: &Path) -> Result<Option<Document>> {
    let format = format::for_path(path).ok_or_else(|| RecfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RecfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let mapping = format.parse(&bytes).map_err(|source| RecfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), format = format.name(), "loaded config document");
    Ok(Some(Document {
        name: path.display().to_string(),
        path: Some(path.to_path_buf()),
        text: (format.name() == "toml")
            .then(|| String::from_utf8(bytes).ok())
            .flatten(),
        mapping,
    }))
}
