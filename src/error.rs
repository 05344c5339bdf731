use std::path::PathBuf;
use thiserror::Error;

/// Boxed error from a format collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RecfigError {
    #[error("Missing required field '{path}'")]
    MissingField { path: String },

    #[error("Invalid value {raw} for '{path}': expected one of {expected} ({enum_name})")]
    EnumConversion {
        path: String,
        enum_name: &'static str,
        raw: String,
        expected: String,
    },

    #[error("Cannot decode {raw:?} for '{path}' as {expected}")]
    TypeCoercion {
        path: String,
        raw: String,
        expected: &'static str,
    },

    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    UnknownKeys(Vec<RecfigError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError { path: PathBuf, source: BoxError },

    #[error("Failed to serialize {path}: {source}")]
    SerializeError { path: PathBuf, source: BoxError },

    #[error("Unsupported config format for {path} (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to access {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid override '{key}': {reason}")]
    InvalidOverride { key: String, reason: String },

    #[error("Record type {0} is not registered")]
    UnregisteredRecord(&'static str),

    #[error("Cannot bind {record} to its Rust type: {source}")]
    Bind {
        record: &'static str,
        source: serde_json::Error,
    },
}

pub type Result<T, E = RecfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_formats_correctly() {
        let err = RecfigError::UnknownKey {
            key: "typo_key".into(),
            path: "/home/user/.config/myapp/config.toml".into(),
            line: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("typo_key"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn missing_field_names_qualified_path() {
        let err = RecfigError::MissingField {
            path: "database.url".into(),
        };
        assert!(err.to_string().contains("database.url"));
    }

    #[test]
    fn enum_conversion_shows_raw_and_expected() {
        let err = RecfigError::EnumConversion {
            path: "mode".into(),
            enum_name: "Mode",
            raw: "\"turbo\"".into(),
            expected: "FAST, SLOW".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("turbo"));
        assert!(msg.contains("FAST, SLOW"));
        assert!(msg.contains("Mode"));
    }

    #[test]
    fn type_coercion_shows_expected_type() {
        let err = RecfigError::TypeCoercion {
            path: "port".into(),
            raw: "eighty".into(),
            expected: "integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("eighty"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("'port'"));
    }
}
