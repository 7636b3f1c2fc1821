use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, validating, or persisting `sky.ron`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sky config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("cannot serialize sky config: {0}")]
    Serialize(#[from] ron::Error),

    /// A value the renderer cannot clamp into a usable range.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
