// src/error.rs
//
// The engine itself never fails. These cover everything around it: rule
// validation before a run, config loading, and per-document batch I/O.

use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

/// A rule that cannot be run as given.
#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
    #[error("tag name must not be empty")]
    EmptyTag,

    #[error("must enter a value for the attribute `{0}`")]
    MissingMatchValue(String),

    #[error("modify without a new tag name while copying the existing attributes would change nothing")]
    NoOpModify,

    #[error("invalid regex `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },
}

/// Failure confined to a single document of a batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read `{id}`: {source}")]
    Read { id: String, source: io::Error },

    #[error("failed to write `{id}`: {source}")]
    Write { id: String, source: io::Error },

    #[error("`{id}` is not valid UTF-8: {source}")]
    Decode { id: String, source: FromUtf8Error },

    #[error("unknown document `{0}`")]
    Missing(String),
}
