// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use thiserror::Error;

/// The crate's single error type. Every fallible public entry point returns
/// `Result<_, Diagnostic>`; the `Err` path is always paired with a `log::warn!`
/// or `log::error!` record carrying the same text.
#[derive(Debug, Error)]
pub enum Diagnostic {
    #[error("Error: Invalid or empty regex: {0}")]
    InvalidSelector(String),

    #[error("Error: file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Error parsing YAML file: {path}: {source}")]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Error: project version {found} is newer than supported version {supported}")]
    VersionMismatch { found: String, supported: String },

    #[error("Error: {kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Error: inconsistent bus connection on alias {alias}: {detail}")]
    InconsistentBus { alias: String, detail: String },

    #[error("Error: net consistency failure on {net}: {detail}")]
    NetConsistency { net: String, detail: String },

    #[error("Error: missing required field `{field}` in reset config `{context}`")]
    ResetConfig { context: String, field: &'static str },

    #[error("Error: front-end parse failure: {0}")]
    FrontEnd(String),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Diagnostic>;
