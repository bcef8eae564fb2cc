//! @ai:module:intent Define error types for mlbench operations
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for all library operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Unknown row id {0}")]
    UnknownRow(usize),

    #[error("Invalid role assignment: {0}")]
    InvalidRole(String),

    #[error("Unknown {kind} '{id}'")]
    UnknownId { kind: &'static str, id: String },

    #[error("Invalid value for parameter '{id}': {message}")]
    InvalidParam { id: String, message: String },

    #[error("Incompatible types: {0}")]
    TypeMismatch(String),

    #[error("Resampling is not instantiated")]
    NotInstantiated,

    #[error("Resampling was instantiated on task '{instantiated}', not on '{task}'")]
    ResamplingMismatch { instantiated: String, task: String },

    #[error("Invalid resampling: {0}")]
    InvalidResampling(String),

    #[error("Learner '{learner}' failed to train: {message}")]
    Train { learner: String, message: String },

    #[error("Learner '{learner}' failed to predict: {message}")]
    Predict { learner: String, message: String },

    #[error("Learner '{0}' has not been trained")]
    NotTrained(String),

    #[error("Measure '{measure}' cannot be computed: {message}")]
    Measure { measure: String, message: String },

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Tuning failed: {0}")]
    Tuning(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// @ai:intent Shorthand for an unknown identifier in a registry lookup
    /// @ai:effects pure
    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Error::UnknownId {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_param(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParam {
            id: id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
