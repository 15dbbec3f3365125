use std::{io, path::PathBuf};

use thiserror::Error;

/// Fatal errors: any of these aborts a run.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("config file not found at {path}, a template was written there")]
    ConfigMissing { path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("{what} not found at {path}")]
    NotFound { what: &'static str, path: PathBuf },
    #[error("output directory {path} already exists")]
    VersionCollision { path: PathBuf },
    #[error("no version number left after the highest one under {root}")]
    VersionExhausted { root: PathBuf },
    #[error("failed to read candidate list {path}: {source}")]
    CandidateList {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DatasetError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DatasetError::InvalidConfig(msg.into())
    }
}

/// A single sample could not be rendered. Recovered by the driver.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Failed(String),
}

impl RenderError {
    pub fn failed(msg: impl Into<String>) -> Self {
        RenderError::Failed(msg.into())
    }
}

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;
