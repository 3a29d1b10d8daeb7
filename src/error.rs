use std::path::PathBuf;

use thiserror::Error;

use crate::cluster::ClusterError;

pub type Result<T> = std::result::Result<T, QupodsError>;

#[derive(Debug, Error)]
pub enum QupodsError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[source] minijinja::Error),

    #[error("Item {index}: rendering failed: {source}")]
    Render {
        index: usize,
        source: minijinja::Error,
    },

    #[error("Item {index}: rendered manifest is not valid YAML: {source}")]
    Manifest {
        index: usize,
        source: serde_yaml::Error,
    },

    #[error("Item {index}: rendered manifest has no metadata.name")]
    MissingJobName { index: usize },

    #[error("Brace pattern {pattern:?}: {reason}")]
    Braces { pattern: String, reason: String },

    #[error("Items file {path}: {source}")]
    Items {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Item {index}: submission of {name} rejected: {source}")]
    Submit {
        index: usize,
        name: String,
        source: ClusterError,
    },

    #[error("Archiving {name} failed: {reason}")]
    Archive { name: String, reason: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl QupodsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QupodsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn archive(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        QupodsError::Archive {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that only spoil the current item. The orchestrator
    /// records these and moves on; everything else aborts the run.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            QupodsError::Render { .. }
                | QupodsError::Manifest { .. }
                | QupodsError::MissingJobName { .. }
                | QupodsError::Submit { .. }
        )
    }
}
