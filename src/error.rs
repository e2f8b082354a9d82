use std::path::PathBuf;

use thiserror::Error;

use crate::types::Stage;

/// Central error type for the lemm-core crate.
#[derive(Debug, Error)]
pub enum LemmError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    /// Malformed input handed to a mixing stage or to the pipeline.
    #[error("Input violation: {0}")]
    InputViolation(String),

    /// The generator or separator failed while handling one clip.
    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: Box<LemmError>,
    },

    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Request cancelled before {stage}")]
    Cancelled { stage: Stage },

    #[error("No generation backend available: {0}")]
    NoBackend(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl LemmError {
    pub fn input(msg: impl Into<String>) -> Self {
        LemmError::InputViolation(msg.into())
    }

    /// The pipeline stage this error originated from, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LemmError::Collaborator { stage, .. } | LemmError::Cancelled { stage } => Some(*stage),
            LemmError::Persistence { .. } => Some(Stage::Persist),
            _ => None,
        }
    }
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for LemmError {
    fn from(e: std::io::Error) -> Self {
        LemmError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for LemmError {
    fn from(e: serde_json::Error) -> Self {
        LemmError::Anyhow(e.into())
    }
}

impl From<hound::Error> for LemmError {
    fn from(e: hound::Error) -> Self {
        LemmError::Anyhow(e.into())
    }
}

pub type Result<T> = std::result::Result<T, LemmError>;
