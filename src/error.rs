//! Error types for the reactive navigator

use thiserror::Error;

/// Reactive navigation error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("No transform from '{source_frame}' to '{target}': {reason}")]
    TransformUnavailable {
        target: String,
        source_frame: String,
        reason: String,
    },

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Infeasible configuration: {0}")]
    InfeasibleConfiguration(String),

    #[error("Navigation log sink failure: {0}")]
    LogSink(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for NavError {
    fn from(e: serde_yaml::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

impl From<std::io::Error> for NavError {
    fn from(e: std::io::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
