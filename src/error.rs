//! Configuration errors
//!
//! Composition itself never fails; only building an engine from a
//! `LayoutConfig` can.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid row rule `{rule}`: {reason}")]
    RowRule { rule: String, reason: String },

    #[error("Invalid quota curve `{curve}`: {message}")]
    Curve { curve: String, message: String },

    #[error("Invalid placement band for {variant}: {message}")]
    Band { variant: String, message: String },

    #[error("Invalid grid spec for {mode}/{device}: {message}")]
    GridSpec {
        mode: String,
        device: String,
        message: String,
    },

    #[error("Missing grid spec for {mode}/{device}")]
    MissingGridSpec { mode: String, device: String },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LayoutError {
    pub(crate) fn row_rule(rule: &str, reason: impl Into<String>) -> Self {
        LayoutError::RowRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn curve(curve: impl Into<String>, message: impl Into<String>) -> Self {
        LayoutError::Curve {
            curve: curve.into(),
            message: message.into(),
        }
    }
}
