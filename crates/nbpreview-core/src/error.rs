//! Error taxonomy for loading notebooks and validating configuration.
//!
//! Only two kinds of failure surface to callers: a document that cannot be
//! read as a notebook, and an option value nbpreview does not know. Every
//! other failure (bad image bytes, unreachable URLs, malformed LaTeX) is
//! degraded to fallback output where it happens.

use std::path::PathBuf;

use thiserror::Error;

/// A notebook could not be loaded.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notebook is not valid JSON")]
    Json(#[source] serde_json::Error),

    #[error("invalid notebook: {reason}")]
    InvalidNotebook { reason: String },
}

impl NotebookError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidNotebook {
            reason: reason.into(),
        }
    }

    /// Whether the document itself (rather than the filesystem) is at fault.
    #[must_use]
    pub fn is_invalid_document(&self) -> bool {
        matches!(self, Self::Json(_) | Self::InvalidNotebook { .. })
    }
}

impl From<serde_json::Error> for NotebookError {
    fn from(error: serde_json::Error) -> Self {
        match error.classify() {
            serde_json::error::Category::Data => Self::invalid(error.to_string()),
            _ => Self::Json(error),
        }
    }
}

/// An explicitly requested option value is not supported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown image drawing {0:?}; expected block, character or braille")]
    UnknownImageDrawing(String),

    #[error("unknown theme {0:?}")]
    UnknownTheme(String),

    #[error("unknown color system {0:?}; expected standard, 256, truecolor, windows, none or auto")]
    UnknownColorSystem(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_json_errors_are_invalid_notebooks() {
        let error = serde_json::from_str::<Vec<u8>>("{\"a\": 1}").unwrap_err();
        let error = NotebookError::from(error);
        assert!(matches!(error, NotebookError::InvalidNotebook { .. }));
    }

    #[test]
    fn syntax_errors_stay_json() {
        let error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = NotebookError::from(error);
        assert!(matches!(error, NotebookError::Json(_)));
        assert!(error.is_invalid_document());
    }

    #[test]
    fn config_error_messages_name_the_value() {
        let error = ConfigError::UnknownImageDrawing("sixel".into());
        assert!(error.to_string().contains("\"sixel\""));
    }
}
