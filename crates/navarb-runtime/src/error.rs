#![forbid(unsafe_code)]

//! Error types for the controller and its collaborators.

use navarb_core::NavigationMode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NavError>;

/// A concrete navigation component failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("failed to mount {kind} navigation: {message}")]
    Mount { kind: NavigationMode, message: String },

    #[error("{component} navigation failed to render: {message}")]
    Render { component: String, message: String },
}

impl ComponentError {
    #[must_use]
    pub fn mount(kind: NavigationMode, message: impl Into<String>) -> Self {
        Self::Mount {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn render(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Short component label for logs.
    #[must_use]
    pub fn component(&self) -> String {
        match self {
            Self::Mount { kind, .. } => kind.to_string(),
            Self::Render { component, .. } => component.clone(),
        }
    }
}

/// The host rejected a side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host rejected {operation}: {message}")]
pub struct HostError {
    pub operation: &'static str,
    pub message: String,
}

impl HostError {
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Errors raised while loading or validating [`crate::NavigationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Internal controller failures. Never escapes a public controller method.
#[derive(Debug, Error)]
pub enum NavError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to restore preserved UI state: {0}")]
    Restore(HostError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = ComponentError::mount(NavigationMode::Mobile, "drawer threw");
        assert_eq!(err.to_string(), "failed to mount mobile navigation: drawer threw");
        assert_eq!(err.component(), "mobile");

        let err = NavError::from(HostError::new("set_css_var", "detached"));
        assert_eq!(err.to_string(), "host rejected set_css_var: detached");

        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }
}
