//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),

    /// A dependency requested during extension construction is not available
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// A dependency exists but has a different type than requested
    #[error("Dependency '{name}' is not a {expected}")]
    DependencyType { name: String, expected: &'static str },

    /// Route construction failed
    #[error("Route construction failed: {0}")]
    Route(String),

    /// A handler object was asked for an endpoint it does not expose
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a route construction error
    pub fn route(message: impl Into<String>) -> Self {
        Self::Route(message.into())
    }
}
