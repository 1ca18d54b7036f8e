//! Server error types

use harbor_core::PluginHostError;
use thiserror::Error;

/// Errors that can occur in the harbor server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Plugin host failed to start or shut down
    #[error("plugin host error: {0}")]
    Host(#[from] PluginHostError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind to 127.0.0.1:1: in use");
    }

    #[test]
    fn test_host_error_conversion() {
        let err: ServerError = PluginHostError::AlreadyStarted.into();
        assert!(matches!(err, ServerError::Host(_)));
    }
}
