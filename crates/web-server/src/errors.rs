//! Web server errors.

use spi::{ConfigError, ExtensionError};
use thiserror::Error;

/// Errors raised while configuring or starting the web server.
#[derive(Debug, Error)]
pub enum WebServerError {
    /// Two contexts are configured on the same port.
    #[error("Contexts '{first}' and '{second}' are both configured on port {port}")]
    PortConflict {
        /// The shared port.
        port: u16,
        /// The context declared first.
        first: String,
        /// The context declared second.
        second: String,
    },

    /// A router was registered for a context that is not configured.
    #[error("Unknown web context '{context}'")]
    UnknownContext {
        /// The requested context.
        context: String,
    },

    /// Routers can only be registered before the server starts.
    #[error("Cannot register routes for context '{context}': the web server is already running")]
    AlreadyStarted {
        /// The requested context.
        context: String,
    },

    /// A context's listener could not be bound.
    #[error("Context '{context}' could not bind {addr}: {source}")]
    Bind {
        /// The context.
        context: String,
        /// The requested address.
        addr: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The `web.http` settings are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<WebServerError> for ExtensionError {
    fn from(err: WebServerError) -> Self {
        ExtensionError::fatal(err.to_string()).with_source(err)
    }
}

