//! HTTP serving for extensions.
//!
//! A *context* is one listener: a port, a host and a base path. Extensions
//! look up the [`WebServer`] service during initialization and register axum
//! routers against a context by name; the [`WebServerExtension`] binds every
//! context when the runtime starts and stops them gracefully on shutdown.
//!
//! The `default` context always exists and serves [`HEALTH_PATH`]. See
//! [`settings`] for the configuration keys.

pub mod errors;
pub mod extension;
pub mod server;
pub mod settings;

pub use errors::WebServerError;
pub use extension::WebServerExtension;
pub use server::{AxumWebServer, WebServer, HEALTH_PATH};
pub use settings::{WebContext, DEFAULT_CONTEXT};
