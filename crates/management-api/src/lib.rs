//! REST management API.
//!
//! Thin axum handlers over the control-plane services: request bodies are
//! deserialized, the service is called, and [`spi::ServiceError`]s become
//! status codes through [`ApiError`]. Every route requires authentication
//! through the configured [`spi::AuthenticationService`].
//!
//! See [`routes`] for the route table and [`query::ListParams`] for the list
//! query string.

pub mod auth;
pub mod errors;
pub mod extension;
pub mod query;
pub mod routes;

pub use errors::{ApiError, ErrorDetail};
pub use extension::{ManagementApiExtension, MANAGEMENT_CONTEXT};
pub use routes::{router, ManagementServices};
