//! Connector runtime core.
//!
//! Assembles a runtime from explicitly listed extensions:
//!
//! 1. **Configuration**: merge configuration extensions, environment and
//!    overrides ([`config::assemble`]).
//! 2. **Planning**: register every descriptor, select providers and compute a
//!    deterministic dependency order ([`ExtensionRegistry::plan`]).
//! 3. **Wiring**: initialize extensions one by one in that order, each with a
//!    context scoped to its descriptor ([`Bootstrapper::boot`]).
//! 4. **Serving**: prepare and start, hand the resolved services to the entry
//!    point, and shut down in reverse order ([`Runtime::run`]).
//!
//! ## Architectural Layer
//!
//! **Orchestration.** This crate sequences extension lifecycles; it contains no
//! capability of its own and depends only on [`spi`].

pub mod bootstrap;
pub mod config;
pub mod manifest;
pub mod registry;

pub use bootstrap::{Bootstrapper, Runtime, RuntimeHandle};
pub use manifest::{
    ConfigurationFactory, ExtensionCatalog, ExtensionFactory, ManifestError, RuntimeManifest,
};
pub use registry::{ExtensionRegistry, LoadPlan};
