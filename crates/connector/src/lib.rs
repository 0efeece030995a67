//! Connector runtime composition.
//!
//! The binary is assembled from the extensions listed in [`catalog`]; which
//! of them a process loads is decided by its [`boot::RuntimeManifest`]
//! (see [`manifest`]).
//!
//! ## Bundled extensions
//!
//! | Identifier | Provides |
//! |------------|----------|
//! | `control-plane-default-services` | in-memory stores, event router |
//! | `control-plane-services` | asset, policy, contract, negotiation and transfer services |
//! | `iam-mock` | identity service |
//! | `auth-tokenbased` | API-key authentication |
//! | `web-server` | HTTP contexts |
//! | `management-api` | REST management endpoints |
//! | `transfer-listener` | logs finished transfers |
//! | `sample-provider` | seeds a sample asset, policy and contract definition |
//!
//! Configuration source: `configuration-filesystem`.

pub mod sample_provider;
pub mod telemetry;
pub mod transfer_listener;

use std::path::Path;

use anyhow::Context;
use auth_tokenbased::TokenBasedAuthExtension;
use boot::{ExtensionCatalog, RuntimeManifest};
use configuration_filesystem::FsConfigurationExtension;
use control_plane_core::{ControlPlaneDefaultServicesExtension, ControlPlaneServicesExtension};
use iam_mock::MockIamExtension;
use management_api::ManagementApiExtension;
use web_server::WebServerExtension;

pub use sample_provider::SampleProviderExtension;
pub use transfer_listener::TransferListenerExtension;

/// Environment variable naming the runtime manifest file.
pub const MANIFEST_ENV: &str = "EDC_RUNTIME_MANIFEST";

/// Every extension linked into this binary.
pub fn catalog() -> ExtensionCatalog {
    ExtensionCatalog::new()
        .with_configuration::<FsConfigurationExtension>(FsConfigurationExtension::NAME)
        .with_extension::<ControlPlaneDefaultServicesExtension>(
            ControlPlaneDefaultServicesExtension::NAME,
        )
        .with_extension::<ControlPlaneServicesExtension>(ControlPlaneServicesExtension::NAME)
        .with_extension::<MockIamExtension>(MockIamExtension::NAME)
        .with_extension::<TokenBasedAuthExtension>(TokenBasedAuthExtension::NAME)
        .with_extension::<WebServerExtension>(WebServerExtension::NAME)
        .with_extension::<ManagementApiExtension>(ManagementApiExtension::NAME)
        .with_extension::<TransferListenerExtension>(TransferListenerExtension::NAME)
        .with_extension::<SampleProviderExtension>(SampleProviderExtension::NAME)
}

/// The manifest at `path`, or the full catalog when no path is given.
pub fn manifest(
    catalog: &ExtensionCatalog,
    path: Option<&Path>,
) -> anyhow::Result<RuntimeManifest> {
    match path {
        Some(path) => RuntimeManifest::load(path)
            .with_context(|| format!("Failed to load runtime manifest {}", path.display())),
        None => Ok(catalog.full_manifest("connector")),
    }
}
