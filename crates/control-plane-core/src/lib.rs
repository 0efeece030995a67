//! Default control plane.
//!
//! Two extensions:
//!
//! - [`ControlPlaneDefaultServicesExtension`] provides in-memory stores as
//!   *default* providers and the [`SyncEventRouter`]. Any extension providing
//!   a store of its own replaces the in-memory one without configuration.
//! - [`ControlPlaneServicesExtension`] provides the services the management
//!   API calls, built on whichever stores were selected.
//!
//! ## Architectural Layer
//!
//! **Extension.** Depends on [`spi`] only; the runtime wires it in through its
//! descriptor.

pub mod events;
pub mod extension;
pub mod services;
pub mod store;

pub use events::SyncEventRouter;
pub use extension::{ControlPlaneDefaultServicesExtension, ControlPlaneServicesExtension};
pub use services::{
    AssetServiceImpl, ContractDefinitionServiceImpl, ContractNegotiationServiceImpl,
    PolicyDefinitionServiceImpl, ReferenceGuard, TransferProcessServiceImpl,
};
pub use store::{
    InMemoryAssetIndex, InMemoryContractDefinitionStore, InMemoryContractNegotiationStore,
    InMemoryPolicyDefinitionStore, InMemoryStore, InMemoryTransferProcessStore, Keyed,
};
