//! Service provider interfaces for the connector runtime.
//!
//! This crate defines the composition model (extension descriptors, the
//! scoped initialization context, configuration, errors) and every capability
//! contract extensions implement or consume. Extension crates depend on it;
//! it depends on no extension.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** No transport, storage or filesystem code
//! lives here. It defines *what* an extension provides or needs; extension
//! crates define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `ExtensionName`, `ServiceName` |
//! | [`extension`] | descriptors, `ServiceExtension`, `ConfigurationExtension` |
//! | [`service`] | `ServiceType`, `ServiceRegistry`, `ServiceExtensionContext` |
//! | [`config`] | `Config` |
//! | [`errors`] | `BootError`, `ExtensionError` and component errors |
//! | [`query`] | `QuerySpec`, `Criterion` |
//! | [`event`] | domain events, `EventRouter` |
//! | [`asset`], [`policy`], [`contract`], [`transfer`] | control-plane SPIs |
//! | [`iam`] | `IdentityService`, `AuthenticationService` |

pub mod asset;
pub mod config;
pub mod contract;
pub mod errors;
pub mod event;
pub mod extension;
pub mod iam;
pub mod identifiers;
pub mod policy;
pub mod query;
pub mod service;
pub mod transfer;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by extension crates.
pub use asset::{Asset, AssetEntry, AssetIndex, AssetService};
pub use config::Config;
pub use contract::{
    ContractDefinition, ContractDefinitionService, ContractDefinitionStore, ContractNegotiation,
    ContractNegotiationService, ContractNegotiationStore, ContractOffer, NegotiationRequest,
    NegotiationState,
};
pub use errors::{
    BootError, ConfigError, ExtensionError, IdentityError, ServiceError, ServiceResult, Severity,
    StoreError, StoreResult,
};
pub use event::{Event, EventEnvelope, EventRouter, EventSubscriber};
pub use extension::{
    ConfigurationExtension, ExtensionDescriptor, ProvidedService, ProviderKind, RequiredService,
    ServiceExtension,
};
pub use iam::{
    AuthenticationService, ClaimToken, IdentityService, TokenParameters, TokenRepresentation,
};
pub use identifiers::{ExtensionName, ServiceName};
pub use policy::{
    Action, Constraint, Policy, PolicyDefinition, PolicyDefinitionService, PolicyDefinitionStore,
    Rule,
};
pub use query::{Criterion, Operator, QuerySpec, SortOrder};
pub use service::{ServiceExtensionContext, ServiceRegistry, ServiceType};
pub use transfer::{
    TransferProcess, TransferProcessService, TransferProcessStore, TransferRequest, TransferState,
};
pub use types::{DataAddress, Mutation, Timestamp};

/// Setting naming the connector.
pub const CONNECTOR_NAME_SETTING: &str = "edc.connector.name";
