//! Control-plane services.
//!
//! Services sit between the management API and the stores: they validate
//! input, enforce referential rules, drive state transitions and publish an
//! [`spi::Event`] after every successful mutation.

mod asset;
mod contract_definition;
mod negotiation;
mod policy;
mod transfer;

pub use asset::AssetServiceImpl;
pub use contract_definition::ContractDefinitionServiceImpl;
pub use negotiation::ContractNegotiationServiceImpl;
pub use policy::PolicyDefinitionServiceImpl;
pub use transfer::TransferProcessServiceImpl;

use std::sync::Arc;

use spi::{ServiceError, StoreError};
use tokio::sync::{Mutex, MutexGuard};

/// Serializes mutations whose validity depends on a different store, such as
/// deleting a policy while a contract definition referencing it is created.
/// Every service sharing a set of stores must share one guard.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGuard(Arc<Mutex<()>>);

impl ReferenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn hold(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

fn not_found(kind: &str, id: &str) -> ServiceError {
    ServiceError::NotFound(format!("{kind} with ID {id} does not exist"))
}

/// Like the plain conversion, but names the entity kind when it is missing.
fn store_error(kind: &str, err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound { id } => not_found(kind, &id),
        other => other.into(),
    }
}

fn require_id(kind: &str, id: &str) -> Result<(), ServiceError> {
    if id.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{kind} id must not be empty")));
    }
    Ok(())
}
