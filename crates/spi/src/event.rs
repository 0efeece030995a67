//! Domain events and the router that fans them out.
//!
//! Control-plane services publish an event after every successful mutation.
//! Subscribers are registered with the [`EventRouter`] during initialization
//! and receive events synchronously, in subscription order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ServiceType, Timestamp};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum Event {
    /// An asset became available under `asset_id`.
    AssetCreated {
        /// The new asset.
        asset_id: String,
    },
    /// An asset was removed.
    AssetDeleted {
        /// The removed asset.
        asset_id: String,
    },
    /// A policy definition was stored.
    PolicyDefinitionCreated {
        /// The new policy definition.
        policy_definition_id: String,
    },
    /// A policy definition was removed.
    PolicyDefinitionDeleted {
        /// The removed policy definition.
        policy_definition_id: String,
    },
    /// A contract definition was stored.
    ContractDefinitionCreated {
        /// The new contract definition.
        contract_definition_id: String,
    },
    /// A contract definition was removed.
    ContractDefinitionDeleted {
        /// The removed contract definition.
        contract_definition_id: String,
    },
    /// A negotiation request was sent to the counter-party.
    ContractNegotiationRequested {
        /// The negotiation.
        negotiation_id: String,
    },
    /// A negotiation was declined.
    ContractNegotiationDeclined {
        /// The negotiation.
        negotiation_id: String,
    },
    /// A negotiation was terminated (cancelled or failed).
    ContractNegotiationTerminated {
        /// The negotiation.
        negotiation_id: String,
    },
    /// A transfer process was initiated.
    TransferProcessInitiated {
        /// The transfer process.
        transfer_process_id: String,
    },
    /// A transfer process finished successfully.
    TransferProcessCompleted {
        /// The transfer process.
        transfer_process_id: String,
    },
    /// A transfer process was terminated.
    TransferProcessTerminated {
        /// The transfer process.
        transfer_process_id: String,
        /// Why it was terminated.
        reason: String,
    },
}

/// An [`Event`] with its identity and emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event id.
    pub id: Uuid,
    /// When the event was emitted.
    pub at: Timestamp,
    /// The event itself.
    pub payload: Event,
}

impl EventEnvelope {
    /// Wraps `payload` with a fresh id and the current time.
    pub fn new(payload: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Timestamp::now(),
            payload,
        }
    }
}

/// Receives published events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handles one event. Must not block for long: publishing awaits every
    /// subscriber in turn.
    async fn on_event(&self, event: &EventEnvelope);
}

/// Distributes events to subscribers.
#[async_trait]
pub trait EventRouter: Send + Sync {
    /// Adds a subscriber.
    fn register(&self, subscriber: std::sync::Arc<dyn EventSubscriber>);

    /// Delivers `event` to every subscriber.
    async fn publish(&self, event: Event);
}

impl ServiceType for dyn EventRouter {
    const NAME: &'static str = "event-router";
}
