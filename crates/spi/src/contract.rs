//! Contract definitions and contract negotiations.
//!
//! A contract definition binds an access policy and a contract policy to the
//! assets selected by its criteria. A contract negotiation is the consumer-side
//! record of an attempt to agree on an offer with a counter-party; the wire
//! protocol that advances it remotely lives outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Criterion, Mutation, Policy, QuerySpec, ServiceResult, ServiceType, StoreResult, Timestamp,
};

// ---------------------------------------------------------------------------
// Contract definitions
// ---------------------------------------------------------------------------

/// Makes assets available under policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDefinition {
    /// Unique id.
    pub id: String,
    /// Policy deciding who may see the offer.
    pub access_policy_id: String,
    /// Policy attached to the resulting contract.
    pub contract_policy_id: String,
    /// Criteria selecting the covered assets. Empty selects every asset.
    #[serde(default)]
    pub asset_selector: Vec<Criterion>,
    /// When the definition was created.
    pub created_at: Timestamp,
}

impl ContractDefinition {
    /// Returns `true` if either policy reference points at `policy_id`.
    pub fn references_policy(&self, policy_id: &str) -> bool {
        self.access_policy_id == policy_id || self.contract_policy_id == policy_id
    }
}

/// Persistence of contract definitions.
#[async_trait]
pub trait ContractDefinitionStore: Send + Sync {
    /// Looks up a definition.
    async fn find_by_id(&self, id: &str) -> Option<ContractDefinition>;

    /// Returns definitions matching `spec`.
    async fn query(&self, spec: &QuerySpec) -> Vec<ContractDefinition>;

    /// Stores a new definition; fails if the id is taken.
    async fn create(&self, definition: ContractDefinition) -> StoreResult<()>;

    /// Replaces an existing definition; fails if absent.
    async fn update(&self, definition: ContractDefinition) -> StoreResult<()>;

    /// Removes a definition and returns it.
    async fn delete_by_id(&self, id: &str) -> StoreResult<ContractDefinition>;
}

impl ServiceType for dyn ContractDefinitionStore {
    const NAME: &'static str = "contract-definition-store";
}

/// Validated contract-definition operations that also publish events.
#[async_trait]
pub trait ContractDefinitionService: Send + Sync {
    /// Creates a definition; both referenced policies must exist.
    async fn create(&self, definition: ContractDefinition) -> ServiceResult<ContractDefinition>;

    /// Looks up a definition.
    async fn find_by_id(&self, id: &str) -> ServiceResult<ContractDefinition>;

    /// Lists definitions.
    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<ContractDefinition>>;

    /// Deletes a definition.
    async fn delete(&self, id: &str) -> ServiceResult<ContractDefinition>;
}

impl ServiceType for dyn ContractDefinitionService {
    const NAME: &'static str = "contract-definition-service";
}

// ---------------------------------------------------------------------------
// Contract negotiations
// ---------------------------------------------------------------------------

/// An offer for an asset under a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOffer {
    /// Offer id as published by the provider.
    pub id: String,
    /// The offered asset.
    pub asset_id: String,
    /// The offered policy.
    pub policy: Policy,
}

/// State of a contract negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    /// Created, nothing sent yet.
    Initial,
    /// Credentials are being obtained and the request prepared.
    Requesting,
    /// The request was handed to the counter-party.
    Requested,
    /// The counter-party agreed.
    Agreed,
    /// The agreement is final.
    Finalized,
    /// The negotiation was declined.
    Declined,
    /// The negotiation was cancelled or failed.
    Terminated,
}

impl NegotiationState {
    /// Final states accept no further transitions.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Finalized | Self::Declined | Self::Terminated)
    }
}

impl std::fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "INITIAL",
            Self::Requesting => "REQUESTING",
            Self::Requested => "REQUESTED",
            Self::Agreed => "AGREED",
            Self::Finalized => "FINALIZED",
            Self::Declined => "DECLINED",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Consumer-side record of a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractNegotiation {
    /// Unique id.
    pub id: String,
    /// Address of the counter-party connector.
    pub counter_party_address: String,
    /// Protocol used to talk to the counter-party.
    pub protocol: String,
    /// The offer being negotiated.
    pub offer: ContractOffer,
    /// Current state.
    pub state: NegotiationState,
    /// Why the negotiation failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// When the negotiation was created.
    pub created_at: Timestamp,
    /// When the state last changed.
    pub updated_at: Timestamp,
}

/// Request to start a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationRequest {
    /// Address of the counter-party connector.
    pub connector_address: String,
    /// Protocol used to talk to the counter-party.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// The offer to negotiate.
    pub offer: ContractOffer,
}

/// Protocol assumed when a request does not name one.
pub fn default_protocol() -> String {
    "ids-multipart".to_owned()
}

/// Persistence of negotiations.
#[async_trait]
pub trait ContractNegotiationStore: Send + Sync {
    /// Looks up a negotiation.
    async fn find_by_id(&self, id: &str) -> Option<ContractNegotiation>;

    /// Returns negotiations matching `spec`.
    async fn query(&self, spec: &QuerySpec) -> Vec<ContractNegotiation>;

    /// Inserts or replaces a negotiation.
    async fn save(&self, negotiation: ContractNegotiation);

    /// Applies `mutation` to the stored negotiation and returns the result.
    async fn update_with(
        &self,
        id: &str,
        mutation: Mutation<'_, ContractNegotiation>,
    ) -> StoreResult<ContractNegotiation>;
}

impl ServiceType for dyn ContractNegotiationStore {
    const NAME: &'static str = "contract-negotiation-store";
}

/// Negotiation operations available to the management layer.
#[async_trait]
pub trait ContractNegotiationService: Send + Sync {
    /// Starts a negotiation. Returns the stored record, which is `Terminated`
    /// (with an error detail) if credentials for the counter-party could not
    /// be obtained.
    async fn initiate(&self, request: NegotiationRequest) -> ServiceResult<ContractNegotiation>;

    /// Looks up a negotiation.
    async fn find_by_id(&self, id: &str) -> ServiceResult<ContractNegotiation>;

    /// Lists negotiations.
    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<ContractNegotiation>>;

    /// Cancels a negotiation (moves it to `Terminated`).
    async fn cancel(&self, id: &str) -> ServiceResult<ContractNegotiation>;

    /// Declines a negotiation (moves it to `Declined`).
    async fn decline(&self, id: &str) -> ServiceResult<ContractNegotiation>;
}

impl ServiceType for dyn ContractNegotiationService {
    const NAME: &'static str = "contract-negotiation-service";
}
