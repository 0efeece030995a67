//! Usage policies and their stored definitions.
//!
//! Policy evaluation is out of scope; policies here are data that contract
//! definitions reference by id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{QuerySpec, ServiceResult, ServiceType, StoreResult, Timestamp};

/// An action a rule applies to, e.g. `"USE"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The action type.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Action {
    /// Creates an action of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// A constraint narrowing when a rule applies, e.g. `region = eu`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// Left operand (a policy attribute).
    pub left_expression: String,
    /// Operator, e.g. `"EQ"`.
    pub operator: String,
    /// Right operand.
    pub right_expression: String,
}

/// A permission, prohibition or duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// What the rule governs.
    pub action: Action,
    /// Conditions under which the rule applies.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Rule {
    /// A rule on `action` with no constraints.
    pub fn on(action: Action) -> Self {
        Self {
            action,
            constraints: Vec::new(),
        }
    }
}

/// A usage policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// What is allowed.
    #[serde(default)]
    pub permissions: Vec<Rule>,
    /// What is forbidden.
    #[serde(default)]
    pub prohibitions: Vec<Rule>,
    /// What must be done.
    #[serde(default)]
    pub obligations: Vec<Rule>,
}

impl Policy {
    /// A policy with one unconstrained permission.
    pub fn permit(action: Action) -> Self {
        Self {
            permissions: vec![Rule::on(action)],
            ..Self::default()
        }
    }
}

/// A stored, addressable policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinition {
    /// Unique id.
    pub id: String,
    /// The policy.
    pub policy: Policy,
    /// When the definition was created.
    pub created_at: Timestamp,
}

impl PolicyDefinition {
    /// Creates a definition stamped with the current time.
    pub fn new(id: impl Into<String>, policy: Policy) -> Self {
        Self {
            id: id.into(),
            policy,
            created_at: Timestamp::now(),
        }
    }
}

/// Persistence of policy definitions.
#[async_trait]
pub trait PolicyDefinitionStore: Send + Sync {
    /// Looks up a definition.
    async fn find_by_id(&self, id: &str) -> Option<PolicyDefinition>;

    /// Returns definitions matching `spec`.
    async fn query(&self, spec: &QuerySpec) -> Vec<PolicyDefinition>;

    /// Stores a new definition; fails if the id is taken.
    async fn create(&self, definition: PolicyDefinition) -> StoreResult<()>;

    /// Replaces an existing definition; fails if absent.
    async fn update(&self, definition: PolicyDefinition) -> StoreResult<()>;

    /// Removes a definition and returns it.
    async fn delete_by_id(&self, id: &str) -> StoreResult<PolicyDefinition>;
}

impl ServiceType for dyn PolicyDefinitionStore {
    const NAME: &'static str = "policy-definition-store";
}

/// Validated policy-definition operations that also publish events.
#[async_trait]
pub trait PolicyDefinitionService: Send + Sync {
    /// Creates a definition.
    async fn create(&self, definition: PolicyDefinition) -> ServiceResult<PolicyDefinition>;

    /// Looks up a definition.
    async fn find_by_id(&self, id: &str) -> ServiceResult<PolicyDefinition>;

    /// Lists definitions.
    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<PolicyDefinition>>;

    /// Deletes a definition unless a contract definition references it.
    async fn delete(&self, id: &str) -> ServiceResult<PolicyDefinition>;
}

impl ServiceType for dyn PolicyDefinitionService {
    const NAME: &'static str = "policy-definition-service";
}
