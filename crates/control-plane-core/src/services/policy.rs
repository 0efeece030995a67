use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    ContractDefinitionStore, Event, EventRouter, PolicyDefinition, PolicyDefinitionService,
    PolicyDefinitionStore, QuerySpec, ServiceError, ServiceResult,
};
use tracing::info;

use super::{not_found, require_id, ReferenceGuard};

/// Policy definition lifecycle. A policy still referenced by a contract
/// definition cannot be deleted.
pub struct PolicyDefinitionServiceImpl {
    store: Arc<dyn PolicyDefinitionStore>,
    contract_definitions: Arc<dyn ContractDefinitionStore>,
    references: ReferenceGuard,
    events: Arc<dyn EventRouter>,
}

impl PolicyDefinitionServiceImpl {
    pub fn new(
        store: Arc<dyn PolicyDefinitionStore>,
        contract_definitions: Arc<dyn ContractDefinitionStore>,
        references: ReferenceGuard,
        events: Arc<dyn EventRouter>,
    ) -> Self {
        Self {
            store,
            contract_definitions,
            references,
            events,
        }
    }
}

#[async_trait]
impl PolicyDefinitionService for PolicyDefinitionServiceImpl {
    async fn create(&self, definition: PolicyDefinition) -> ServiceResult<PolicyDefinition> {
        require_id("Policy definition", &definition.id)?;
        self.store.create(definition.clone()).await?;

        info!(policy_definition_id = %definition.id, "Policy definition created");
        self.events
            .publish(Event::PolicyDefinitionCreated {
                policy_definition_id: definition.id.clone(),
            })
            .await;
        Ok(definition)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<PolicyDefinition> {
        self.store
            .find_by_id(id)
            .await
            .ok_or_else(|| not_found("Policy definition", id))
    }

    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<PolicyDefinition>> {
        Ok(self.store.query(spec).await)
    }

    async fn delete(&self, id: &str) -> ServiceResult<PolicyDefinition> {
        let references = self.references.hold().await;
        if let Some(contract) = self
            .contract_definitions
            .query(&QuerySpec::all())
            .await
            .into_iter()
            .find(|contract| contract.references_policy(id))
        {
            return Err(ServiceError::Conflict(format!(
                "Policy definition {id} is referenced by contract definition {}",
                contract.id
            )));
        }

        let definition = self.store.delete_by_id(id).await?;
        drop(references);
        info!(policy_definition_id = %id, "Policy definition deleted");
        self.events
            .publish(Event::PolicyDefinitionDeleted {
                policy_definition_id: id.to_owned(),
            })
            .await;
        Ok(definition)
    }
}
