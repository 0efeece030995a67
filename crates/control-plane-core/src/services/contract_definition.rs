use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    ContractDefinition, ContractDefinitionService, ContractDefinitionStore, Event, EventRouter,
    PolicyDefinitionStore, QuerySpec, ServiceError, ServiceResult,
};
use tracing::info;

use super::{not_found, require_id, ReferenceGuard};

/// Contract definition lifecycle. Both referenced policies must exist when the
/// definition is created.
pub struct ContractDefinitionServiceImpl {
    store: Arc<dyn ContractDefinitionStore>,
    policies: Arc<dyn PolicyDefinitionStore>,
    references: ReferenceGuard,
    events: Arc<dyn EventRouter>,
}

impl ContractDefinitionServiceImpl {
    pub fn new(
        store: Arc<dyn ContractDefinitionStore>,
        policies: Arc<dyn PolicyDefinitionStore>,
        references: ReferenceGuard,
        events: Arc<dyn EventRouter>,
    ) -> Self {
        Self {
            store,
            policies,
            references,
            events,
        }
    }

    async fn require_policy(&self, role: &str, policy_id: &str) -> ServiceResult<()> {
        match self.policies.find_by_id(policy_id).await {
            Some(_) => Ok(()),
            None => Err(ServiceError::BadRequest(format!(
                "{role} policy {policy_id} does not exist"
            ))),
        }
    }
}

#[async_trait]
impl ContractDefinitionService for ContractDefinitionServiceImpl {
    async fn create(&self, definition: ContractDefinition) -> ServiceResult<ContractDefinition> {
        require_id("Contract definition", &definition.id)?;
        {
            let _references = self.references.hold().await;
            self.require_policy("Access", &definition.access_policy_id).await?;
            self.require_policy("Contract", &definition.contract_policy_id).await?;
            self.store.create(definition.clone()).await?;
        }

        info!(
            contract_definition_id = %definition.id,
            access_policy_id = %definition.access_policy_id,
            contract_policy_id = %definition.contract_policy_id,
            "Contract definition created"
        );
        self.events
            .publish(Event::ContractDefinitionCreated {
                contract_definition_id: definition.id.clone(),
            })
            .await;
        Ok(definition)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<ContractDefinition> {
        self.store
            .find_by_id(id)
            .await
            .ok_or_else(|| not_found("Contract definition", id))
    }

    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<ContractDefinition>> {
        Ok(self.store.query(spec).await)
    }

    async fn delete(&self, id: &str) -> ServiceResult<ContractDefinition> {
        let definition = self.store.delete_by_id(id).await?;
        info!(contract_definition_id = %id, "Contract definition deleted");
        self.events
            .publish(Event::ContractDefinitionDeleted {
                contract_definition_id: id.to_owned(),
            })
            .await;
        Ok(definition)
    }
}
