use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    Event, EventRouter, QuerySpec, ServiceError, ServiceResult, Timestamp, TransferProcess,
    TransferProcessService, TransferProcessStore, TransferRequest, TransferState,
};
use tracing::info;
use uuid::Uuid;

use super::{not_found, store_error, ReferenceGuard};

const KIND: &str = "Transfer process";

/// Consumer-side transfer processes.
///
/// State checks and changes happen inside the store's
/// [`TransferProcessStore::update_with`], so two requests racing on one
/// process cannot both move it into a final state.
pub struct TransferProcessServiceImpl {
    store: Arc<dyn TransferProcessStore>,
    references: ReferenceGuard,
    events: Arc<dyn EventRouter>,
}

impl TransferProcessServiceImpl {
    pub fn new(
        store: Arc<dyn TransferProcessStore>,
        references: ReferenceGuard,
        events: Arc<dyn EventRouter>,
    ) -> Self {
        Self {
            store,
            references,
            events,
        }
    }
}

fn validate(request: &TransferRequest) -> ServiceResult<()> {
    for (field, value) in [
        ("connectorAddress", &request.connector_address),
        ("contractId", &request.contract_id),
        ("assetId", &request.asset_id),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::BadRequest(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

#[async_trait]
impl TransferProcessService for TransferProcessServiceImpl {
    async fn initiate(&self, request: TransferRequest) -> ServiceResult<TransferProcess> {
        validate(&request)?;
        let now = Timestamp::now();
        let process = TransferProcess {
            id: Uuid::new_v4().to_string(),
            request,
            state: TransferState::Requested,
            error_detail: None,
            created_at: now,
            updated_at: now,
        };
        {
            let _references = self.references.hold().await;
            self.store.save(process.clone()).await;
        }
        info!(
            transfer_process_id = %process.id,
            asset_id = %process.asset_id(),
            "Transfer process requested"
        );

        self.events
            .publish(Event::TransferProcessInitiated {
                transfer_process_id: process.id.clone(),
            })
            .await;
        Ok(process)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<TransferProcess> {
        self.store
            .find_by_id(id)
            .await
            .ok_or_else(|| not_found(KIND, id))
    }

    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<TransferProcess>> {
        Ok(self.store.query(spec).await)
    }

    async fn complete(&self, id: &str) -> ServiceResult<TransferProcess> {
        let process = self
            .store
            .update_with(
                id,
                Box::new(|process: &mut TransferProcess| {
                    if !matches!(process.state, TransferState::Requested | TransferState::Started) {
                        return Err(format!(
                            "Transfer process {id} is {} and cannot complete",
                            process.state
                        ));
                    }
                    process.state = TransferState::Completed;
                    process.updated_at = Timestamp::now();
                    Ok(())
                }),
            )
            .await
            .map_err(|err| store_error(KIND, err))?;
        info!(transfer_process_id = %id, "Transfer process completed");

        self.events
            .publish(Event::TransferProcessCompleted {
                transfer_process_id: id.to_owned(),
            })
            .await;
        Ok(process)
    }

    async fn terminate(&self, id: &str, reason: &str) -> ServiceResult<TransferProcess> {
        let process = self
            .store
            .update_with(
                id,
                Box::new(|process: &mut TransferProcess| {
                    if process.state.is_final() {
                        return Err(format!("Transfer process {id} is already {}", process.state));
                    }
                    process.state = TransferState::Terminated;
                    process.error_detail = Some(reason.to_owned());
                    process.updated_at = Timestamp::now();
                    Ok(())
                }),
            )
            .await
            .map_err(|err| store_error(KIND, err))?;
        info!(transfer_process_id = %id, reason, "Transfer process terminated");

        self.events
            .publish(Event::TransferProcessTerminated {
                transfer_process_id: id.to_owned(),
                reason: reason.to_owned(),
            })
            .await;
        Ok(process)
    }
}
