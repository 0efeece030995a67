use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    ContractNegotiation, ContractNegotiationService, ContractNegotiationStore, Event, EventRouter,
    IdentityService, NegotiationRequest, NegotiationState, QuerySpec, ServiceError, ServiceResult,
    Timestamp, TokenParameters,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::{not_found, store_error};

const KIND: &str = "Contract negotiation";

/// Scope requested when obtaining credentials for a counter-party.
pub const NEGOTIATION_SCOPE: &str = "idsc:IDS_CONNECTOR_ATTRIBUTES_ALL";

/// Consumer-side contract negotiations.
///
/// Initiating a negotiation obtains client credentials for the counter-party
/// from the [`IdentityService`]. A negotiation whose credentials cannot be
/// obtained is stored as `TERMINATED` with the failure as its error detail.
pub struct ContractNegotiationServiceImpl {
    store: Arc<dyn ContractNegotiationStore>,
    identity: Arc<dyn IdentityService>,
    events: Arc<dyn EventRouter>,
}

impl ContractNegotiationServiceImpl {
    pub fn new(
        store: Arc<dyn ContractNegotiationStore>,
        identity: Arc<dyn IdentityService>,
        events: Arc<dyn EventRouter>,
    ) -> Self {
        Self {
            store,
            identity,
            events,
        }
    }

    async fn transition(
        &self,
        id: &str,
        target: NegotiationState,
    ) -> ServiceResult<ContractNegotiation> {
        let negotiation = self
            .store
            .update_with(
                id,
                Box::new(move |negotiation: &mut ContractNegotiation| {
                    if negotiation.state.is_final() {
                        return Err(format!(
                            "Contract negotiation {id} is already {} and cannot become {target}",
                            negotiation.state
                        ));
                    }
                    negotiation.state = target;
                    negotiation.updated_at = Timestamp::now();
                    Ok(())
                }),
            )
            .await
            .map_err(|err| store_error(KIND, err))?;
        info!(negotiation_id = %id, state = %target, "Contract negotiation transitioned");
        Ok(negotiation)
    }
}

#[async_trait]
impl ContractNegotiationService for ContractNegotiationServiceImpl {
    async fn initiate(&self, request: NegotiationRequest) -> ServiceResult<ContractNegotiation> {
        if request.connector_address.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "connectorAddress must not be empty".to_owned(),
            ));
        }

        let now = Timestamp::now();
        let negotiation = ContractNegotiation {
            id: Uuid::new_v4().to_string(),
            counter_party_address: request.connector_address,
            protocol: request.protocol,
            offer: request.offer,
            state: NegotiationState::Initial,
            error_detail: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save(negotiation.clone()).await;

        let parameters = TokenParameters {
            scope: NEGOTIATION_SCOPE.to_owned(),
            audience: negotiation.counter_party_address.clone(),
        };
        let credentials = self.identity.obtain_client_credentials(&parameters).await;
        let (state, error_detail) = match &credentials {
            Ok(_token) => (NegotiationState::Requested, None),
            Err(err) => (NegotiationState::Terminated, Some(err.to_string())),
        };

        // Cancelled or declined while the credentials were being obtained.
        let negotiation = self
            .store
            .update_with(
                &negotiation.id,
                Box::new(move |negotiation: &mut ContractNegotiation| {
                    if negotiation.state != NegotiationState::Initial {
                        return Err(format!(
                            "Contract negotiation {} left INITIAL before it was requested",
                            negotiation.id
                        ));
                    }
                    negotiation.state = state;
                    negotiation.error_detail = error_detail;
                    negotiation.updated_at = Timestamp::now();
                    Ok(())
                }),
            )
            .await
            .map_err(|err| store_error(KIND, err))?;

        let event = match credentials {
            Ok(_token) => {
                info!(
                    negotiation_id = %negotiation.id,
                    counter_party = %negotiation.counter_party_address,
                    "Contract negotiation requested"
                );
                Event::ContractNegotiationRequested {
                    negotiation_id: negotiation.id.clone(),
                }
            }
            Err(err) => {
                warn!(
                    negotiation_id = %negotiation.id,
                    error = %err,
                    "Contract negotiation terminated: no client credentials"
                );
                Event::ContractNegotiationTerminated {
                    negotiation_id: negotiation.id.clone(),
                }
            }
        };
        self.events.publish(event).await;
        Ok(negotiation)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<ContractNegotiation> {
        self.store
            .find_by_id(id)
            .await
            .ok_or_else(|| not_found(KIND, id))
    }

    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<ContractNegotiation>> {
        Ok(self.store.query(spec).await)
    }

    async fn cancel(&self, id: &str) -> ServiceResult<ContractNegotiation> {
        let negotiation = self.transition(id, NegotiationState::Terminated).await?;
        self.events
            .publish(Event::ContractNegotiationTerminated {
                negotiation_id: id.to_owned(),
            })
            .await;
        Ok(negotiation)
    }

    async fn decline(&self, id: &str) -> ServiceResult<ContractNegotiation> {
        let negotiation = self.transition(id, NegotiationState::Declined).await?;
        self.events
            .publish(Event::ContractNegotiationDeclined {
                negotiation_id: id.to_owned(),
            })
            .await;
        Ok(negotiation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryContractNegotiationStore, SyncEventRouter};
    use spi::{ClaimToken, ContractOffer, IdentityError, Policy, TokenRepresentation};

    struct Unreachable;

    #[async_trait]
    impl IdentityService for Unreachable {
        async fn obtain_client_credentials(
            &self,
            _parameters: &TokenParameters,
        ) -> Result<TokenRepresentation, IdentityError> {
            Err(IdentityError::Unavailable("identity provider offline".into()))
        }

        async fn verify_token(
            &self,
            _token: &TokenRepresentation,
            _audience: &str,
        ) -> Result<ClaimToken, IdentityError> {
            Err(IdentityError::Unavailable("identity provider offline".into()))
        }
    }

    fn request() -> NegotiationRequest {
        NegotiationRequest {
            connector_address: "http://provider:8282/api/v1/ids/data".into(),
            protocol: "ids-multipart".into(),
            offer: ContractOffer {
                id: "offer-1".into(),
                asset_id: "asset-1".into(),
                policy: Policy::default(),
            },
        }
    }

    #[tokio::test]
    async fn credential_failure_terminates_with_detail() {
        let service = ContractNegotiationServiceImpl::new(
            Arc::new(InMemoryContractNegotiationStore::default()),
            Arc::new(Unreachable),
            Arc::new(SyncEventRouter::new()),
        );

        let negotiation = service.initiate(request()).await.unwrap();
        assert_eq!(negotiation.state, NegotiationState::Terminated);
        assert!(negotiation
            .error_detail
            .as_deref()
            .is_some_and(|detail| detail.contains("offline")));

        let stored = service.find_by_id(&negotiation.id).await.unwrap();
        assert_eq!(stored.state, NegotiationState::Terminated);
        assert!(matches!(
            service.cancel(&negotiation.id).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn empty_counter_party_is_rejected() {
        let service = ContractNegotiationServiceImpl::new(
            Arc::new(InMemoryContractNegotiationStore::default()),
            Arc::new(Unreachable),
            Arc::new(SyncEventRouter::new()),
        );
        let mut request = request();
        request.connector_address = "  ".into();

        assert!(matches!(
            service.initiate(request).await,
            Err(ServiceError::BadRequest(_))
        ));
    }
}
