//! Route table.
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/assets`, `/assets/{id}` | list, create / get, delete |
//! | `/policydefinitions`, `/policydefinitions/{id}` | list, create / get, delete |
//! | `/contractdefinitions`, `/contractdefinitions/{id}` | list, create / get, delete |
//! | `/contractnegotiations`, `/{id}`, `/{id}/state` | list, initiate / get / state |
//! | `/contractnegotiations/{id}/cancel`, `/{id}/decline` | `POST` |
//! | `/transferprocess`, `/{id}`, `/{id}/state` | list, initiate / get / state |
//! | `/transferprocess/{id}/complete`, `/{id}/terminate` | `POST` |

mod assets;
mod contract_definitions;
mod negotiations;
mod policies;
mod transfers;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::{middleware, Router};
use spi::{
    AssetService, AuthenticationService, ContractDefinitionService, ContractNegotiationService,
    PolicyDefinitionService, QuerySpec, TransferProcessService,
};

use crate::auth::authenticate;
use crate::query::ListParams;
use crate::ApiError;

/// The services the management routes call.
#[derive(Clone)]
pub struct ManagementServices {
    pub assets: Arc<dyn AssetService>,
    pub policies: Arc<dyn PolicyDefinitionService>,
    pub contract_definitions: Arc<dyn ContractDefinitionService>,
    pub negotiations: Arc<dyn ContractNegotiationService>,
    pub transfers: Arc<dyn TransferProcessService>,
}

/// Every management route, behind the authentication middleware.
pub fn router(services: ManagementServices, auth: Arc<dyn AuthenticationService>) -> Router {
    Router::new()
        .merge(assets::routes())
        .merge(policies::routes())
        .merge(contract_definitions::routes())
        .merge(negotiations::routes())
        .merge(transfers::routes())
        .layer(middleware::from_fn_with_state(auth, authenticate))
        .with_state(services)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn list_spec(params: Result<Query<ListParams>, QueryRejection>) -> Result<QuerySpec, ApiError> {
    params
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?
        .0
        .into_spec()
}

/// Uses the given id, or a fresh UUID when none (or a blank one) was sent.
fn id_or_generate(id: Option<String>) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
