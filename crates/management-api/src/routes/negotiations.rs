use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use spi::{ContractNegotiation, NegotiationRequest};

use super::{json_body, list_spec, ManagementServices};
use crate::query::ListParams;
use crate::ApiError;

pub(super) fn routes() -> Router<ManagementServices> {
    Router::new()
        .route("/contractnegotiations", get(list).post(initiate))
        .route("/contractnegotiations/{id}", get(find))
        .route("/contractnegotiations/{id}/state", get(state))
        .route("/contractnegotiations/{id}/cancel", post(cancel))
        .route("/contractnegotiations/{id}/decline", post(decline))
}

async fn initiate(
    State(services): State<ManagementServices>,
    payload: Result<Json<NegotiationRequest>, JsonRejection>,
) -> Result<Json<ContractNegotiation>, ApiError> {
    let request = json_body(payload)?;
    Ok(Json(services.negotiations.initiate(request).await?))
}

async fn list(
    State(services): State<ManagementServices>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ContractNegotiation>>, ApiError> {
    let spec = list_spec(params)?;
    Ok(Json(services.negotiations.query(&spec).await?))
}

async fn find(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<ContractNegotiation>, ApiError> {
    Ok(Json(services.negotiations.find_by_id(&id).await?))
}

async fn state(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let negotiation = services.negotiations.find_by_id(&id).await?;
    Ok(Json(json!({ "state": negotiation.state })))
}

async fn cancel(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<ContractNegotiation>, ApiError> {
    Ok(Json(services.negotiations.cancel(&id).await?))
}

async fn decline(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<ContractNegotiation>, ApiError> {
    Ok(Json(services.negotiations.decline(&id).await?))
}
