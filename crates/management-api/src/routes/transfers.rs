use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use spi::{TransferProcess, TransferRequest};

use super::{json_body, list_spec, ManagementServices};
use crate::query::ListParams;
use crate::ApiError;

/// Reason recorded when a terminate request carries none.
const DEFAULT_TERMINATION_REASON: &str = "Terminated through the management API";

#[derive(Debug, Default, Deserialize)]
struct TerminateDto {
    #[serde(default)]
    reason: Option<String>,
}

pub(super) fn routes() -> Router<ManagementServices> {
    Router::new()
        .route("/transferprocess", get(list).post(initiate))
        .route("/transferprocess/{id}", get(find))
        .route("/transferprocess/{id}/state", get(state))
        .route("/transferprocess/{id}/complete", post(complete))
        .route("/transferprocess/{id}/terminate", post(terminate))
}

async fn initiate(
    State(services): State<ManagementServices>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferProcess>, ApiError> {
    let request = json_body(payload)?;
    Ok(Json(services.transfers.initiate(request).await?))
}

async fn list(
    State(services): State<ManagementServices>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TransferProcess>>, ApiError> {
    let spec = list_spec(params)?;
    Ok(Json(services.transfers.query(&spec).await?))
}

async fn find(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<TransferProcess>, ApiError> {
    Ok(Json(services.transfers.find_by_id(&id).await?))
}

async fn state(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let process = services.transfers.find_by_id(&id).await?;
    Ok(Json(json!({ "state": process.state })))
}

async fn complete(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<TransferProcess>, ApiError> {
    Ok(Json(services.transfers.complete(&id).await?))
}

/// The body, `{"reason": ".."}`, is optional.
async fn terminate(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TransferProcess>, ApiError> {
    let dto: TerminateDto = if body.is_empty() {
        TerminateDto::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };
    let reason = dto
        .reason
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TERMINATION_REASON.to_owned());
    Ok(Json(services.transfers.terminate(&id, &reason).await?))
}
