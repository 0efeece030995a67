use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use spi::{ContractDefinition, Criterion, Timestamp};

use super::{id_or_generate, json_body, list_spec, ManagementServices};
use crate::query::ListParams;
use crate::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractDefinitionDto {
    #[serde(default)]
    id: Option<String>,
    access_policy_id: String,
    contract_policy_id: String,
    #[serde(default, alias = "criteria")]
    asset_selector: Vec<Criterion>,
}

pub(super) fn routes() -> Router<ManagementServices> {
    Router::new()
        .route("/contractdefinitions", get(list).post(create))
        .route("/contractdefinitions/{id}", get(find).delete(remove))
}

async fn create(
    State(services): State<ManagementServices>,
    payload: Result<Json<ContractDefinitionDto>, JsonRejection>,
) -> Result<Json<ContractDefinition>, ApiError> {
    let dto = json_body(payload)?;
    let definition = ContractDefinition {
        id: id_or_generate(dto.id),
        access_policy_id: dto.access_policy_id,
        contract_policy_id: dto.contract_policy_id,
        asset_selector: dto.asset_selector,
        created_at: Timestamp::now(),
    };
    Ok(Json(services.contract_definitions.create(definition).await?))
}

async fn list(
    State(services): State<ManagementServices>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ContractDefinition>>, ApiError> {
    let spec = list_spec(params)?;
    Ok(Json(services.contract_definitions.query(&spec).await?))
}

async fn find(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<ContractDefinition>, ApiError> {
    Ok(Json(services.contract_definitions.find_by_id(&id).await?))
}

async fn remove(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.contract_definitions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
