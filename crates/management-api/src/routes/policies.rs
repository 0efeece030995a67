use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use spi::{Policy, PolicyDefinition};

use super::{id_or_generate, json_body, list_spec, ManagementServices};
use crate::query::ListParams;
use crate::ApiError;

#[derive(Debug, Deserialize)]
struct PolicyDefinitionDto {
    #[serde(default)]
    id: Option<String>,
    policy: Policy,
}

pub(super) fn routes() -> Router<ManagementServices> {
    Router::new()
        .route("/policydefinitions", get(list).post(create))
        .route("/policydefinitions/{id}", get(find).delete(remove))
}

async fn create(
    State(services): State<ManagementServices>,
    payload: Result<Json<PolicyDefinitionDto>, JsonRejection>,
) -> Result<Json<PolicyDefinition>, ApiError> {
    let dto = json_body(payload)?;
    let definition = PolicyDefinition::new(id_or_generate(dto.id), dto.policy);
    Ok(Json(services.policies.create(definition).await?))
}

async fn list(
    State(services): State<ManagementServices>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<PolicyDefinition>>, ApiError> {
    let spec = list_spec(params)?;
    Ok(Json(services.policies.query(&spec).await?))
}

async fn find(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<PolicyDefinition>, ApiError> {
    Ok(Json(services.policies.find_by_id(&id).await?))
}

async fn remove(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.policies.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
