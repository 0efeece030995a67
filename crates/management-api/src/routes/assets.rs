use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use spi::{Asset, AssetEntry, DataAddress};

use super::{id_or_generate, json_body, list_spec, ManagementServices};
use crate::query::ListParams;
use crate::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetEntryDto {
    asset: AssetDto,
    data_address: DataAddress,
}

#[derive(Debug, Deserialize)]
struct AssetDto {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, serde_json::Value>,
}

pub(super) fn routes() -> Router<ManagementServices> {
    Router::new()
        .route("/assets", get(list).post(create))
        .route("/assets/{id}", get(find).delete(remove))
}

async fn create(
    State(services): State<ManagementServices>,
    payload: Result<Json<AssetEntryDto>, JsonRejection>,
) -> Result<Json<Asset>, ApiError> {
    let dto = json_body(payload)?;
    let mut asset = Asset::new(id_or_generate(dto.asset.id));
    asset.properties = dto.asset.properties;
    let entry = AssetEntry {
        asset,
        data_address: dto.data_address,
    };
    Ok(Json(services.assets.create(entry).await?))
}

async fn list(
    State(services): State<ManagementServices>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Asset>>, ApiError> {
    let spec = list_spec(params)?;
    Ok(Json(services.assets.query(&spec).await?))
}

async fn find(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<Json<Asset>, ApiError> {
    Ok(Json(services.assets.find_by_id(&id).await?))
}

async fn remove(
    State(services): State<ManagementServices>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.assets.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
