use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    Asset, AssetEntry, AssetIndex, AssetService, Criterion, Event, EventRouter, QuerySpec,
    ServiceError, ServiceResult, TransferProcessStore,
};
use tracing::info;

use super::{not_found, require_id, ReferenceGuard};

/// Asset lifecycle over an [`AssetIndex`].
///
/// Deleting an asset that a running transfer process still refers to is
/// rejected with [`ServiceError::Conflict`].
pub struct AssetServiceImpl {
    index: Arc<dyn AssetIndex>,
    transfers: Arc<dyn TransferProcessStore>,
    references: ReferenceGuard,
    events: Arc<dyn EventRouter>,
}

impl AssetServiceImpl {
    pub fn new(
        index: Arc<dyn AssetIndex>,
        transfers: Arc<dyn TransferProcessStore>,
        references: ReferenceGuard,
        events: Arc<dyn EventRouter>,
    ) -> Self {
        Self {
            index,
            transfers,
            references,
            events,
        }
    }
}

#[async_trait]
impl AssetService for AssetServiceImpl {
    async fn create(&self, entry: AssetEntry) -> ServiceResult<Asset> {
        require_id("Asset", &entry.asset.id)?;
        let asset = entry.asset.clone();
        self.index.create(entry).await?;

        info!(asset_id = %asset.id, "Asset created");
        self.events
            .publish(Event::AssetCreated {
                asset_id: asset.id.clone(),
            })
            .await;
        Ok(asset)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<Asset> {
        self.index
            .find_by_id(id)
            .await
            .ok_or_else(|| not_found("Asset", id))
    }

    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<Asset>> {
        Ok(self.index.query(spec).await)
    }

    async fn delete(&self, id: &str) -> ServiceResult<Asset> {
        let referencing = QuerySpec::all().with_filter(Criterion::equals("request.assetId", id));
        let references = self.references.hold().await;
        if let Some(process) = self
            .transfers
            .query(&referencing)
            .await
            .into_iter()
            .find(|process| !process.state.is_final())
        {
            return Err(ServiceError::Conflict(format!(
                "Asset {id} is in use by transfer process {}",
                process.id
            )));
        }

        let asset = self.index.delete_by_id(id).await?;
        drop(references);
        info!(asset_id = %id, "Asset deleted");
        self.events
            .publish(Event::AssetDeleted {
                asset_id: id.to_owned(),
            })
            .await;
        Ok(asset)
    }
}
