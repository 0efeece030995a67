//! Assets: the data a connector offers, and where that data lives.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DataAddress, QuerySpec, ServiceResult, ServiceType, StoreResult, Timestamp};

/// Metadata describing an offered piece of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Unique id.
    pub id: String,
    /// Free-form metadata (name, content type, version…).
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// When the asset was created.
    pub created_at: Timestamp,
}

impl Asset {
    /// Creates an asset with no properties.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
            created_at: Timestamp::now(),
        }
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// An asset together with the address of its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// The asset metadata.
    pub asset: Asset,
    /// Where the data lives. Never exposed through listings.
    pub data_address: DataAddress,
}

/// Persistence of assets and their data addresses.
#[async_trait]
pub trait AssetIndex: Send + Sync {
    /// Stores a new entry; fails if the id is taken.
    async fn create(&self, entry: AssetEntry) -> StoreResult<()>;

    /// Looks up an asset.
    async fn find_by_id(&self, id: &str) -> Option<Asset>;

    /// Returns assets matching `spec`.
    async fn query(&self, spec: &QuerySpec) -> Vec<Asset>;

    /// Returns the data address of an asset.
    async fn resolve_data_address(&self, id: &str) -> Option<DataAddress>;

    /// Removes an asset and returns it.
    async fn delete_by_id(&self, id: &str) -> StoreResult<Asset>;
}

impl ServiceType for dyn AssetIndex {
    const NAME: &'static str = "asset-index";
}

/// Validated asset operations that also publish events.
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Creates an asset.
    async fn create(&self, entry: AssetEntry) -> ServiceResult<Asset>;

    /// Looks up an asset.
    async fn find_by_id(&self, id: &str) -> ServiceResult<Asset>;

    /// Lists assets.
    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<Asset>>;

    /// Deletes an asset unless an active transfer references it.
    async fn delete(&self, id: &str) -> ServiceResult<Asset>;
}

impl ServiceType for dyn AssetService {
    const NAME: &'static str = "asset-service";
}
