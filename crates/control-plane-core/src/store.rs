//! In-memory stores.
//!
//! Every default store is the same keyed map behind an async lock; the
//! per-entity types only differ in which SPI trait they implement. Entities
//! keep their insertion order, which is what an unsorted query returns.

use async_trait::async_trait;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use spi::{
    Asset, AssetEntry, AssetIndex, ContractDefinition, ContractDefinitionStore,
    ContractNegotiation, ContractNegotiationStore, DataAddress, Mutation, PolicyDefinition,
    PolicyDefinitionStore, QuerySpec, StoreError, StoreResult, TransferProcess,
    TransferProcessStore,
};
use tokio::sync::RwLock;

/// An entity stored under a string id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for AssetEntry {
    fn key(&self) -> &str {
        &self.asset.id
    }
}

impl Keyed for PolicyDefinition {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ContractDefinition {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ContractNegotiation {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for TransferProcess {
    fn key(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Generic store
// ---------------------------------------------------------------------------

/// Insertion-ordered map of entities guarded by a `tokio` read/write lock.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    entries: RwLock<IndexMap<String, T>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }
}

impl<T: Keyed + Clone + Serialize + Send + Sync> InMemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find(&self, id: &str) -> Option<T> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn query(&self, spec: &QuerySpec) -> Vec<T> {
        let entries = self.entries.read().await;
        spec.apply(entries.values().cloned())
    }

    /// Runs `spec` against a projection of each entity.
    pub async fn query_projected<P, F>(&self, spec: &QuerySpec, project: F) -> Vec<P>
    where
        P: Serialize,
        F: Fn(&T) -> P,
    {
        let entries = self.entries.read().await;
        spec.apply(entries.values().map(project))
    }

    pub async fn create(&self, item: T) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        match entries.entry(item.key().to_owned()) {
            Entry::Occupied(occupied) => Err(StoreError::AlreadyExists {
                id: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(item);
                Ok(())
            }
        }
    }

    pub async fn update(&self, item: T) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(item.key()) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                id: item.key().to_owned(),
            }),
        }
    }

    /// Checks and changes one entity under the write lock. A rejected
    /// mutation leaves the entity as it was.
    pub async fn update_with<F>(&self, id: &str, mutation: F) -> StoreResult<T>
    where
        F: FnOnce(&mut T) -> Result<(), String>,
    {
        let mut entries = self.entries.write().await;
        let existing = entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;
        let mut changed = existing.clone();
        mutation(&mut changed).map_err(|reason| StoreError::Rejected {
            id: id.to_owned(),
            reason,
        })?;
        *existing = changed.clone();
        Ok(changed)
    }

    /// Inserts or replaces; a replaced entity keeps its position.
    pub async fn upsert(&self, item: T) {
        self.entries.write().await.insert(item.key().to_owned(), item);
    }

    pub async fn delete(&self, id: &str) -> StoreResult<T> {
        self.entries
            .write()
            .await
            .shift_remove(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

// ---------------------------------------------------------------------------
// SPI implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryAssetIndex {
    store: InMemoryStore<AssetEntry>,
}

#[async_trait]
impl AssetIndex for InMemoryAssetIndex {
    async fn create(&self, entry: AssetEntry) -> StoreResult<()> {
        self.store.create(entry).await
    }

    async fn find_by_id(&self, id: &str) -> Option<Asset> {
        self.store.find(id).await.map(|entry| entry.asset)
    }

    async fn query(&self, spec: &QuerySpec) -> Vec<Asset> {
        self.store
            .query_projected(spec, |entry| entry.asset.clone())
            .await
    }

    async fn resolve_data_address(&self, id: &str) -> Option<DataAddress> {
        self.store.find(id).await.map(|entry| entry.data_address)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<Asset> {
        self.store.delete(id).await.map(|entry| entry.asset)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPolicyDefinitionStore {
    store: InMemoryStore<PolicyDefinition>,
}

#[async_trait]
impl PolicyDefinitionStore for InMemoryPolicyDefinitionStore {
    async fn find_by_id(&self, id: &str) -> Option<PolicyDefinition> {
        self.store.find(id).await
    }

    async fn query(&self, spec: &QuerySpec) -> Vec<PolicyDefinition> {
        self.store.query(spec).await
    }

    async fn create(&self, definition: PolicyDefinition) -> StoreResult<()> {
        self.store.create(definition).await
    }

    async fn update(&self, definition: PolicyDefinition) -> StoreResult<()> {
        self.store.update(definition).await
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<PolicyDefinition> {
        self.store.delete(id).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryContractDefinitionStore {
    store: InMemoryStore<ContractDefinition>,
}

#[async_trait]
impl ContractDefinitionStore for InMemoryContractDefinitionStore {
    async fn find_by_id(&self, id: &str) -> Option<ContractDefinition> {
        self.store.find(id).await
    }

    async fn query(&self, spec: &QuerySpec) -> Vec<ContractDefinition> {
        self.store.query(spec).await
    }

    async fn create(&self, definition: ContractDefinition) -> StoreResult<()> {
        self.store.create(definition).await
    }

    async fn update(&self, definition: ContractDefinition) -> StoreResult<()> {
        self.store.update(definition).await
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<ContractDefinition> {
        self.store.delete(id).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryContractNegotiationStore {
    store: InMemoryStore<ContractNegotiation>,
}

#[async_trait]
impl ContractNegotiationStore for InMemoryContractNegotiationStore {
    async fn find_by_id(&self, id: &str) -> Option<ContractNegotiation> {
        self.store.find(id).await
    }

    async fn query(&self, spec: &QuerySpec) -> Vec<ContractNegotiation> {
        self.store.query(spec).await
    }

    async fn save(&self, negotiation: ContractNegotiation) {
        self.store.upsert(negotiation).await;
    }

    async fn update_with(
        &self,
        id: &str,
        mutation: Mutation<'_, ContractNegotiation>,
    ) -> StoreResult<ContractNegotiation> {
        self.store.update_with(id, mutation).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTransferProcessStore {
    store: InMemoryStore<TransferProcess>,
}

#[async_trait]
impl TransferProcessStore for InMemoryTransferProcessStore {
    async fn find_by_id(&self, id: &str) -> Option<TransferProcess> {
        self.store.find(id).await
    }

    async fn query(&self, spec: &QuerySpec) -> Vec<TransferProcess> {
        self.store.query(spec).await
    }

    async fn save(&self, process: TransferProcess) {
        self.store.upsert(process).await;
    }

    async fn update_with(
        &self,
        id: &str,
        mutation: Mutation<'_, TransferProcess>,
    ) -> StoreResult<TransferProcess> {
        self.store.update_with(id, mutation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spi::{Criterion, Policy, SortOrder};

    fn entry(id: &str, kind: &str) -> AssetEntry {
        AssetEntry {
            asset: Asset::new(id).with_property("type", kind),
            data_address: DataAddress::of_type(kind),
        }
    }

    #[tokio::test]
    async fn create_rejects_existing_ids() {
        let index = InMemoryAssetIndex::default();
        index.create(entry("a", "file")).await.unwrap();

        let err = index.create(entry("a", "s3")).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists { id: "a".into() });
        assert_eq!(index.resolve_data_address("a").await.unwrap().kind(), Some("file"));
    }

    #[tokio::test]
    async fn asset_query_filters_on_properties() {
        let index = InMemoryAssetIndex::default();
        for (id, kind) in [("a", "file"), ("b", "s3"), ("c", "file")] {
            index.create(entry(id, kind)).await.unwrap();
        }

        let spec = QuerySpec::all().with_filter(Criterion::equals("type", "file"));
        let ids: Vec<String> = index.query(&spec).await.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn delete_preserves_order_of_remaining_entries() {
        let store = InMemoryPolicyDefinitionStore::default();
        for id in ["p1", "p2", "p3"] {
            store
                .create(PolicyDefinition::new(id, Policy::default()))
                .await
                .unwrap();
        }

        store.delete_by_id("p2").await.unwrap();
        let ids: Vec<String> = store
            .query(&QuerySpec::all())
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert!(matches!(
            store.delete_by_id("p2").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rejected_mutation_leaves_the_entity_unchanged() {
        let store: InMemoryStore<PolicyDefinition> = InMemoryStore::new();
        store
            .create(PolicyDefinition::new("p1", Policy::default()))
            .await
            .unwrap();

        let err = store
            .update_with("p1", |definition| {
                definition.id = "changed".into();
                Err("not allowed".into())
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Rejected {
                id: "p1".into(),
                reason: "not allowed".into()
            }
        );
        assert!(store.find("p1").await.is_some());
        assert!(matches!(
            store.update_with("ghost", |_| Ok(())).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_requires_an_existing_entity() {
        let store = InMemoryPolicyDefinitionStore::default();
        let err = store
            .update(PolicyDefinition::new("ghost", Policy::default()))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound { id: "ghost".into() });
    }

    #[tokio::test]
    async fn query_pages_after_sorting() {
        let store = InMemoryPolicyDefinitionStore::default();
        for id in ["b", "d", "a", "c"] {
            store
                .create(PolicyDefinition::new(id, Policy::default()))
                .await
                .unwrap();
        }

        let spec = QuerySpec {
            offset: 1,
            limit: 2,
            sort_field: Some("id".into()),
            sort_order: SortOrder::Desc,
            ..QuerySpec::default()
        };
        let ids: Vec<String> = store.query(&spec).await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
