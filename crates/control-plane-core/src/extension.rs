//! Extensions contributing the default control plane.

use std::sync::Arc;

use spi::{
    AssetIndex, AssetService, ContractDefinitionService, ContractDefinitionStore,
    ContractNegotiationService, ContractNegotiationStore, EventRouter, ExtensionDescriptor,
    ExtensionError, IdentityService, PolicyDefinitionService, PolicyDefinitionStore,
    ServiceExtension, ServiceExtensionContext, TransferProcessService, TransferProcessStore,
};
use tracing::debug;

use crate::events::SyncEventRouter;
use crate::services::{
    AssetServiceImpl, ContractDefinitionServiceImpl, ContractNegotiationServiceImpl,
    PolicyDefinitionServiceImpl, ReferenceGuard, TransferProcessServiceImpl,
};
use crate::store::{
    InMemoryAssetIndex, InMemoryContractDefinitionStore, InMemoryContractNegotiationStore,
    InMemoryPolicyDefinitionStore, InMemoryTransferProcessStore,
};

/// In-memory stores, each a default provider that a persistent store
/// extension replaces, plus the event router.
#[derive(Debug, Default)]
pub struct ControlPlaneDefaultServicesExtension;

impl ControlPlaneDefaultServicesExtension {
    pub const NAME: &'static str = "control-plane-default-services";
}

impl ServiceExtension for ControlPlaneDefaultServicesExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME)
            .provides_default::<dyn AssetIndex>()
            .provides_default::<dyn PolicyDefinitionStore>()
            .provides_default::<dyn ContractDefinitionStore>()
            .provides_default::<dyn ContractNegotiationStore>()
            .provides_default::<dyn TransferProcessStore>()
            .provides::<dyn EventRouter>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        context.register::<dyn AssetIndex>(Arc::new(InMemoryAssetIndex::default()))?;
        context.register::<dyn PolicyDefinitionStore>(Arc::new(
            InMemoryPolicyDefinitionStore::default(),
        ))?;
        context.register::<dyn ContractDefinitionStore>(Arc::new(
            InMemoryContractDefinitionStore::default(),
        ))?;
        context.register::<dyn ContractNegotiationStore>(Arc::new(
            InMemoryContractNegotiationStore::default(),
        ))?;
        context.register::<dyn TransferProcessStore>(Arc::new(
            InMemoryTransferProcessStore::default(),
        ))?;
        context.register::<dyn EventRouter>(Arc::new(SyncEventRouter::new()))?;
        debug!(extension = Self::NAME, "Default control-plane services registered");
        Ok(())
    }
}

/// The asset, policy, contract and transfer services.
#[derive(Debug, Default)]
pub struct ControlPlaneServicesExtension;

impl ControlPlaneServicesExtension {
    pub const NAME: &'static str = "control-plane-services";
}

impl ServiceExtension for ControlPlaneServicesExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME)
            .provides::<dyn AssetService>()
            .provides::<dyn PolicyDefinitionService>()
            .provides::<dyn ContractDefinitionService>()
            .provides::<dyn ContractNegotiationService>()
            .provides::<dyn TransferProcessService>()
            .requires::<dyn AssetIndex>()
            .requires::<dyn PolicyDefinitionStore>()
            .requires::<dyn ContractDefinitionStore>()
            .requires::<dyn ContractNegotiationStore>()
            .requires::<dyn TransferProcessStore>()
            .requires::<dyn EventRouter>()
            .requires::<dyn IdentityService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let assets = context.service::<dyn AssetIndex>()?;
        let policies = context.service::<dyn PolicyDefinitionStore>()?;
        let contracts = context.service::<dyn ContractDefinitionStore>()?;
        let negotiations = context.service::<dyn ContractNegotiationStore>()?;
        let transfers = context.service::<dyn TransferProcessStore>()?;
        let events = context.service::<dyn EventRouter>()?;
        let identity = context.service::<dyn IdentityService>()?;
        let references = ReferenceGuard::new();

        context.register::<dyn AssetService>(Arc::new(AssetServiceImpl::new(
            assets,
            Arc::clone(&transfers),
            references.clone(),
            Arc::clone(&events),
        )))?;
        context.register::<dyn PolicyDefinitionService>(Arc::new(
            PolicyDefinitionServiceImpl::new(
                Arc::clone(&policies),
                Arc::clone(&contracts),
                references.clone(),
                Arc::clone(&events),
            ),
        ))?;
        context.register::<dyn ContractDefinitionService>(Arc::new(
            ContractDefinitionServiceImpl::new(
                contracts,
                policies,
                references.clone(),
                Arc::clone(&events),
            ),
        ))?;
        context.register::<dyn ContractNegotiationService>(Arc::new(
            ContractNegotiationServiceImpl::new(negotiations, identity, Arc::clone(&events)),
        ))?;
        context.register::<dyn TransferProcessService>(Arc::new(
            TransferProcessServiceImpl::new(transfers, references, events),
        ))?;
        Ok(())
    }
}
