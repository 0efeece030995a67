use spi::{
    AssetService, AuthenticationService, ContractDefinitionService, ContractNegotiationService,
    ExtensionDescriptor, ExtensionError, PolicyDefinitionService, ServiceExtension,
    ServiceExtensionContext, TransferProcessService,
};
use tracing::info;
use web_server::{WebServer, DEFAULT_CONTEXT};

use crate::routes::{router, ManagementServices};

/// Web context the API is served on when configured.
pub const MANAGEMENT_CONTEXT: &str = "management";

/// Registers the management routes with the [`WebServer`], on the
/// `management` context if one is configured and on the default context
/// otherwise.
#[derive(Debug, Default)]
pub struct ManagementApiExtension;

impl ManagementApiExtension {
    pub const NAME: &'static str = "management-api";
}

impl ServiceExtension for ManagementApiExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME)
            .requires::<dyn WebServer>()
            .requires::<dyn AuthenticationService>()
            .requires::<dyn AssetService>()
            .requires::<dyn PolicyDefinitionService>()
            .requires::<dyn ContractDefinitionService>()
            .requires::<dyn ContractNegotiationService>()
            .requires::<dyn TransferProcessService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let services = ManagementServices {
            assets: context.service::<dyn AssetService>()?,
            policies: context.service::<dyn PolicyDefinitionService>()?,
            contract_definitions: context.service::<dyn ContractDefinitionService>()?,
            negotiations: context.service::<dyn ContractNegotiationService>()?,
            transfers: context.service::<dyn TransferProcessService>()?,
        };
        let auth = context.service::<dyn AuthenticationService>()?;
        let web = context.service::<dyn WebServer>()?;

        let target = if web.has_context(MANAGEMENT_CONTEXT) {
            MANAGEMENT_CONTEXT
        } else {
            DEFAULT_CONTEXT
        };
        web.register(target, router(services, auth))?;
        info!(context = target, "Management API registered");
        Ok(())
    }
}
