//! Sample extension reacting to transfer events.

use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    Event, EventEnvelope, EventRouter, EventSubscriber, ExtensionDescriptor, ExtensionError,
    ServiceExtension, ServiceExtensionContext, TransferProcessService,
};
use tracing::{info, warn};

/// Logs every completed or terminated transfer, with its asset when the
/// transfer service is available.
#[derive(Debug, Default)]
pub struct TransferListenerExtension;

impl TransferListenerExtension {
    pub const NAME: &'static str = "transfer-listener";
}

impl ServiceExtension for TransferListenerExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME)
            .requires::<dyn EventRouter>()
            .requires_optional::<dyn TransferProcessService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let transfers = context.optional_service::<dyn TransferProcessService>()?;
        context
            .service::<dyn EventRouter>()?
            .register(Arc::new(TransferListener { transfers }));
        Ok(())
    }
}

struct TransferListener {
    transfers: Option<Arc<dyn TransferProcessService>>,
}

impl TransferListener {
    async fn asset_of(&self, id: &str) -> Option<String> {
        let transfers = self.transfers.as_ref()?;
        transfers
            .find_by_id(id)
            .await
            .ok()
            .map(|process| process.asset_id().to_owned())
    }
}

#[async_trait]
impl EventSubscriber for TransferListener {
    async fn on_event(&self, event: &EventEnvelope) {
        match &event.payload {
            Event::TransferProcessCompleted { transfer_process_id } => {
                let asset = self.asset_of(transfer_process_id).await;
                info!(
                    transfer_process_id = %transfer_process_id,
                    asset_id = asset.as_deref().unwrap_or("unknown"),
                    at = %event.at,
                    "Transfer completed"
                );
            }
            Event::TransferProcessTerminated {
                transfer_process_id,
                reason,
            } => {
                warn!(
                    transfer_process_id = %transfer_process_id,
                    reason = %reason,
                    "Transfer terminated"
                );
            }
            _ => {}
        }
    }
}
