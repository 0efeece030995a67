use std::sync::Arc;

use async_trait::async_trait;
use spi::{ExtensionDescriptor, ExtensionError, ServiceExtension, ServiceExtensionContext};

use crate::{AxumWebServer, WebServer};

/// Provides the default [`WebServer`]. Contexts are read from the `web.http`
/// settings during initialization; listeners are bound on start.
#[derive(Debug, Default)]
pub struct WebServerExtension {
    server: Option<Arc<AxumWebServer>>,
}

impl WebServerExtension {
    pub const NAME: &'static str = "web-server";
}

#[async_trait]
impl ServiceExtension for WebServerExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME).provides_default::<dyn WebServer>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let server = Arc::new(AxumWebServer::from_config(context.config())?);
        context.register::<dyn WebServer>(Arc::clone(&server) as Arc<dyn WebServer>)?;
        self.server = Some(server);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ExtensionError> {
        if let Some(server) = &self.server {
            server.start().await?;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ExtensionError> {
        if let Some(server) = &self.server {
            server.stop().await;
        }
        Ok(())
    }
}
