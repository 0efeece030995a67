//! API-key authentication.
//!
//! A request is authenticated when its `x-api-key` header (any case) carries
//! the key configured under `edc.api.auth.key`. Without a configured key a
//! random one is generated, which locks the API until a key is configured.

use std::collections::HashMap;
use std::sync::Arc;

use spi::{
    AuthenticationService, ExtensionDescriptor, ExtensionError, ServiceExtension,
    ServiceExtensionContext,
};
use tracing::warn;
use uuid::Uuid;

/// Header carrying the key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Setting holding the expected key.
pub const API_KEY_SETTING: &str = "edc.api.auth.key";

pub struct TokenBasedAuthenticationService {
    api_key: String,
}

impl TokenBasedAuthenticationService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for TokenBasedAuthenticationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBasedAuthenticationService")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AuthenticationService for TokenBasedAuthenticationService {
    fn is_authenticated(&self, headers: &HashMap<String, Vec<String>>) -> bool {
        headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(API_KEY_HEADER))
            .flat_map(|(_, values)| values)
            .any(|value| *value == self.api_key)
    }
}

#[derive(Debug, Default)]
pub struct TokenBasedAuthExtension;

impl TokenBasedAuthExtension {
    pub const NAME: &'static str = "auth-tokenbased";
}

impl ServiceExtension for TokenBasedAuthExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME).provides::<dyn AuthenticationService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let api_key = match context.config().get(API_KEY_SETTING) {
            Some(key) if !key.trim().is_empty() => key.to_owned(),
            _ => {
                warn!(
                    setting = API_KEY_SETTING,
                    "No API key configured, using a random key"
                );
                Uuid::new_v4().to_string()
            }
        };
        context.register::<dyn AuthenticationService>(Arc::new(TokenBasedAuthenticationService::new(
            api_key,
        )))?;
        Ok(())
    }
}
