//! Mock identity service.
//!
//! Tokens are plain JSON, `{"region": .., "audience": .., "client_id": ..}`,
//! with no signature. Verification only checks that the token parses and was
//! issued for the expected audience. Never deploy this outside tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spi::{
    ClaimToken, ExtensionDescriptor, ExtensionError, IdentityError, IdentityService,
    ServiceExtension, ServiceExtensionContext, TokenParameters, TokenRepresentation,
};
use tracing::{debug, warn};

/// Setting for the region claim.
pub const REGION_SETTING: &str = "edc.mock.region";

/// Region used when [`REGION_SETTING`] is not set.
pub const DEFAULT_REGION: &str = "eu";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MockToken {
    region: String,
    audience: String,
    client_id: String,
}

#[derive(Debug, Clone)]
pub struct MockIdentityService {
    region: String,
    client_id: String,
}

impl MockIdentityService {
    pub fn new(region: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn obtain_client_credentials(
        &self,
        parameters: &TokenParameters,
    ) -> Result<TokenRepresentation, IdentityError> {
        let token = MockToken {
            region: self.region.clone(),
            audience: parameters.audience.clone(),
            client_id: self.client_id.clone(),
        };
        let token = serde_json::to_string(&token)
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        debug!(audience = %parameters.audience, scope = %parameters.scope, "Issued mock token");
        Ok(TokenRepresentation {
            token,
            expires_in: None,
        })
    }

    async fn verify_token(
        &self,
        token: &TokenRepresentation,
        audience: &str,
    ) -> Result<ClaimToken, IdentityError> {
        let parsed: MockToken = serde_json::from_str(&token.token)
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        if parsed.audience != audience {
            return Err(IdentityError::Rejected(format!(
                "audience '{}' does not match '{audience}'",
                parsed.audience
            )));
        }

        let mut claims = ClaimToken::default();
        claims.claims.insert("region".to_owned(), parsed.region);
        claims.claims.insert("client_id".to_owned(), parsed.client_id);
        Ok(claims)
    }
}

#[derive(Debug, Default)]
pub struct MockIamExtension;

impl MockIamExtension {
    pub const NAME: &'static str = "iam-mock";
}

impl ServiceExtension for MockIamExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME).provides::<dyn IdentityService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let region = context.setting(REGION_SETTING, DEFAULT_REGION);
        let client_id = context.connector_name().to_owned();
        warn!(region = %region, "Using the mock identity service; tokens are not signed");
        let identity = MockIdentityService::new(region, client_id);
        context.register::<dyn IdentityService>(Arc::new(identity))?;
        Ok(())
    }
}
