//! Identity (connector to connector) and authentication (client to API).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{IdentityError, ServiceType};

/// What a token is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParameters {
    /// Requested scope.
    pub scope: String,
    /// Intended recipient (usually the counter-party's address).
    pub audience: String,
}

/// An opaque token handed to a counter-party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRepresentation {
    /// Encoded token.
    pub token: String,
    /// Seconds until expiry, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Claims extracted from a verified token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimToken {
    /// Claim name to value.
    pub claims: BTreeMap<String, String>,
}

impl ClaimToken {
    /// Returns a claim by name.
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }
}

/// Obtains and verifies connector identity tokens.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Obtains a token proving this connector's identity.
    async fn obtain_client_credentials(
        &self,
        parameters: &TokenParameters,
    ) -> Result<TokenRepresentation, IdentityError>;

    /// Verifies a token presented by a counter-party.
    async fn verify_token(
        &self,
        token: &TokenRepresentation,
        audience: &str,
    ) -> Result<ClaimToken, IdentityError>;
}

impl ServiceType for dyn IdentityService {
    const NAME: &'static str = "identity-service";
}

/// Decides whether an API request is authenticated.
///
/// Header names are given lower-cased; each may carry several values.
pub trait AuthenticationService: Send + Sync {
    /// Returns `true` if the request carrying `headers` may proceed.
    fn is_authenticated(&self, headers: &HashMap<String, Vec<String>>) -> bool;
}

impl ServiceType for dyn AuthenticationService {
    const NAME: &'static str = "authentication-service";
}
