//! Bearer token acquisition for outbound calls.
//!
//! Tokens are requested for every outbound call and never cached here: the
//! identity endpoint owns token lifetime.

pub mod managed_identity;
pub mod static_token;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AzureConfig;
use crate::types::AppResult;

pub use managed_identity::ManagedIdentityCredential;
pub use static_token::StaticTokenCredential;

#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> AppResult<AccessToken>;
}

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Pick the credential source for this process.
///
/// A static `AZURE_ACCESS_TOKEN` wins so the relay can run outside Azure;
/// otherwise the managed identity endpoint is used.
pub fn credential_from_config(
    config: &AzureConfig,
    client: reqwest::Client,
) -> Arc<dyn TokenCredential> {
    if let Some(token) = &config.static_token {
        info!("Using static access token from environment");
        return Arc::new(StaticTokenCredential::new(token.clone()));
    }

    let credential = ManagedIdentityCredential::from_config(config, client);
    info!(
        source = credential.source_name(),
        user_assigned = config.managed_identity_client_id.is_some(),
        "Using managed identity credential"
    );
    Arc::new(credential)
}

/// Binds a credential to one scope and yields `Authorization` header values.
#[derive(Clone)]
pub struct BearerTokenProvider {
    credential: Arc<dyn TokenCredential>,
    scope: String,
}

impl BearerTokenProvider {
    pub fn new(credential: Arc<dyn TokenCredential>, scope: impl Into<String>) -> Self {
        Self {
            credential,
            scope: scope.into(),
        }
    }

    pub async fn bearer(&self) -> AppResult<String> {
        let token = self.credential.get_token(&self.scope).await?;
        Ok(format!("Bearer {}", token.token))
    }
}

/// Managed identity endpoints take a resource, not an AAD v2 scope.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
