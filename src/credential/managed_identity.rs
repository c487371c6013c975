// Managed identity token source
// Supports the App Service identity endpoint (IDENTITY_ENDPOINT + IDENTITY_HEADER)
// and the VM instance metadata service (IMDS).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{scope_to_resource, AccessToken, TokenCredential};
use crate::config::AzureConfig;
use crate::types::{AppError, AppResult};

const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";

#[derive(Debug, Clone)]
pub enum IdentitySource {
    AppService { endpoint: String, header: String },
    Imds { endpoint: String },
}

impl IdentitySource {
    fn name(&self) -> &'static str {
        match self {
            IdentitySource::AppService { .. } => "app_service",
            IdentitySource::Imds { .. } => "imds",
        }
    }
}

pub struct ManagedIdentityCredential {
    client: Client,
    client_id: Option<String>,
    source: IdentitySource,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<Value>,
}

impl ManagedIdentityCredential {
    pub fn new(client: Client, client_id: Option<String>, source: IdentitySource) -> Self {
        Self {
            client,
            client_id,
            source,
        }
    }

    pub fn imds(client: Client, endpoint: impl Into<String>, client_id: Option<String>) -> Self {
        Self::new(
            client,
            client_id,
            IdentitySource::Imds {
                endpoint: endpoint.into(),
            },
        )
    }

    pub fn app_service(
        client: Client,
        endpoint: impl Into<String>,
        header: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self::new(
            client,
            client_id,
            IdentitySource::AppService {
                endpoint: endpoint.into(),
                header: header.into(),
            },
        )
    }

    /// App Service wins when both of its variables are present, IMDS otherwise.
    pub fn from_config(config: &AzureConfig, client: Client) -> Self {
        let client_id = config.managed_identity_client_id.clone();
        match (&config.identity_endpoint, &config.identity_header) {
            (Some(endpoint), Some(header)) => {
                Self::app_service(client, endpoint.clone(), header.clone(), client_id)
            }
            _ => Self::imds(client, config.imds_endpoint.clone(), client_id),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str) -> AppResult<AccessToken> {
        let resource = scope_to_resource(scope);

        let (request, api_version) = match &self.source {
            IdentitySource::AppService { endpoint, header } => (
                self.client
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header),
                APP_SERVICE_API_VERSION,
            ),
            IdentitySource::Imds { endpoint } => (
                self.client.get(endpoint).header("Metadata", "true"),
                IMDS_API_VERSION,
            ),
        };

        let mut query = vec![("api-version", api_version), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Credential(format!("Managed identity request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Credential(format!(
                "Managed identity endpoint responded with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::Credential(format!("Failed to parse managed identity token response: {}", e))
        })?;

        let expires_on = token.expires_on.as_ref().and_then(parse_expires_on);
        debug!(
            source = self.source.name(),
            resource,
            expires_on = ?expires_on,
            "Acquired managed identity token"
        );

        Ok(AccessToken {
            token: token.access_token,
            expires_on,
        })
    }
}

/// `expires_on` is epoch seconds, sent as a string by App Service and as
/// either form by IMDS.
fn parse_expires_on(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SCOPE;
    use mockito::Matcher;
    use serde_json::json;

    const TOKEN_PATH: &str = "/metadata/identity/oauth2/token";

    #[tokio::test]
    async fn test_imds_token_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_header("Metadata", "true")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), IMDS_API_VERSION.into()),
                Matcher::UrlEncoded(
                    "resource".into(),
                    "https://cognitiveservices.azure.com".into(),
                ),
                Matcher::UrlEncoded("client_id".into(), "uami-123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok-imds","expires_on":"1767225600","token_type":"Bearer"}"#)
            .create_async()
            .await;

        let credential = ManagedIdentityCredential::imds(
            Client::new(),
            format!("{}{}", server.url(), TOKEN_PATH),
            Some("uami-123".to_string()),
        );
        let token = credential.get_token(DEFAULT_SCOPE).await.unwrap();

        assert_eq!(token.token, "tok-imds");
        assert_eq!(token.expires_on.unwrap().timestamp(), 1767225600);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_app_service_token_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/msi/token")
            .match_header("X-IDENTITY-HEADER", "secret-header")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), APP_SERVICE_API_VERSION.into()),
                Matcher::UrlEncoded(
                    "resource".into(),
                    "https://cognitiveservices.azure.com".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok-app","expires_on":1767225600}"#)
            .create_async()
            .await;

        let credential = ManagedIdentityCredential::app_service(
            Client::new(),
            format!("{}/msi/token", server.url()),
            "secret-header",
            None,
        );
        let token = credential.get_token(DEFAULT_SCOPE).await.unwrap();

        assert_eq!(token.token, "tok-app");
        assert_eq!(credential.source_name(), "app_service");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_identity_endpoint_failure_is_credential_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_request","error_description":"Identity not found"}"#)
            .create_async()
            .await;

        let credential = ManagedIdentityCredential::imds(
            Client::new(),
            format!("{}{}", server.url(), TOKEN_PATH),
            Some("missing".to_string()),
        );
        let err = credential.get_token(DEFAULT_SCOPE).await.unwrap_err();

        match err {
            AppError::Credential(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("Identity not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_expires_on() {
        assert_eq!(
            parse_expires_on(&json!(1767225600)).unwrap().timestamp(),
            1767225600
        );
        assert_eq!(
            parse_expires_on(&json!("1767225600")).unwrap().timestamp(),
            1767225600
        );
        assert!(parse_expires_on(&json!("12/10/2019 2:30:00 PM +00:00")).is_none());
        assert!(parse_expires_on(&json!(null)).is_none());
    }

    #[test]
    fn test_from_config_prefers_app_service() {
        let mut config = AzureConfig {
            endpoint: "https://example.invalid".to_string(),
            api_version: "2025-11-01".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            user_agent: "test".to_string(),
            request_timeout: std::time::Duration::from_secs(30),
            managed_identity_client_id: None,
            identity_endpoint: Some("http://localhost:4141/msi/token".to_string()),
            identity_header: Some("h".to_string()),
            imds_endpoint: crate::config::DEFAULT_IMDS_ENDPOINT.to_string(),
            static_token: None,
        };
        assert_eq!(
            ManagedIdentityCredential::from_config(&config, Client::new()).source_name(),
            "app_service"
        );

        config.identity_header = None;
        assert_eq!(
            ManagedIdentityCredential::from_config(&config, Client::new()).source_name(),
            "imds"
        );
    }
}
