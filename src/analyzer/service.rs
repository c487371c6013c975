// Authenticated access to the Content Understanding REST surface

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;

use super::job::JobHandle;
use crate::config::AzureConfig;
use crate::credential::BearerTokenProvider;
use crate::types::{AppError, AppResult};

const USER_AGENT_HEADER: HeaderName = HeaderName::from_static("x-ms-useragent");

/// Shared by the submitting client and the poller.
#[derive(Clone)]
pub struct ServiceEndpoint {
    client: Client,
    endpoint: String,
    api_version: String,
    user_agent: String,
    tokens: BearerTokenProvider,
}

impl ServiceEndpoint {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        user_agent: impl Into<String>,
        tokens: BearerTokenProvider,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            user_agent: user_agent.into(),
            tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn analyze_url(&self, analyzer: &str) -> String {
        format!(
            "{}/contentunderstanding/analyzers/{}:analyze",
            self.endpoint, analyzer
        )
    }

    pub fn result_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/contentunderstanding/analyzerResults/{}",
            self.endpoint, handle
        )
    }

    /// Fresh token on every call.
    async fn headers(&self) -> AppResult<HeaderMap> {
        let bearer = self.tokens.bearer().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| AppError::Credential(format!("Token is not a valid header value: {}", e)))?,
        );
        headers.insert(
            USER_AGENT_HEADER,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| AppError::Internal(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> AppResult<Response> {
        let response = self
            .client
            .post(url)
            .query(&[("api-version", self.api_version.as_str())])
            .headers(self.headers().await?)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn get(&self, url: &str) -> AppResult<Response> {
        let response = self
            .client
            .get(url)
            .query(&[("api-version", self.api_version.as_str())])
            .headers(self.headers().await?)
            .send()
            .await?;
        Ok(response)
    }
}

/// Outbound client with the per-call timeout applied.
pub fn build_http_client(config: &AzureConfig) -> AppResult<Client> {
    Ok(Client::builder().timeout(config.request_timeout).build()?)
}

/// Turn a rejected response into an error carrying its status and body verbatim.
pub async fn upstream_error(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AppError::Upstream { status, body }
}
