use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::job::{JobHandle, JobResult};
use super::poller::ResultPoller;
use super::service::{build_http_client, upstream_error, ServiceEndpoint};
use crate::config::Config;
use crate::credential::{credential_from_config, BearerTokenProvider};
use crate::models::AnalysisRequest;
use crate::types::{AppError, AppResult};

pub const LAYOUT_ANALYZER: &str = "prebuilt-layout";
pub const DOCUMENT_ANALYZER: &str = "prebuilt-document";

#[derive(Serialize)]
struct AnalyzePayload {
    inputs: Vec<AnalyzeInput>,
}

#[derive(Serialize)]
struct AnalyzeInput {
    data: String,
}

impl AnalyzePayload {
    fn single(data: &[u8]) -> Self {
        Self {
            inputs: vec![AnalyzeInput {
                data: BASE64.encode(data),
            }],
        }
    }
}

/// Outcome of a submission.
#[derive(Debug)]
pub enum Submission {
    /// The service finished synchronously; nothing to poll.
    Completed(JobResult),
    Accepted(JobHandle),
}

pub struct AnalyzerClient {
    service: ServiceEndpoint,
    poller: ResultPoller,
}

impl AnalyzerClient {
    pub fn new(service: ServiceEndpoint, poll_interval: Duration) -> Self {
        let poller = ResultPoller::new(service.clone(), poll_interval);
        Self { service, poller }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = build_http_client(&config.azure)?;
        let credential = credential_from_config(&config.azure, http.clone());
        let tokens = BearerTokenProvider::new(credential, config.azure.scope.clone());
        let service = ServiceEndpoint::new(
            http,
            config.azure.endpoint.clone(),
            config.azure.api_version.clone(),
            config.azure.user_agent.clone(),
            tokens,
        );
        Ok(Self::new(service, config.analysis.poll_interval))
    }

    pub fn service(&self) -> &ServiceEndpoint {
        &self.service
    }

    pub async fn submit(&self, analyzer: &str, data: &[u8]) -> AppResult<Submission> {
        let url = self.service.analyze_url(analyzer);
        debug!(analyzer, bytes = data.len(), "Submitting document to analyzer");

        let response = self
            .service
            .post_json(&url, &AnalyzePayload::single(data))
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(upstream_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse analyzer response: {}", e)))?;

        Ok(match JobHandle::from_submission(&body) {
            Some(handle) => {
                info!(analyzer, job_id = %handle, "Analyzer accepted job");
                Submission::Accepted(handle)
            }
            None => {
                info!(analyzer, "Analyzer completed synchronously");
                Submission::Completed(JobResult::new(body))
            }
        })
    }

    /// Submit and, when the service hands back a job, poll it to completion.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AppResult<JobResult> {
        match self.submit(&request.analyzer, &request.data).await? {
            Submission::Completed(result) => Ok(result),
            Submission::Accepted(handle) => self.poller.poll(&handle, request.timeout).await,
        }
    }
}
