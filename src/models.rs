use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::analyzer::AnalyzerClient;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<AnalyzerClient>,
}

impl AppState {
    pub fn new(config: Config, analyzer: AnalyzerClient) -> Self {
        Self {
            config: Arc::new(config),
            analyzer: Arc::new(analyzer),
        }
    }
}

/// One document bound for one analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub analyzer: String,
    pub data: Bytes,
    pub timeout: Duration,
}

impl AnalysisRequest {
    pub fn new(analyzer: impl Into<String>, data: Bytes, timeout: Duration) -> Self {
        Self {
            analyzer: analyzer.into(),
            data,
            timeout,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub endpoint: String,
    pub api_version: String,
}
