use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2025-11-01";
pub const DEFAULT_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
pub const DEFAULT_USER_AGENT: &str = concat!("cu-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub azure: AzureConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

/// Remote service location plus everything needed to authenticate against it.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_version: String,
    pub scope: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub managed_identity_client_id: Option<String>,
    pub identity_endpoint: Option<String>,
    pub identity_header: Option<String>,
    pub imds_endpoint: String,
    pub static_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub default_local_file: PathBuf,
    pub allow_local_file_path: bool,
    pub poll_interval: Duration,
    pub layout_timeout: Duration,
    pub document_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: parse_list(
                    &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|_| (50 * 1024 * 1024).to_string())
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
            },
            azure: AzureConfig {
                endpoint: env::var("CONTENT_UNDERSTANDING_ENDPOINT")
                    .context("CONTENT_UNDERSTANDING_ENDPOINT must be set")?
                    .trim_end_matches('/')
                    .to_string(),
                api_version: env::var("CONTENT_UNDERSTANDING_API_VERSION")
                    .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
                scope: env::var("CONTENT_UNDERSTANDING_SCOPE")
                    .unwrap_or_else(|_| DEFAULT_SCOPE.to_string()),
                user_agent: env::var("CU_USER_AGENT")
                    .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
                request_timeout: secs_from_env("HTTP_TIMEOUT_SECS", 30)?,
                managed_identity_client_id: non_empty_var("UAMI_CLIENT_ID"),
                identity_endpoint: non_empty_var("IDENTITY_ENDPOINT"),
                identity_header: non_empty_var("IDENTITY_HEADER"),
                imds_endpoint: env::var("IMDS_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_IMDS_ENDPOINT.to_string()),
                static_token: non_empty_var("AZURE_ACCESS_TOKEN"),
            },
            analysis: AnalysisConfig {
                default_local_file: env::var("DEFAULT_LOCAL_FILE")
                    .unwrap_or_else(|_| "sample.pdf".to_string())
                    .into(),
                allow_local_file_path: env::var("ALLOW_LOCAL_FILE_PATH")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .context("ALLOW_LOCAL_FILE_PATH must be true or false")?,
                poll_interval: secs_from_env("POLL_INTERVAL_SECS", 2)?,
                layout_timeout: secs_from_env("LAYOUT_TIMEOUT_SECS", 60)?,
                document_timeout: secs_from_env("DOCUMENT_TIMEOUT_SECS", 120)?,
            },
            logging: LoggingConfig {
                filter: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cu_relay=debug,tower_http=info".to_string()),
                log_dir: non_empty_var("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuration pointing at a mock service with a static token.
    pub(crate) fn for_tests(endpoint: &str, default_local_file: PathBuf) -> Self {
        Self {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
                max_upload_bytes: 10 * 1024 * 1024,
            },
            azure: AzureConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_version: DEFAULT_API_VERSION.to_string(),
                scope: DEFAULT_SCOPE.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                request_timeout: Duration::from_secs(5),
                managed_identity_client_id: None,
                identity_endpoint: None,
                identity_header: None,
                imds_endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
                static_token: Some("test-token".to_string()),
            },
            analysis: AnalysisConfig {
                default_local_file,
                allow_local_file_path: false,
                poll_interval: Duration::from_millis(10),
                layout_timeout: Duration::from_secs(5),
                document_timeout: Duration::from_secs(5),
            },
            logging: LoggingConfig {
                filter: "cu_relay=debug".to_string(),
                log_dir: None,
            },
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs_from_env(key: &str, default: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => parse_secs(&raw).with_context(|| format!("{} must be a number of seconds", key)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn parse_secs(raw: &str) -> Result<Duration> {
    let secs: f64 = raw.trim().parse()?;
    if !secs.is_finite() || secs < 0.0 {
        anyhow::bail!("invalid duration: {}", raw);
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
