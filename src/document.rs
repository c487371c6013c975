// Resolving where the document bytes for an analysis come from

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::types::{AppError, AppResult};

/// Priority: uploaded file, then an explicit local path, then the configured default.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Upload { filename: Option<String>, data: Bytes },
    LocalPath(PathBuf),
    Default,
}

impl DocumentSource {
    pub fn resolve(upload: Option<(Option<String>, Bytes)>, local_path: Option<PathBuf>) -> Self {
        match (upload, local_path) {
            (Some((filename, data)), _) => DocumentSource::Upload { filename, data },
            (None, Some(path)) => DocumentSource::LocalPath(path),
            (None, None) => DocumentSource::Default,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Upload { filename, .. } => {
                format!("upload:{}", filename.as_deref().unwrap_or("<unnamed>"))
            }
            DocumentSource::LocalPath(path) => format!("path:{}", path.display()),
            DocumentSource::Default => "default".to_string(),
        }
    }

    pub async fn load(self, config: &AnalysisConfig) -> AppResult<Bytes> {
        match self {
            DocumentSource::Upload { data, .. } => Ok(data),
            DocumentSource::LocalPath(path) => {
                if !config.allow_local_file_path {
                    return Err(AppError::InvalidRequest(
                        "local_file_path is disabled on this server".to_string(),
                    ));
                }
                if !is_file(&path).await {
                    return Err(AppError::InvalidRequest(format!(
                        "Local file not found: {}",
                        path.display()
                    )));
                }
                read(&path).await
            }
            DocumentSource::Default => {
                let path = &config.default_local_file;
                if !is_file(path).await {
                    return Err(AppError::Internal(format!(
                        "Default local file not found: {}",
                        path.display()
                    )));
                }
                read(path).await
            }
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn read(path: &Path) -> AppResult<Bytes> {
    let data = fs::read(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), bytes = data.len(), "Loaded local document");
    Ok(Bytes::from(data))
}
