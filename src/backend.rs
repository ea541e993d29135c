use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::AnalysisRequest;
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Backend-owned analysis result (intent, priority, sentiment, suggestions...), passed through untouched.
pub type AnalysisResult = Value;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, BackendError>;
}

pub struct HttpBackend {
    client: Client,
    url: String,
}

impl HttpBackend {
    pub fn new(cfg: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            client,
            url: endpoint_url(&cfg.base_url, &cfg.analyze_path),
        })
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, BackendError> {
        info!(url = %self.url, id = %request.current_email.message_id, "Posting analysis request");

        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "Backend returned error");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
