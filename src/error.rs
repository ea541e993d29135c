use std::sync::Arc;

use thiserror::Error;

/// Body data that is not valid base64.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 body data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A raw message resource missing structure the normalizer cannot do without.
#[derive(Error, Debug)]
pub enum MalformedMessageError {
    #[error("message resource has no id")]
    MissingId,

    #[error("message {id} has no payload")]
    MissingPayload { id: String },

    #[error("message {id} payload has no headers, body or parts")]
    EmptyPayload { id: String },
}

#[derive(Error, Debug)]
#[error("unparseable Date header: {0:?}")]
pub struct DateParseError(pub String);

/// Failure fetching from the Gmail API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("gmail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gmail api error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode gmail response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no gmail access token configured (set GMAIL_ACCESS_TOKEN)")]
    MissingToken,
}

/// Failure reported by or while talking to the analysis backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode backend response: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Malformed(#[from] MalformedMessageError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Failure of an analysis another caller was already running for the same id.
    #[error(transparent)]
    Coalesced(Arc<PipelineError>),
}

impl PipelineError {
    /// Reclaims an error handed back by the cache, sharing it only when other waiters hold it too.
    pub fn from_shared(shared: Arc<PipelineError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(PipelineError::Coalesced)
    }

    /// The underlying error, looking through coalesced wrappers.
    #[cfg(test)]
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Coalesced(inner) => inner.root(),
            other => other,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
