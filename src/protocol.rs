//! Request/response messages exchanged with the UI surfaces, one JSON object each.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::backend::AnalysisResult;
use crate::message_processor::DecodedEmail;
use crate::pipeline::Analyzer;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Ping,
    GetEmails,
    AnalyzeEmail {
        #[serde(rename = "emailId")]
        email_id: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Pong {
        connected: bool,
    },
    GetEmails {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        messages: Option<Vec<DecodedEmail>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    AnalyzeEmail {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<Arc<AnalysisResult>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        error: String,
    },
}

pub async fn dispatch(analyzer: &Analyzer, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong { connected: true },
        Request::GetEmails => match analyzer.recent_emails().await {
            Ok(messages) => Response::GetEmails {
                success: true,
                messages: Some(messages),
                error: None,
            },
            Err(e) => {
                error!(error = %e, "Listing recent emails failed");
                Response::GetEmails {
                    success: false,
                    messages: None,
                    error: Some(e.to_string()),
                }
            }
        },
        Request::AnalyzeEmail { email_id } => match analyzer.analyze(&email_id).await {
            Ok(analysis) => Response::AnalyzeEmail {
                success: true,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => {
                error!(id = %email_id, error = %e, "Analysis failed");
                Response::AnalyzeEmail {
                    success: false,
                    analysis: None,
                    error: Some(e.to_string()),
                }
            }
        },
    }
}

/// Handle one raw request line. Undecodable input becomes an error response.
pub async fn handle_line(analyzer: &Analyzer, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            info!(request = ?request, "Received request");
            dispatch(analyzer, request).await
        }
        Err(e) => Response::Error {
            error: format!("invalid request: {e}"),
        },
    }
}
