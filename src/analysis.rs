use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::gmail_hub::MessageSource;
use crate::message_processor::{DecodedEmail, normalize};

pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Payload posted to the analysis backend.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub current_email: DecodedEmail,
    pub recent_emails: Vec<DecodedEmail>,
}

pub struct AnalysisRequestBuilder {
    source: Arc<dyn MessageSource>,
    recent_window: usize,
    listing_query: Option<String>,
}

impl AnalysisRequestBuilder {
    pub fn new(source: Arc<dyn MessageSource>, recent_window: usize) -> Self {
        Self {
            source,
            recent_window,
            listing_query: None,
        }
    }

    /// Gmail search applied when listing recent emails for display. Context
    /// for an analysis is always the unfiltered newest messages.
    pub fn with_listing_query(mut self, query: Option<String>) -> Self {
        self.listing_query = query.filter(|q| !q.trim().is_empty());
        self
    }

    /// Fetch and normalize one message; both failures are the caller's to handle.
    pub async fn fetch_decoded(&self, id: &str) -> Result<DecodedEmail, PipelineError> {
        let raw = self.source.get_message(id).await?;
        Ok(normalize(&raw)?)
    }

    /// Fetch `ids` concurrently, keeping their order and dropping any that fail.
    async fn fetch_all(&self, ids: &[String]) -> Vec<DecodedEmail> {
        let results = join_all(ids.iter().map(|id| self.fetch_decoded(id))).await;

        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(email) => Some(email),
                Err(e) => {
                    warn!(id = %id, error = %e, "Dropping recent message");
                    None
                }
            })
            .collect()
    }

    /// Recent emails for display. A failed listing is an error; a message
    /// that fails to fetch or decode is left out.
    pub async fn list_recent_emails(&self) -> Result<Vec<DecodedEmail>, PipelineError> {
        let ids = self
            .source
            .list_recent(self.recent_window, self.listing_query.as_deref())
            .await?;
        Ok(self.fetch_all(&ids).await)
    }

    /// Context window for analyzing `exclude`. Never fails: a failed listing
    /// yields no context at all.
    async fn context(&self, exclude: &str) -> Vec<DecodedEmail> {
        // one extra so excluding the target still leaves a full window
        let ids = match self.source.list_recent(self.recent_window + 1, None).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Listing recent messages failed, continuing without context");
                return Vec::new();
            }
        };

        let ids: Vec<String> = ids
            .into_iter()
            .filter(|id| id != exclude)
            .take(self.recent_window)
            .collect();

        self.fetch_all(&ids).await
    }

    pub async fn build(&self, id: &str) -> Result<AnalysisRequest, PipelineError> {
        let current_email = self.fetch_decoded(id).await?;
        let recent_emails = self.context(id).await;
        info!(id = %id, recent = recent_emails.len(), "Analysis request built");
        Ok(AnalysisRequest {
            current_email,
            recent_emails,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{StubSource, raw_message};
    use super::*;
    use crate::error::{FetchError, MalformedMessageError};
    use crate::message::RawMessage;

    fn builder(stub: StubSource) -> AnalysisRequestBuilder {
        AnalysisRequestBuilder::new(Arc::new(stub), DEFAULT_RECENT_WINDOW)
    }

    #[tokio::test]
    async fn builds_current_plus_recent_excluding_target() {
        let mut stub = StubSource::with_messages(10);
        stub.add(raw_message("target", "Dinner?", "Are you free at 7?"));

        let req = builder(stub).build("target").await.unwrap();
        assert_eq!(req.current_email.message_id, "target");
        assert_eq!(req.current_email.body, "Are you free at 7?");
        assert_eq!(req.recent_emails.len(), 10);
        assert!(req.recent_emails.iter().all(|e| e.message_id != "target"));
        assert_eq!(req.recent_emails[0].message_id, "m0");
    }

    #[tokio::test]
    async fn window_is_bounded() {
        let mut stub = StubSource::with_messages(25);
        stub.add(raw_message("target", "s", "b"));
        let req = builder(stub).build("target").await.unwrap();
        assert_eq!(req.recent_emails.len(), DEFAULT_RECENT_WINDOW);
    }

    #[tokio::test]
    async fn target_fetch_failure_fails_the_build() {
        let mut stub = StubSource::with_messages(10);
        stub.failing.insert("target".into());
        let err = builder(stub).build("target").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fetch(FetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_target_fails_the_build() {
        let mut stub = StubSource::with_messages(3);
        stub.add(RawMessage {
            id: "target".into(),
            ..Default::default()
        });
        let err = builder(stub).build("target").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Malformed(MalformedMessageError::MissingPayload { .. })
        ));
    }

    #[tokio::test]
    async fn one_failed_recent_fetch_is_dropped() {
        let mut stub = StubSource::with_messages(10);
        stub.add(raw_message("target", "s", "b"));
        stub.failing.insert("m4".into());

        let req = builder(stub).build("target").await.unwrap();
        assert_eq!(req.recent_emails.len(), 9);
        assert!(req.recent_emails.iter().all(|e| e.message_id != "m4"));
    }

    #[tokio::test]
    async fn malformed_recent_message_is_dropped() {
        let mut stub = StubSource::with_messages(2);
        stub.add(RawMessage {
            id: "broken".into(),
            ..Default::default()
        });
        stub.add(raw_message("target", "s", "b"));

        let req = builder(stub).build("target").await.unwrap();
        let ids: Vec<_> = req.recent_emails.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1"]);
    }

    #[tokio::test]
    async fn listing_failure_yields_empty_context() {
        let mut stub = StubSource::with_messages(5);
        stub.list_fails = true;
        let req = builder(stub).build("m0").await.unwrap();
        assert_eq!(req.current_email.message_id, "m0");
        assert!(req.recent_emails.is_empty());
    }

    #[tokio::test]
    async fn serializes_wire_shape() {
        let mut stub = StubSource::with_messages(1);
        stub.add(raw_message("target", "Hello", "Hi there"));
        let req = builder(stub).build("target").await.unwrap();

        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["current_email"]["subject"], "Hello");
        assert_eq!(wire["current_email"]["thread_id"], "target");
        assert_eq!(wire["current_email"]["recipients"][0], "bob@example.com");
        assert_eq!(wire["current_email"]["timestamp"], "2025-05-15T06:12:39Z");
        assert_eq!(wire["recent_emails"][0]["thread_id"], "m0");
    }

    #[tokio::test]
    async fn listing_failure_is_reported_when_listing_for_display() {
        let mut stub = StubSource::with_messages(5);
        stub.list_fails = true;
        let err = builder(stub).list_recent_emails().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fetch(FetchError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn display_listing_applies_query_but_context_does_not() {
        let mut stub = StubSource::with_messages(4);
        stub.add(raw_message("target", "s", "b"));
        let stub = Arc::new(stub);
        let builder = AnalysisRequestBuilder::new(stub.clone(), DEFAULT_RECENT_WINDOW)
            .with_listing_query(Some("newer_than:1d".into()));

        let listed = builder.list_recent_emails().await.unwrap();
        assert_eq!(listed.len(), 5);
        builder.build("target").await.unwrap();

        assert_eq!(
            stub.seen_queries(),
            vec![Some("newer_than:1d".to_string()), None]
        );
    }

    #[tokio::test]
    async fn blank_listing_query_is_ignored() {
        let stub = Arc::new(StubSource::with_messages(1));
        let builder = AnalysisRequestBuilder::new(stub.clone(), DEFAULT_RECENT_WINDOW)
            .with_listing_query(Some("  ".into()));
        builder.list_recent_emails().await.unwrap();
        assert_eq!(stub.seen_queries(), vec![None]);
    }
}
