use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};

use crate::analysis::AnalysisRequestBuilder;
use crate::backend::{AnalysisBackend, AnalysisResult};
use crate::cache::AnalysisCache;
use crate::error::PipelineError;
use crate::message_processor::DecodedEmail;

/// Owns everything an analysis needs: the request builder, the backend and the cache.
pub struct Analyzer {
    builder: AnalysisRequestBuilder,
    backend: Arc<dyn AnalysisBackend>,
    cache: AnalysisCache,
}

impl Analyzer {
    pub fn new(
        builder: AnalysisRequestBuilder,
        backend: Arc<dyn AnalysisBackend>,
        cache: AnalysisCache,
    ) -> Self {
        Self {
            builder,
            backend,
            cache,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analysis for `id`, served from cache when possible. Concurrent calls
    /// for the same id wait on one backend request.
    pub async fn analyze(&self, id: &str) -> Result<Arc<AnalysisResult>, PipelineError> {
        let span = info_span!("analyze", id = %id);

        async {
            if let Some(hit) = self.cache.get(id).await {
                debug!("Using cached analysis");
                return Ok(hit);
            }

            self.cache
                .get_or_try_insert_with(id, self.run(id))
                .await
                .map_err(PipelineError::from_shared)
        }
        .instrument(span)
        .await
    }

    async fn run(&self, id: &str) -> Result<Arc<AnalysisResult>, PipelineError> {
        let request = self.builder.build(id).await?;
        let result = self.backend.analyze(&request).await?;
        info!("Analysis received");
        Ok(Arc::new(result))
    }

    /// Decoded recent messages for display. A failed listing is an error here.
    pub async fn recent_emails(&self) -> Result<Vec<DecodedEmail>, PipelineError> {
        self.builder.list_recent_emails().await
    }
}
