use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::AnalysisResult;
use crate::config::CacheConfig;

/// Analysis results keyed by message id.
///
/// Bounded in size and age. Concurrent misses for the same id share a single
/// initialisation, and failed initialisations are not stored.
#[derive(Clone)]
pub struct AnalysisCache {
    inner: Cache<String, Arc<AnalysisResult>>,
}

impl AnalysisCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self::new(cfg.max_entries, cfg.ttl())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<AnalysisResult>> {
        self.inner.get(id).await
    }

    #[cfg(test)]
    pub async fn put(&self, id: impl Into<String>, result: Arc<AnalysisResult>) {
        self.inner.insert(id.into(), result).await;
    }

    #[cfg(test)]
    pub async fn invalidate(&self, id: &str) {
        self.inner.invalidate(id).await;
    }

    /// Return the cached result for `id`, or run `init` once for all current callers.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        id: &str,
        init: F,
    ) -> Result<Arc<AnalysisResult>, Arc<E>>
    where
        F: Future<Output = Result<Arc<AnalysisResult>, E>>,
        E: Send + Sync + 'static,
    {
        self.inner.try_get_with_by_ref(id, init).await
    }

    /// Approximate; pending evictions may not be reflected yet.
    #[cfg(test)]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    #[cfg(test)]
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}
