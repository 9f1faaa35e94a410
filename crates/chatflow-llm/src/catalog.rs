//! Free-tier model catalog with a TTL cache.
//!
//! The catalog is an explicit object injected wherever model resolution is
//! needed; nothing reads it as ambient process state. The cached listing is
//! refilled on first use and whenever the TTL expires.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::client::LlmClient;
use crate::error::Result;
use crate::openrouter::DEFAULT_MODEL;

const CATALOG_TTL: Duration = Duration::from_secs(3600);

/// One model row as exposed to clients of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub context_length: u32,
    pub max_completion_tokens: u32,
}

#[derive(Debug, Clone)]
struct CachedListing {
    models: Arc<Vec<ModelEntry>>,
    fetched_at: Instant,
}

/// TTL-cached view of the provider's free-tier models.
pub struct ModelCatalog {
    client: Arc<dyn LlmClient>,
    ttl: Duration,
    cached: RwLock<Option<CachedListing>>,
}

impl ModelCatalog {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            ttl: CATALOG_TTL,
            cached: RwLock::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The free-tier listing, sorted by display name. Served from cache while
    /// fresh; refetched from the provider once the TTL expires.
    pub async fn free_models(&self) -> Result<Arc<Vec<ModelEntry>>> {
        if let Some(listing) = self.fresh_listing().await {
            return Ok(listing);
        }

        let mut slot = self.cached.write().await;
        // Another caller may have refilled while we waited for the lock.
        if let Some(entry) = slot.as_ref()
            && entry.fetched_at.elapsed() < self.ttl
        {
            return Ok(entry.models.clone());
        }

        let mut models: Vec<ModelEntry> = self
            .client
            .list_models()
            .await?
            .into_iter()
            .filter(|model| model.id.ends_with(":free"))
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));

        let models = Arc::new(models);
        *slot = Some(CachedListing {
            models: models.clone(),
            fetched_at: Instant::now(),
        });

        Ok(models)
    }

    /// Resolve an optional requested model id against the catalog, falling
    /// back to the default when the request is absent, unknown, or the
    /// catalog cannot be fetched at all.
    pub async fn resolve(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested else {
            return DEFAULT_MODEL.to_string();
        };

        match self.free_models().await {
            Ok(models) if models.iter().any(|model| model.id == requested) => {
                requested.to_string()
            }
            Ok(_) => DEFAULT_MODEL.to_string(),
            Err(error) => {
                warn!(error = %error, "model catalog fetch failed, using default model");
                DEFAULT_MODEL.to_string()
            }
        }
    }

    async fn fresh_listing(&self) -> Option<Arc<Vec<ModelEntry>>> {
        let slot = self.cached.read().await;
        slot.as_ref().and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.models.clone())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::MockLlmClient;

    fn entry(id: &str, name: &str) -> ModelEntry {
        ModelEntry {
            id: id.to_string(),
            name: name.to_string(),
            context_length: 4096,
            max_completion_tokens: 2048,
        }
    }

    fn catalog_with(models: Vec<ModelEntry>) -> (Arc<MockLlmClient>, ModelCatalog) {
        let client = Arc::new(MockLlmClient::new().with_models(models));
        let catalog = ModelCatalog::new(client.clone());
        (client, catalog)
    }

    #[tokio::test]
    async fn test_free_models_filters_and_sorts() {
        let (_client, catalog) = catalog_with(vec![
            entry("b/model:free", "Zeta"),
            entry("paid/model", "Alpha Paid"),
            entry("a/model:free", "Alpha"),
        ]);

        let models = catalog.free_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a/model:free", "b/model:free"]);
    }

    #[tokio::test]
    async fn test_resolve_known_model() {
        let (_client, catalog) = catalog_with(vec![entry("a/model:free", "Alpha")]);
        assert_eq!(catalog.resolve(Some("a/model:free")).await, "a/model:free");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_for_unknown_or_absent() {
        let (_client, catalog) = catalog_with(vec![entry("a/model:free", "Alpha")]);
        assert_eq!(catalog.resolve(Some("nope/model")).await, DEFAULT_MODEL);
        assert_eq!(catalog.resolve(None).await, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_listing_is_cached_within_ttl() {
        let (client, catalog) = catalog_with(vec![entry("a/model:free", "Alpha")]);

        catalog.free_models().await.unwrap();
        catalog.free_models().await.unwrap();
        assert_eq!(client.model_fetches(), 1);
    }

    #[tokio::test]
    async fn test_listing_refetched_after_ttl() {
        let client = Arc::new(MockLlmClient::new().with_models(vec![entry("a/model:free", "A")]));
        let catalog = ModelCatalog::new(client.clone()).with_ttl(Duration::ZERO);

        catalog.free_models().await.unwrap();
        catalog.free_models().await.unwrap();
        assert_eq!(client.model_fetches(), 2);
    }
}
