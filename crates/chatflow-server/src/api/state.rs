use anyhow::Result;
use std::sync::Arc;

use chatflow_core::{BroadcastHub, StreamOrchestrator};
use chatflow_llm::{LlmClient, ModelCatalog, OpenRouterClient};
use chatflow_storage::Storage;

/// Shared application state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub catalog: Arc<ModelCatalog>,
    pub orchestrator: Arc<StreamOrchestrator>,
}

impl AppState {
    pub fn new(db_path: &str, api_key: String) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::new(api_key));
        Self::from_parts(Arc::new(Storage::new(db_path)?), llm)
    }

    /// Wire the state from explicit collaborators; tests inject a mock client
    /// here.
    pub fn from_parts(storage: Arc<Storage>, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let catalog = Arc::new(ModelCatalog::new(llm.clone()));
        let hub = Arc::new(BroadcastHub::new());
        let orchestrator = Arc::new(StreamOrchestrator::new(
            storage.clone(),
            llm,
            catalog.clone(),
            hub,
        ));

        Ok(Self {
            storage,
            catalog,
            orchestrator,
        })
    }
}
