use axum::{Json, extract::State};

use super::{ApiError, AppState};
use chatflow_llm::ModelEntry;

// GET /api/models - the cached free-tier model listing
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelEntry>>, ApiError> {
    let models = state.catalog.free_models().await?;
    Ok(Json(models.as_ref().clone()))
}
