use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::{resolve_user_id, CurrentUser},
    models::{Recommendation, RecommendationKind},
    routes::AppState,
    services::{ai, recommendations},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default, rename = "type")]
    pub kind: RecommendationKind,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    session: Option<CurrentUser>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let user_id = resolve_user_id(request.user_id, session)?;

    let provider = ai::build_provider(&state.ai)
        .map_err(|e| AppError::from_ai(e, "Failed to generate recommendations"))?;
    let entries = state.catalog.all_for_user(user_id).await?;

    tracing::info!(user_id = %user_id, provider = provider.name(), kind = ?request.kind, entries = entries.len(), "Recommendation request");

    let recommendations = recommendations::recommend(provider.as_ref(), &entries, request.kind).await?;
    Ok(Json(RecommendationResponse { recommendations }))
}
