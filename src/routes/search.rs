use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{error::AppResult, routes::AppState, services::metadata::SearchOutcome};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    query: String,
}

/// Handler for title search endpoint
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchOutcome>> {
    let outcome = state.metadata.search(&params.query).await?;
    Ok(Json(outcome))
}
