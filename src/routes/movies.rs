use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{CatalogEntry, CatalogPage, CatalogUpdate, Category, DetailsQuery, NewCatalogEntry},
    routes::AppState,
    services::{analytics::CatalogStats, catalog, metadata::DetailsOutcome},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Handler for listing the signed-in user's catalog
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<CatalogPage>> {
    let category = params
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let filter = catalog::page_filter(category, params.search, params.page, params.limit);
    let page = catalog::list(state.catalog.as_ref(), user.id, &filter).await?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewCatalogEntry>,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    let entry = catalog::create(state.catalog.as_ref(), user.id, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CatalogUpdate>,
) -> AppResult<Json<CatalogEntry>> {
    let entry = catalog::update(state.catalog.as_ref(), user.id, id, request).await?;
    Ok(Json(entry))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    catalog::delete(state.catalog.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<CatalogStats>> {
    let stats = catalog::stats(state.catalog.as_ref(), user.id).await?;
    Ok(Json(stats))
}

/// Metadata for one title, used to enrich an entry before saving it
pub async fn fetch_details(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<DetailsQuery>,
) -> AppResult<Json<DetailsOutcome>> {
    let outcome = state.metadata.fetch_details(&query).await?;
    Ok(Json(outcome))
}
