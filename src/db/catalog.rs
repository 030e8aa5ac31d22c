use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{normalize_title, CastMember, CatalogEntry, CatalogFilter, CatalogPage, Category},
};

/// Storage for catalog entries. Every operation is scoped to one user.
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    /// One filtered page, newest first
    async fn list(&self, user_id: Uuid, filter: &CatalogFilter) -> AppResult<CatalogPage>;

    /// Every entry the user owns, newest first
    async fn all_for_user(&self, user_id: Uuid) -> AppResult<Vec<CatalogEntry>>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<CatalogEntry>>;

    /// Case-insensitive, trimmed title lookup within a category
    async fn find_by_title(
        &self,
        user_id: Uuid,
        title: &str,
        category: Category,
    ) -> AppResult<Option<CatalogEntry>>;

    async fn insert(&self, entry: &CatalogEntry) -> AppResult<()>;

    async fn update(&self, entry: &CatalogEntry) -> AppResult<()>;

    /// Returns false when no entry matched
    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, FromRow)]
struct MovieRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    rating: Option<String>,
    tags: Vec<String>,
    category: String,
    poster: Option<String>,
    synopsis: Option<String>,
    providers: Option<Json<HashMap<String, Vec<String>>>>,
    credits: Option<Json<Vec<CastMember>>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovieRow> for CatalogEntry {
    type Error = AppError;

    fn try_from(row: MovieRow) -> Result<Self, Self::Error> {
        let category = row.category.parse::<Category>().map_err(|e| {
            AppError::Internal(format!("Corrupt category on movie {}: {}", row.id, e))
        })?;

        Ok(CatalogEntry {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            rating: row.rating,
            tags: row.tags,
            category,
            poster: row.poster,
            synopsis: row.synopsis,
            providers: row.providers.map(|p| p.0),
            credits: row.credits.map(|c| c.0),
            created_at: row.created_at,
        })
    }
}

fn into_entries(rows: Vec<MovieRow>) -> AppResult<Vec<CatalogEntry>> {
    rows.into_iter().map(CatalogEntry::try_from).collect()
}

const MOVIE_COLUMNS: &str = "id, user_id, title, rating, tags, category, poster, synopsis, providers, credits, created_at";

/// Postgres-backed catalog
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list(&self, user_id: Uuid, filter: &CatalogFilter) -> AppResult<CatalogPage> {
        let category = filter.category.map(|c| c.as_str());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM movies
            WHERE user_id = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<MovieRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MOVIE_COLUMNS} FROM movies
            WHERE user_id = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(user_id)
        .bind(category)
        .bind(search)
        .bind(filter.limit as i64)
        .bind(filter.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(CatalogPage {
            movies: into_entries(rows)?,
            total: total.max(0) as usize,
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn all_for_user(&self, user_id: Uuid) -> AppResult<Vec<CatalogEntry>> {
        let rows: Vec<MovieRow> = sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_entries(rows)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<CatalogEntry>> {
        let row: Option<MovieRow> = sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    async fn find_by_title(
        &self,
        user_id: Uuid,
        title: &str,
        category: Category,
    ) -> AppResult<Option<CatalogEntry>> {
        let row: Option<MovieRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MOVIE_COLUMNS} FROM movies
            WHERE user_id = $1 AND category = $2 AND lower(trim(title)) = $3
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(category.as_str())
        .bind(normalize_title(title))
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    async fn insert(&self, entry: &CatalogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO movies (id, user_id, title, rating, tags, category, poster, synopsis, providers, credits, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.title)
        .bind(&entry.rating)
        .bind(&entry.tags)
        .bind(entry.category.as_str())
        .bind(&entry.poster)
        .bind(&entry.synopsis)
        .bind(entry.providers.as_ref().map(Json))
        .bind(entry.credits.as_ref().map(Json))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(movie_id = %entry.id, user_id = %entry.user_id, "Catalog entry inserted");
        Ok(())
    }

    async fn update(&self, entry: &CatalogEntry) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = $3, rating = $4, tags = $5, category = $6, poster = $7,
                synopsis = $8, providers = $9, credits = $10
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.id)
        .bind(&entry.title)
        .bind(&entry.rating)
        .bind(&entry.tags)
        .bind(entry.category.as_str())
        .bind(&entry.poster)
        .bind(&entry.synopsis)
        .bind(entry.providers.as_ref().map(Json))
        .bind(entry.credits.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Movie {} not found", entry.id)));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
