use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::CatalogRepository,
    error::{AppError, AppResult, FieldError},
    models::{
        parse_rating, CatalogEntry, CatalogFilter, CatalogPage, CatalogUpdate, Category,
        NewCatalogEntry,
    },
    services::analytics::CatalogStats,
};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

const MAX_TITLE_LEN: usize = 300;
const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 50;

/// Field problems with an entry, empty when it is valid
pub fn validate_entry(title: &str, rating: Option<&str>, tags: &[String]) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let title = title.trim();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(FieldError::new(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }

    if let Some(raw) = rating.map(str::trim).filter(|r| !r.is_empty()) {
        match parse_rating(raw) {
            Some(value) if (0.0..=10.0).contains(&value) => {}
            _ => errors.push(FieldError::new("rating", "Rating must be a number from 0 to 10")),
        }
    }

    if tags.len() > MAX_TAGS {
        errors.push(FieldError::new(
            "tags",
            format!("At most {} tags are allowed", MAX_TAGS),
        ));
    } else if tags.iter().any(|t| t.trim().chars().count() > MAX_TAG_LEN) {
        errors.push(FieldError::new(
            "tags",
            format!("Tags must be at most {} characters", MAX_TAG_LEN),
        ));
    }

    errors
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_rating(rating: Option<&str>) -> Option<String> {
    rating.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string)
}

/// Listing filter with defaults applied and the page size capped
pub fn page_filter(
    category: Option<Category>,
    search: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
) -> CatalogFilter {
    CatalogFilter {
        category,
        search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        page: page.filter(|p| *p > 0).unwrap_or(1),
        limit: limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE),
    }
}

pub async fn list(repo: &dyn CatalogRepository, user_id: Uuid, filter: &CatalogFilter) -> AppResult<CatalogPage> {
    repo.list(user_id, filter).await
}

async fn ensure_unique(
    repo: &dyn CatalogRepository,
    user_id: Uuid,
    title: &str,
    category: Category,
    except: Option<Uuid>,
) -> AppResult<()> {
    match repo.find_by_title(user_id, title, category).await? {
        Some(existing) if Some(existing.id) != except => Err(AppError::Conflict(format!(
            "'{}' is already in {}",
            existing.title, category
        ))),
        _ => Ok(()),
    }
}

pub async fn create(repo: &dyn CatalogRepository, user_id: Uuid, new: NewCatalogEntry) -> AppResult<CatalogEntry> {
    let errors = validate_entry(&new.title, new.rating.as_deref(), &new.tags);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let title = new.title.trim().to_string();
    ensure_unique(repo, user_id, &title, new.category, None).await?;

    let entry = CatalogEntry {
        id: Uuid::new_v4(),
        user_id,
        title,
        rating: clean_rating(new.rating.as_deref()),
        tags: clean_tags(&new.tags),
        category: new.category,
        poster: new.poster,
        synopsis: new.synopsis,
        providers: new.providers,
        credits: new.credits,
        created_at: Utc::now(),
    };
    repo.insert(&entry).await?;

    tracing::info!(user_id = %user_id, entry_id = %entry.id, category = %entry.category, "Catalog entry created");
    Ok(entry)
}

/// Field-level update; changing the category moves the entry
pub async fn update(
    repo: &dyn CatalogRepository,
    user_id: Uuid,
    id: Uuid,
    update: CatalogUpdate,
) -> AppResult<CatalogEntry> {
    let mut entry = repo
        .get(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
    let previous = (entry.title.clone(), entry.category);

    update.apply_to(&mut entry);
    entry.tags = clean_tags(&entry.tags);

    let errors = validate_entry(&entry.title, entry.rating.as_deref(), &entry.tags);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if !entry.matches_title(&previous.0) || entry.category != previous.1 {
        ensure_unique(repo, user_id, &entry.title, entry.category, Some(entry.id)).await?;
    }

    repo.update(&entry).await?;

    if entry.category != previous.1 {
        tracing::info!(
            user_id = %user_id,
            entry_id = %id,
            from = %previous.1,
            to = %entry.category,
            "Catalog entry moved"
        );
    }
    Ok(entry)
}

pub async fn delete(repo: &dyn CatalogRepository, user_id: Uuid, id: Uuid) -> AppResult<()> {
    if !repo.delete(user_id, id).await? {
        return Err(AppError::NotFound(format!("Movie {} not found", id)));
    }
    tracing::info!(user_id = %user_id, entry_id = %id, "Catalog entry deleted");
    Ok(())
}

pub async fn stats(repo: &dyn CatalogRepository, user_id: Uuid) -> AppResult<CatalogStats> {
    let entries = repo.all_for_user(user_id).await?;
    Ok(CatalogStats::from_entries(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_entry() {
        assert!(validate_entry("Heat", Some("8.5"), &["crime".to_string()]).is_empty());
        assert!(validate_entry("Heat", Some(""), &[]).is_empty());
        assert!(validate_entry("Heat", None, &[]).is_empty());
    }

    #[test]
    fn test_invalid_fields() {
        assert_eq!(fields(&validate_entry("  ", None, &[])), vec!["title"]);
        assert_eq!(fields(&validate_entry(&"x".repeat(301), None, &[])), vec!["title"]);
        assert_eq!(fields(&validate_entry("Heat", Some("11"), &[])), vec!["rating"]);
        assert_eq!(fields(&validate_entry("Heat", Some("great"), &[])), vec!["rating"]);
        assert_eq!(fields(&validate_entry("Heat", Some("-1"), &[])), vec!["rating"]);

        let many: Vec<String> = (0..21).map(|i| i.to_string()).collect();
        assert_eq!(fields(&validate_entry("Heat", None, &many)), vec!["tags"]);
        assert_eq!(fields(&validate_entry("Heat", None, &["t".repeat(51)])), vec!["tags"]);
    }

    #[test]
    fn test_page_filter_defaults_and_caps() {
        let filter = page_filter(None, Some("  ".to_string()), None, None);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.search, None);

        let filter = page_filter(Some(Category::Show), Some(" heat ".to_string()), Some(0), Some(500));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.search.as_deref(), Some("heat"));
    }

    #[test]
    fn test_clean_tags_drops_blanks() {
        let tags = clean_tags(&[" noir ".to_string(), "".to_string()]);
        assert_eq!(tags, vec!["noir"]);
    }
}
