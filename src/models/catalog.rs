use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display, str::FromStr};
use uuid::Uuid;

use super::CastMember;

/// Which collection a catalog entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Watched,
    WantToWatch,
    Show,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Watched => "watched",
            Category::WantToWatch => "want_to_watch",
            Category::Show => "show",
        }
    }

    /// Watched movies and shows count as "seen" for recommendations
    pub fn is_seen(&self) -> bool {
        matches!(self, Category::Watched | Category::Show)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "watched" => Ok(Category::Watched),
            "want_to_watch" | "watchlist" => Ok(Category::WantToWatch),
            "show" | "shows" => Ok(Category::Show),
            other => Err(format!("Unknown category '{}'", other)),
        }
    }
}

/// A movie or show in a user's catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Decimal string in 0-10, `None` when unrated
    pub rating: Option<String>,
    pub tags: Vec<String>,
    pub category: Category,
    pub poster: Option<String>,
    pub synopsis: Option<String>,
    /// Country code to streaming provider names
    pub providers: Option<HashMap<String, Vec<String>>>,
    pub credits: Option<Vec<CastMember>>,
    pub created_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Numeric rating, if the entry is rated with a parseable value
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_deref().and_then(parse_rating)
    }

    pub fn matches_title(&self, title: &str) -> bool {
        normalize_title(&self.title) == normalize_title(title)
    }
}

/// Parses a rating string, ignoring blanks and non-finite values
pub fn parse_rating(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Key used for title comparisons: trimmed and lowercased
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Fields accepted when creating an entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogEntry {
    pub title: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Category,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub providers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub credits: Option<Vec<CastMember>>,
}

/// Field-level update. Absent fields are left untouched; an empty rating clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub providers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub credits: Option<Vec<CastMember>>,
}

impl CatalogUpdate {
    /// Applies the update to an entry in place
    pub fn apply_to(&self, entry: &mut CatalogEntry) {
        if let Some(title) = &self.title {
            entry.title = title.trim().to_string();
        }
        if let Some(rating) = &self.rating {
            let rating = rating.trim();
            entry.rating = (!rating.is_empty()).then(|| rating.to_string());
        }
        if let Some(tags) = &self.tags {
            entry.tags = tags.clone();
        }
        if let Some(category) = self.category {
            entry.category = category;
        }
        if let Some(poster) = &self.poster {
            entry.poster = Some(poster.clone());
        }
        if let Some(synopsis) = &self.synopsis {
            entry.synopsis = Some(synopsis.clone());
        }
        if let Some(providers) = &self.providers {
            entry.providers = Some(providers.clone());
        }
        if let Some(credits) = &self.credits {
            entry.credits = Some(credits.clone());
        }
    }
}

/// Listing parameters for a user's catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl CatalogFilter {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

/// One page of catalog entries
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub movies: Vec<CatalogEntry>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, rating: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            rating: rating.map(str::to_string),
            tags: vec![],
            category: Category::Watched,
            poster: None,
            synopsis: None,
            providers: None,
            credits: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_parses_aliases() {
        assert_eq!("watched".parse::<Category>(), Ok(Category::Watched));
        assert_eq!("want-to-watch".parse::<Category>(), Ok(Category::WantToWatch));
        assert_eq!("Watchlist".parse::<Category>(), Ok(Category::WantToWatch));
        assert_eq!("shows".parse::<Category>(), Ok(Category::Show));
        assert!("favorites".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_snake_case() {
        let json = serde_json::to_string(&Category::WantToWatch).unwrap();
        assert_eq!(json, r#""want_to_watch""#);
    }

    #[test]
    fn test_rating_value() {
        assert_eq!(entry("A", Some("8.5")).rating_value(), Some(8.5));
        assert_eq!(entry("A", Some(" 10 ")).rating_value(), Some(10.0));
        assert_eq!(entry("A", Some("")).rating_value(), None);
        assert_eq!(entry("A", Some("great")).rating_value(), None);
        assert_eq!(entry("A", None).rating_value(), None);
    }

    #[test]
    fn test_matches_title_ignores_case_and_whitespace() {
        assert!(entry("The Matrix", None).matches_title("  the matrix "));
        assert!(!entry("The Matrix", None).matches_title("Matrix"));
    }

    #[test]
    fn test_update_clears_rating_with_empty_string() {
        let mut e = entry("A", Some("7"));
        let update = CatalogUpdate {
            rating: Some("  ".to_string()),
            category: Some(Category::Show),
            ..Default::default()
        };
        update.apply_to(&mut e);
        assert_eq!(e.rating, None);
        assert_eq!(e.category, Category::Show);
        assert_eq!(e.title, "A");
    }

    #[test]
    fn test_filter_offset() {
        let filter = CatalogFilter {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 40);
        let first = CatalogFilter {
            page: 0,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(first.offset(), 0);
    }
}
