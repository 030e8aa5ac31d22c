use std::collections::HashSet;

use crate::models::{normalize_title, CatalogEntry, Category};
use crate::services::analytics::{tag_frequencies, CatalogStats, TagCount};

pub const PERFECT_CAP: usize = 20;
pub const HIGHLY_RATED_CAP: usize = 30;
pub const LIKED_CAP: usize = 20;
pub const DISLIKED_CAP: usize = 15;
pub const TOP_TAGS_CAP: usize = 10;
pub const SEEN_CAP: usize = 300;
pub const SEEN_HIGH_RATED_CAP: usize = 200;
pub const WATCHLIST_CAP: usize = 50;

const SEEN_HIGH_RATED_MIN: f64 = 7.0;

/// A rated catalog title as it appears in prompts
#[derive(Debug, Clone, PartialEq)]
pub struct RatedTitle {
    pub title: String,
    pub rating: f64,
}

impl RatedTitle {
    /// "Title (9.5/10)", with whole ratings printed without decimals
    pub fn label(&self) -> String {
        if self.rating.fract() == 0.0 {
            format!("{} ({}/10)", self.title, self.rating as i64)
        } else {
            format!("{} ({}/10)", self.title, self.rating)
        }
    }
}

/// Taste summary derived from a user's catalog, rebuilt on every request
#[derive(Debug, Clone)]
pub struct ProfileContext {
    /// Rated exactly 10
    pub perfect: Vec<RatedTitle>,
    /// Rated 9 or higher
    pub highly_rated: Vec<RatedTitle>,
    /// Rated from 8 up to (not including) 9
    pub liked: Vec<RatedTitle>,
    /// Rated below 6, lowest first
    pub disliked: Vec<RatedTitle>,
    /// Most frequent tags among entries rated 9 or higher
    pub top_tags: Vec<TagCount>,
    /// Prioritized, capped list of watched movies and shows for the prompt
    pub seen_titles: Vec<String>,
    /// Want-to-watch titles, catalog order
    pub watchlist: Vec<String>,
    pub stats: CatalogStats,
    /// Normalized titles of every watched movie and show, uncapped
    seen_keys: HashSet<String>,
}

impl ProfileContext {
    pub fn from_catalog(entries: &[CatalogEntry]) -> Self {
        let seen: Vec<&CatalogEntry> = entries.iter().filter(|e| e.category.is_seen()).collect();

        // Stable sort: equal ratings keep catalog order.
        let mut rated: Vec<(&CatalogEntry, f64)> = seen
            .iter()
            .filter_map(|e| e.rating_value().map(|r| (*e, r)))
            .collect();
        rated.sort_by(|a, b| b.1.total_cmp(&a.1));

        let excerpt = |predicate: &dyn Fn(f64) -> bool, cap: usize| -> Vec<RatedTitle> {
            rated
                .iter()
                .filter(|(_, r)| predicate(*r))
                .take(cap)
                .map(|(e, r)| RatedTitle {
                    title: e.title.trim().to_string(),
                    rating: *r,
                })
                .collect()
        };

        let perfect = excerpt(&|r| r == 10.0, PERFECT_CAP);
        let highly_rated = excerpt(&|r| r >= 9.0, HIGHLY_RATED_CAP);
        let liked = excerpt(&|r| (8.0..9.0).contains(&r), LIKED_CAP);

        // Lowest first; equal ratings keep catalog order.
        let mut disliked: Vec<RatedTitle> = seen
            .iter()
            .filter_map(|e| e.rating_value().filter(|r| *r < 6.0).map(|r| (*e, r)))
            .map(|(e, r)| RatedTitle {
                title: e.title.trim().to_string(),
                rating: r,
            })
            .collect();
        disliked.sort_by(|a, b| a.rating.total_cmp(&b.rating));
        disliked.truncate(DISLIKED_CAP);

        let mut top_tags = tag_frequencies(rated.iter().filter(|(_, r)| *r >= 9.0).map(|(e, _)| *e));
        top_tags.truncate(TOP_TAGS_CAP);

        let seen_titles = prioritized_seen_titles(&seen, &rated);
        let seen_keys = seen.iter().map(|e| normalize_title(&e.title)).collect();

        let watchlist = entries
            .iter()
            .filter(|e| e.category == Category::WantToWatch)
            .map(|e| e.title.trim().to_string())
            .take(WATCHLIST_CAP)
            .collect();

        Self {
            perfect,
            highly_rated,
            liked,
            disliked,
            top_tags,
            seen_titles,
            watchlist,
            stats: CatalogStats::from_entries(entries),
            seen_keys,
        }
    }

    /// True when the user already watched the title, compared trimmed and case-insensitively
    pub fn has_seen(&self, title: &str) -> bool {
        self.seen_keys.contains(&normalize_title(title))
    }
}

/// Watched entries rated 7+ first (best first, up to 200), then every show,
/// then remaining watched titles; deduplicated and capped at 300.
fn prioritized_seen_titles(seen: &[&CatalogEntry], rated: &[(&CatalogEntry, f64)]) -> Vec<String> {
    let mut keys: HashSet<String> = HashSet::new();
    let mut titles: Vec<String> = Vec::new();

    let mut push = |title: &str, titles: &mut Vec<String>| {
        if titles.len() < SEEN_CAP && keys.insert(normalize_title(title)) {
            titles.push(title.trim().to_string());
        }
    };

    rated
        .iter()
        .filter(|(e, r)| e.category == Category::Watched && *r >= SEEN_HIGH_RATED_MIN)
        .take(SEEN_HIGH_RATED_CAP)
        .for_each(|(e, _)| push(&e.title, &mut titles));

    seen.iter()
        .filter(|e| e.category == Category::Show)
        .for_each(|e| push(&e.title, &mut titles));

    seen.iter().for_each(|e| push(&e.title, &mut titles));

    titles
}

/// Bulleted list for prompts, "- (none)" when empty
pub fn bullet_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<String> = items
        .into_iter()
        .map(|s| format!("- {}", s.as_ref()))
        .collect();
    if lines.is_empty() {
        "- (none)".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn rated_list(titles: &[RatedTitle]) -> String {
    bullet_list(titles.iter().map(RatedTitle::label))
}

pub fn tag_list(tags: &[TagCount]) -> String {
    if tags.is_empty() {
        return "(none)".to_string();
    }
    tags.iter()
        .map(|t| format!("{} ({})", t.tag, t.count))
        .collect::<Vec<_>>()
        .join(", ")
}
