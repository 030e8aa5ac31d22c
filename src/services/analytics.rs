use std::collections::HashMap;

use serde::Serialize;

use crate::models::{CatalogEntry, Category};

const TOP_TAGS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Aggregate view of a user's catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub watched: usize,
    pub want_to_watch: usize,
    pub shows: usize,
    pub rated: usize,
    /// Mean rating of rated watched movies and shows, two decimals
    pub average_rating: Option<f64>,
    /// Count of rated entries per whole-number bucket 0..=10
    pub rating_histogram: Vec<usize>,
    pub top_tags: Vec<TagCount>,
}

impl CatalogStats {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let count = |category: Category| entries.iter().filter(|e| e.category == category).count();

        let ratings: Vec<f64> = entries
            .iter()
            .filter(|e| e.category.is_seen())
            .filter_map(CatalogEntry::rating_value)
            .collect();

        let average_rating = (!ratings.is_empty()).then(|| {
            let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
            (mean * 100.0).round() / 100.0
        });

        let mut rating_histogram = vec![0; 11];
        for rating in &ratings {
            let bucket = rating.clamp(0.0, 10.0).floor() as usize;
            rating_histogram[bucket] += 1;
        }

        let mut top_tags = tag_frequencies(entries.iter());
        top_tags.truncate(TOP_TAGS);

        Self {
            total: entries.len(),
            watched: count(Category::Watched),
            want_to_watch: count(Category::WantToWatch),
            shows: count(Category::Show),
            rated: ratings.len(),
            average_rating,
            rating_histogram,
            top_tags,
        }
    }
}

/// Tag counts, most frequent first
///
/// Tags compare case-insensitively and keep the spelling of their first
/// appearance; equal counts keep first-appearance order.
pub fn tag_frequencies<'a>(entries: impl Iterator<Item = &'a CatalogEntry>) -> Vec<TagCount> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<TagCount> = Vec::new();

    for tag in entries.flat_map(|e| e.tags.iter()) {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        match index.get(&tag.to_lowercase()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(tag.to_lowercase(), counts.len());
                counts.push(TagCount {
                    tag: tag.to_string(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-appearance order among ties.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
