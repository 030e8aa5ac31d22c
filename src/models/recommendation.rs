use serde::{Deserialize, Serialize};

/// A model-suggested title, returned to the client and never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub reason: String,
    /// Model confidence in 0-1
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

/// Which prompt template a recommendation request uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    #[default]
    General,
    Watchlist,
}
