use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cast or crew credit attached to a title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// Which provider answered a metadata request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Primary,
    Secondary,
    None,
}

/// A title search hit, normalized across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Provider-specific id (TMDB numeric id or IMDb id)
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub media_type: Option<MediaType>,
    pub poster: Option<String>,
    pub overview: Option<String>,
}

/// Full metadata for a single title, normalized across providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    pub title: String,
    pub year: Option<i32>,
    pub synopsis: Option<String>,
    pub poster: Option<String>,
    pub genres: Vec<String>,
    pub runtime_minutes: Option<u32>,
    pub rating: Option<f64>,
    pub director: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
    pub cast: Vec<CastMember>,
    /// Country code to streaming provider names
    pub providers: HashMap<String, Vec<String>>,
}

/// What a caller knows about the title it wants details for
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl DetailsQuery {
    pub fn is_empty(&self) -> bool {
        self.tmdb_id.is_none()
            && self.imdb_id.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.title.as_deref().map_or(true, |s| s.trim().is_empty())
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Response from GET /search/multi
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchItem {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl TmdbSearchItem {
    /// Movies and TV only; people and collections are skipped
    pub fn media_type(&self) -> Option<MediaType> {
        match self.media_type.as_deref() {
            Some("movie") | None => Some(MediaType::Movie),
            Some("tv") => Some(MediaType::Tv),
            _ => None,
        }
    }

    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        parse_year(self.release_date.as_deref().or(self.first_air_date.as_deref()))
    }
}

/// Response from GET /movie/{id} or /tv/{id} with credits and providers appended
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub external_ids: Option<TmdbExternalIds>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default, rename = "watch/providers")]
    pub watch_providers: Option<TmdbWatchProviders>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCast>,
    #[serde(default)]
    pub crew: Vec<TmdbCrew>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCast {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrew {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

/// Providers for one country. Rent/buy options are not streaming and are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    #[serde(default)]
    pub flatrate: Vec<TmdbProvider>,
    #[serde(default)]
    pub free: Vec<TmdbProvider>,
    #[serde(default)]
    pub ads: Vec<TmdbProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProvider {
    pub provider_name: String,
}

// ============================================================================
// OMDb API Types
// ============================================================================

/// Response from `?i=` or `?t=` lookups. Missing values are reported as "N/A".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbTitle {
    pub response: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(default, rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(default, rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from `?s=` searches
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbSearchResponse {
    pub response: String,
    #[serde(default)]
    pub search: Vec<OmdbSearchItem>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbSearchItem {
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(default, rename = "Type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

/// Treats OMDb's "N/A" placeholder and blanks as missing
pub fn omdb_value(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "N/A")
        .map(str::to_string)
}

/// Extracts the leading four-digit year from dates like "2010-07-15" or "2008–2013"
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("2010-07-15")), Some(2010));
        assert_eq!(parse_year(Some("2008–2013")), Some(2008));
        assert_eq!(parse_year(Some("")), None);
        assert_eq!(parse_year(None), None);
    }

    #[test]
    fn test_omdb_value_filters_placeholders() {
        assert_eq!(omdb_value(&Some("N/A".to_string())), None);
        assert_eq!(omdb_value(&Some("  ".to_string())), None);
        assert_eq!(omdb_value(&Some("Drama".to_string())), Some("Drama".to_string()));
    }

    #[test]
    fn test_tmdb_details_deserialization() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-15",
            "genres": [{"id": 28, "name": "Action"}],
            "runtime": 148,
            "imdb_id": "tt1375666",
            "credits": {"cast": [{"name": "Leonardo DiCaprio", "character": "Cobb"}], "crew": []},
            "watch/providers": {"results": {"US": {"flatrate": [{"provider_name": "Netflix"}]}}}
        }"#;

        let details: TmdbDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.id, 27205);
        assert_eq!(details.runtime, Some(148));
        assert_eq!(details.genres[0].name, "Action");
        let providers = details.watch_providers.unwrap();
        assert_eq!(providers.results["US"].flatrate[0].provider_name, "Netflix");
    }

    #[test]
    fn test_search_item_skips_people() {
        let item: TmdbSearchItem =
            serde_json::from_str(r#"{"id": 1, "media_type": "person", "name": "Someone"}"#).unwrap();
        assert_eq!(item.media_type(), None);
    }

    #[test]
    fn test_details_query_is_empty() {
        assert!(DetailsQuery::default().is_empty());
        let query = DetailsQuery {
            title: Some("Heat".to_string()),
            ..Default::default()
        };
        assert!(!query.is_empty());
    }
}
