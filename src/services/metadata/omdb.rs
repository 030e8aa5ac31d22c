/// OMDb provider (secondary)
///
/// Lookups by IMDb id (`?i=`) or exact title (`?t=`), searches with `?s=`.
/// OMDb reports "no such title" as a 200 with `"Response": "False"`.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use super::{check_status, MetadataError, MetadataProvider, DETAILS_CACHE_TTL, SEARCH_CACHE_TTL};
use crate::{
    cached,
    db::{Cache, CacheKey},
    models::{
        metadata::{omdb_value, parse_year, OmdbSearchItem, OmdbSearchResponse, OmdbTitle},
        CastMember, DetailsQuery, MediaType, MetadataSource, MovieDetails, SearchResult,
    },
};

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl OmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Cache, timeout: Duration) -> Result<Self, MetadataError> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_key,
            api_url,
            cache,
        })
    }

    async fn get<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, MetadataError> {
        let url = format!("{}/", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        check_status("omdb", response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| MetadataError::Parse {
                provider: "omdb",
                message: e.to_string(),
            })
    }

    async fn search_uncached(&self, query: &str) -> Result<Vec<SearchResult>, MetadataError> {
        let response: OmdbSearchResponse = self.get(&[("s", query)]).await?;
        if response.response != "True" {
            tracing::debug!(query = %query, error = ?response.error, "OMDb search returned no results");
            return Ok(Vec::new());
        }
        Ok(response.search.into_iter().map(search_result).collect())
    }

    async fn lookup(&self, params: Vec<(&'static str, String)>) -> Result<MovieDetails, MetadataError> {
        let key: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v.to_lowercase())).collect();

        cached!(
            self.cache,
            CacheKey::Details(format!("omdb:{}", key.join("&"))),
            DETAILS_CACHE_TTL,
            async move { self.lookup_uncached(params).await }
        )
    }

    async fn lookup_uncached(&self, params: Vec<(&'static str, String)>) -> Result<MovieDetails, MetadataError> {
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let title: OmdbTitle = self.get(&params).await?;
        if title.response != "True" {
            return Err(MetadataError::NotFound);
        }
        Ok(details_from(title))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbProvider {
    fn name(&self) -> &'static str {
        "omdb"
    }

    fn source(&self) -> MetadataSource {
        MetadataSource::Secondary
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MetadataError> {
        cached!(
            self.cache,
            CacheKey::TitleSearch(format!("omdb:{}", query)),
            SEARCH_CACHE_TTL,
            async move { self.search_uncached(query).await }
        )
    }

    async fn fetch_details(&self, query: &DetailsQuery) -> Result<Option<MovieDetails>, MetadataError> {
        let imdb_id = query.imdb_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let title = query.title.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut params: Vec<(&'static str, String)> = match (imdb_id, title) {
            (Some(imdb_id), _) => vec![("i", imdb_id.to_string())],
            (None, Some(title)) => {
                let mut params = vec![("t", title.to_string())];
                if let Some(year) = query.year {
                    params.push(("y", year.to_string()));
                }
                params
            }
            // A bare TMDB id means nothing to OMDb
            (None, None) => return Ok(None),
        };
        if let Some(media_type) = query.media_type {
            params.push(("type", omdb_type(media_type).to_string()));
        }
        params.push(("plot", "short".to_string()));

        match self.lookup(params).await {
            Ok(details) => Ok(Some(details)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn omdb_type(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Tv => "series",
    }
}

fn search_result(item: OmdbSearchItem) -> SearchResult {
    let media_type = match item.item_type.as_deref() {
        Some("series") => Some(MediaType::Tv),
        Some("movie") => Some(MediaType::Movie),
        _ => None,
    };
    SearchResult {
        id: item.imdb_id,
        title: item.title,
        year: parse_year(item.year.as_deref()),
        media_type,
        poster: omdb_value(&item.poster),
        overview: None,
    }
}

/// Splits OMDb's comma-joined lists ("Crime, Drama")
fn split_list(raw: &Option<String>) -> Vec<String> {
    omdb_value(raw)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn details_from(title: OmdbTitle) -> MovieDetails {
    MovieDetails {
        title: omdb_value(&title.title).unwrap_or_default(),
        year: parse_year(title.year.as_deref()),
        synopsis: omdb_value(&title.plot),
        poster: omdb_value(&title.poster),
        genres: split_list(&title.genre),
        // "148 min"
        runtime_minutes: omdb_value(&title.runtime)
            .and_then(|r| r.split_whitespace().next().and_then(|n| n.parse().ok())),
        rating: omdb_value(&title.imdb_rating).and_then(|r| r.parse().ok()),
        director: omdb_value(&title.director),
        imdb_id: omdb_value(&title.imdb_id),
        tmdb_id: None,
        cast: split_list(&title.actors)
            .into_iter()
            .map(|name| CastMember {
                name,
                character: None,
                profile_path: None,
            })
            .collect(),
        providers: Default::default(),
    }
}
