/// TMDB provider (primary)
///
/// API Flow:
/// 1. Search: /search/multi → movie and TV hits with TMDB ids
/// 2. Resolve: numeric id as given, IMDb id via /find/{imdb_id}, or best title search hit
/// 3. Details: /{movie|tv}/{id} with credits, watch providers and external ids appended
use std::{collections::HashMap, time::Duration};

use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

use super::{check_status, MetadataError, MetadataProvider, DETAILS_CACHE_TTL, SEARCH_CACHE_TTL};
use crate::{
    cached,
    db::{Cache, CacheKey},
    models::{
        metadata::{TmdbDetails, TmdbRegionProviders, TmdbSearchItem, TmdbSearchResponse},
        CastMember, DetailsQuery, MediaType, MetadataSource, MovieDetails, SearchResult,
    },
};

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const MAX_CAST: usize = 10;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    /// Country whose streaming providers are reported; empty means every country
    watch_region: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(
        api_key: String,
        api_url: String,
        watch_region: String,
        cache: Cache,
        timeout: Duration,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_key,
            api_url,
            watch_region: watch_region.trim().to_uppercase(),
            cache,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.api_url.trim_end_matches('/'), path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        check_status("tmdb", response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| MetadataError::Parse {
                provider: "tmdb",
                message: e.to_string(),
            })
    }

    async fn search_uncached(&self, query: &str) -> Result<Vec<SearchResult>, MetadataError> {
        let response: TmdbSearchResponse = self
            .get("/search/multi", &[("query", query), ("include_adult", "false")])
            .await?;

        Ok(response.results.iter().filter_map(search_result).collect())
    }

    async fn details_by_id(&self, id: u64, media_type: MediaType) -> Result<MovieDetails, MetadataError> {
        cached!(
            self.cache,
            CacheKey::Details(format!("tmdb:{}:{}:{}", media_type.as_str(), id, self.watch_region)),
            DETAILS_CACHE_TTL,
            async move {
                self.get::<TmdbDetails>(
                    &format!("/{}/{}", media_type.as_str(), id),
                    &[("append_to_response", "credits,watch/providers,external_ids")],
                )
                .await
                .map(|raw| details_from(raw, &self.watch_region))
            }
        )
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<Option<(u64, MediaType)>, MetadataError> {
        #[derive(Deserialize)]
        struct FindResponse {
            #[serde(default)]
            movie_results: Vec<TmdbSearchItem>,
            #[serde(default)]
            tv_results: Vec<TmdbSearchItem>,
        }

        let response: FindResponse = self
            .get(&format!("/find/{}", imdb_id), &[("external_source", "imdb_id")])
            .await?;

        Ok(response
            .movie_results
            .first()
            .map(|m| (m.id, MediaType::Movie))
            .or_else(|| response.tv_results.first().map(|t| (t.id, MediaType::Tv))))
    }

    /// Best search hit for a title: matching media type and year when given, else the first hit
    async fn find_by_title(&self, title: &str, query: &DetailsQuery) -> Result<Option<(u64, MediaType)>, MetadataError> {
        let results = self.search(title).await?;

        let matches = |r: &&SearchResult| {
            query.media_type.map_or(true, |m| r.media_type == Some(m))
                && query.year.map_or(true, |y| r.year == Some(y))
        };

        Ok(results
            .iter()
            .find(matches)
            .or_else(|| results.first())
            .and_then(|r| Some((r.id.parse().ok()?, r.media_type.unwrap_or(MediaType::Movie)))))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn source(&self) -> MetadataSource {
        MetadataSource::Primary
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MetadataError> {
        cached!(
            self.cache,
            CacheKey::TitleSearch(format!("tmdb:{}", query)),
            SEARCH_CACHE_TTL,
            async move { self.search_uncached(query).await }
        )
    }

    async fn fetch_details(&self, query: &DetailsQuery) -> Result<Option<MovieDetails>, MetadataError> {
        let imdb_id = query.imdb_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let title = query.title.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut target = query
            .tmdb_id
            .map(|id| (id, query.media_type.unwrap_or(MediaType::Movie)));
        if target.is_none() {
            if let Some(imdb_id) = imdb_id {
                target = self.find_by_imdb_id(imdb_id).await?;
            }
        }
        if target.is_none() {
            if let Some(title) = title {
                target = self.find_by_title(title, query).await?;
            }
        }

        let Some((id, media_type)) = target else {
            return Ok(None);
        };

        match self.details_by_id(id, media_type).await {
            Ok(details) => Ok(Some(details)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn poster_url(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", POSTER_BASE_URL, p))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn search_result(item: &TmdbSearchItem) -> Option<SearchResult> {
    let media_type = item.media_type()?;
    Some(SearchResult {
        id: item.id.to_string(),
        title: item.display_title()?.to_string(),
        year: item.year(),
        media_type: Some(media_type),
        poster: poster_url(item.poster_path.as_deref()),
        overview: non_empty(item.overview.clone()),
    })
}

/// Streaming names for one country: subscription, then free, then ad-supported
fn region_names(region: &TmdbRegionProviders) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for provider in region.flatrate.iter().chain(&region.free).chain(&region.ads) {
        if !names.contains(&provider.provider_name) {
            names.push(provider.provider_name.clone());
        }
    }
    names
}

fn details_from(raw: TmdbDetails, watch_region: &str) -> MovieDetails {
    let media_type = if raw.title.is_some() { MediaType::Movie } else { MediaType::Tv };

    let credits = raw.credits.unwrap_or_default();
    let director = credits
        .crew
        .iter()
        .find(|c| c.job.as_deref() == Some("Director"))
        .map(|c| c.name.clone());
    let cast = credits
        .cast
        .into_iter()
        .take(MAX_CAST)
        .map(|c| CastMember {
            name: c.name,
            character: non_empty(c.character),
            profile_path: c.profile_path,
        })
        .collect();

    let providers: HashMap<String, Vec<String>> = raw
        .watch_providers
        .map(|wp| wp.results)
        .unwrap_or_default()
        .into_iter()
        .filter(|(country, _)| watch_region.is_empty() || country.eq_ignore_ascii_case(watch_region))
        .map(|(country, region)| (country, region_names(&region)))
        .filter(|(_, names)| !names.is_empty())
        .collect();

    tracing::debug!(tmdb_id = raw.id, media_type = media_type.as_str(), "Mapped TMDB details");

    MovieDetails {
        title: raw.title.or(raw.name).unwrap_or_default(),
        year: crate::models::metadata::parse_year(
            raw.release_date.as_deref().or(raw.first_air_date.as_deref()),
        ),
        synopsis: non_empty(raw.overview),
        poster: poster_url(raw.poster_path.as_deref()),
        genres: raw.genres.into_iter().map(|g| g.name).collect(),
        runtime_minutes: raw.runtime.filter(|r| *r > 0).or(raw.episode_run_time.first().copied()),
        rating: raw.vote_average.filter(|v| *v > 0.0).map(|v| (v * 10.0).round() / 10.0),
        director,
        imdb_id: non_empty(raw.imdb_id).or_else(|| raw.external_ids.and_then(|e| non_empty(e.imdb_id))),
        tmdb_id: Some(raw.id),
        cast,
        providers,
    }
}
