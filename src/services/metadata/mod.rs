/// Movie metadata lookup
///
/// Providers are consulted in a fixed order (TMDB, then OMDb) and the first
/// non-empty answer wins. A provider failure is logged and the next one is
/// tried; only when every configured provider fails does the error surface.
use std::{sync::Arc, time::Duration};

use serde::Serialize;

use crate::{
    config::Config,
    db::Cache,
    error::{AppError, AppResult},
    models::{DetailsQuery, MetadataSource, MovieDetails, SearchResult},
};

pub mod omdb;
pub mod tmdb;

pub use omdb::OmdbProvider;
pub use tmdb::TmdbProvider;

pub const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
pub const DETAILS_CACHE_TTL: u64 = 604800; // 1 week

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("Metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    /// The provider answered but has no such title
    #[error("Title not found")]
    NotFound,
}

/// A source of title search results and title details
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Position of this provider in the lookup order
    fn source(&self) -> MetadataSource;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MetadataError>;

    /// `Ok(None)` when the title is unknown or the query carries nothing this provider can use
    async fn fetch_details(&self, query: &DetailsQuery) -> Result<Option<MovieDetails>, MetadataError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub source: MetadataSource,
    pub configured: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsOutcome {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MovieDetails>,
    pub source: MetadataSource,
    pub configured: bool,
}

impl DetailsOutcome {
    fn missing(configured: bool) -> Self {
        Self {
            found: false,
            data: None,
            source: MetadataSource::None,
            configured,
        }
    }
}

/// Ordered chain of metadata providers
#[derive(Clone)]
pub struct MetadataLookup {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl MetadataLookup {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from whichever provider keys are set
    pub fn from_config(config: &Config, cache: Cache) -> Result<Self, MetadataError> {
        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();

        if let Some(api_key) = Config::credential(&config.tmdb_api_key) {
            providers.push(Arc::new(TmdbProvider::new(
                api_key,
                config.tmdb_api_url.clone(),
                config.watch_region.clone(),
                cache.clone(),
                REQUEST_TIMEOUT,
            )?));
        }
        if let Some(api_key) = Config::credential(&config.omdb_api_key) {
            providers.push(Arc::new(OmdbProvider::new(
                api_key,
                config.omdb_api_url.clone(),
                cache,
                REQUEST_TIMEOUT,
            )?));
        }

        if providers.is_empty() {
            tracing::warn!("No metadata provider configured, set TMDB_API_KEY or OMDB_API_KEY");
        }

        Ok(Self::new(providers))
    }

    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    pub async fn search(&self, query: &str) -> AppResult<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Search query cannot be empty".to_string()));
        }

        let mut last_error = None;
        let mut answered = false;

        for provider in &self.providers {
            match provider.search(query).await {
                Ok(results) if !results.is_empty() => {
                    tracing::info!(
                        provider = provider.name(),
                        query = %query,
                        results_count = results.len(),
                        "Title search succeeded"
                    );
                    return Ok(SearchOutcome {
                        results,
                        source: provider.source(),
                        configured: true,
                    });
                }
                Ok(_) => answered = true,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), query = %query, error = %e, "Title search failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e.into()),
            _ => Ok(SearchOutcome {
                results: Vec::new(),
                source: MetadataSource::None,
                configured: self.is_configured(),
            }),
        }
    }

    pub async fn fetch_details(&self, query: &DetailsQuery) -> AppResult<DetailsOutcome> {
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Provide a title, tmdbId or imdbId".to_string(),
            ));
        }
        if !self.is_configured() {
            return Ok(DetailsOutcome::missing(false));
        }

        let mut last_error = None;
        let mut answered = false;

        for provider in &self.providers {
            match provider.fetch_details(query).await {
                Ok(Some(details)) => {
                    tracing::info!(provider = provider.name(), title = %details.title, "Fetched title details");
                    return Ok(DetailsOutcome {
                        found: true,
                        data: Some(details),
                        source: provider.source(),
                        configured: true,
                    });
                }
                Ok(None) => answered = true,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Title details lookup failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e.into()),
            _ => Ok(DetailsOutcome::missing(true)),
        }
    }
}

/// Turns a non-success response into `MetadataError::Status`
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, MetadataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(MetadataError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status = status.as_u16(), "Metadata provider returned an error");
    Err(MetadataError::Status {
        provider,
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        name: &'static str,
        source: MetadataSource,
        results: Result<Vec<&'static str>, u16>,
    }

    fn result(title: &str) -> SearchResult {
        SearchResult {
            id: title.to_lowercase(),
            title: title.to_string(),
            year: None,
            media_type: None,
            poster: None,
            overview: None,
        }
    }

    #[async_trait::async_trait]
    impl MetadataProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn source(&self) -> MetadataSource {
            self.source
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, MetadataError> {
            match &self.results {
                Ok(titles) => Ok(titles.iter().map(|t| result(t)).collect()),
                Err(status) => Err(MetadataError::Status {
                    provider: self.name,
                    status: *status,
                    body: String::new(),
                }),
            }
        }

        async fn fetch_details(&self, query: &DetailsQuery) -> Result<Option<MovieDetails>, MetadataError> {
            match &self.results {
                Ok(titles) if titles.is_empty() => Ok(None),
                Ok(_) => Ok(Some(MovieDetails {
                    title: query.title.clone().unwrap_or_default(),
                    ..Default::default()
                })),
                Err(status) => Err(MetadataError::Status {
                    provider: self.name,
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    fn lookup(primary: Result<Vec<&'static str>, u16>, secondary: Result<Vec<&'static str>, u16>) -> MetadataLookup {
        MetadataLookup::new(vec![
            Arc::new(FakeProvider {
                name: "primary",
                source: MetadataSource::Primary,
                results: primary,
            }),
            Arc::new(FakeProvider {
                name: "secondary",
                source: MetadataSource::Secondary,
                results: secondary,
            }),
        ])
    }

    fn heat() -> DetailsQuery {
        DetailsQuery {
            title: Some("Heat".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_primary_wins_when_it_has_results() {
        let outcome = lookup(Ok(vec!["Heat"]), Ok(vec!["Other"])).search("heat").await.unwrap();
        assert_eq!(outcome.source, MetadataSource::Primary);
        assert_eq!(outcome.results[0].title, "Heat");
    }

    #[tokio::test]
    async fn test_falls_through_empty_and_failed_primary() {
        let outcome = lookup(Ok(vec![]), Ok(vec!["Heat"])).search("heat").await.unwrap();
        assert_eq!(outcome.source, MetadataSource::Secondary);

        let outcome = lookup(Err(500), Ok(vec!["Heat"])).fetch_details(&heat()).await.unwrap();
        assert!(outcome.found);
        assert_eq!(outcome.source, MetadataSource::Secondary);
    }

    #[tokio::test]
    async fn test_nothing_found_is_configured() {
        let outcome = lookup(Ok(vec![]), Err(503)).fetch_details(&heat()).await.unwrap();
        assert!(!outcome.found);
        assert!(outcome.configured);
        assert_eq!(outcome.source, MetadataSource::None);
    }

    #[tokio::test]
    async fn test_all_providers_failing_surfaces_error() {
        let err = lookup(Err(500), Err(502)).search("heat").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_lookup() {
        let lookup = MetadataLookup::new(vec![]);
        let details = lookup.fetch_details(&heat()).await.unwrap();
        assert!(!details.configured);
        assert!(!details.found);

        let search = lookup.search("heat").await.unwrap();
        assert!(!search.configured);
        assert!(search.results.is_empty());

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json, serde_json::json!({"found": false, "source": "none", "configured": false}));
    }

    #[tokio::test]
    async fn test_empty_queries_rejected() {
        let lookup = MetadataLookup::new(vec![]);
        assert!(matches!(lookup.search("  ").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(
            lookup.fetch_details(&DetailsQuery::default()).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
