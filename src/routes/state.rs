use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::{CatalogRepository, UserRepository},
    middleware::RateLimiter,
    services::{
        ai::AiSettings,
        auth::{GoogleOAuth, SessionManager},
        metadata::MetadataLookup,
    },
};

/// Shared handler state
///
/// LLM backends are not held here: `AiSettings` is turned into a provider on
/// each request so the backend selection and its credential are checked per call.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub users: Arc<dyn UserRepository>,
    pub metadata: Arc<MetadataLookup>,
    pub ai: AiSettings,
    pub sessions: SessionManager,
    pub google: Option<GoogleOAuth>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wires the state from configuration and already-connected stores
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        metadata: MetadataLookup,
        redis_client: Option<redis::Client>,
    ) -> Self {
        let window = Duration::from_secs(config.rate_limit_window_secs);
        let rate_limiter = match redis_client {
            Some(client) => RateLimiter::redis(client, config.rate_limit_max_requests, window),
            None => RateLimiter::in_memory(config.rate_limit_max_requests, window),
        };

        let google = GoogleOAuth::from_parts(
            reqwest::Client::new(),
            Config::credential(&config.google_client_id),
            Config::credential(&config.google_client_secret),
            Config::credential(&config.google_redirect_uri),
        );

        Self {
            catalog,
            users,
            metadata: Arc::new(metadata),
            ai: AiSettings::from_config(config),
            sessions: SessionManager::new(&config.session_secret, config.session_ttl_hours),
            google,
            rate_limiter,
        }
    }
}
