#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::http::{header, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use cinepath::{
    db::{CatalogRepository, UserRepository},
    error::{AppError, AppResult},
    middleware::RateLimiter,
    models::{normalize_title, CatalogEntry, CatalogFilter, CatalogPage, Category, User},
    routes::{create_router, AppState},
    services::{
        ai::{AiSettings, ProviderKind},
        auth::{GoogleOAuth, SessionManager},
        metadata::{MetadataLookup, MetadataProvider},
    },
};

/// Catalog kept in insertion order; listings are newest first
#[derive(Default)]
pub struct InMemoryCatalog {
    entries: Mutex<Vec<CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn seed(&self, entry: CatalogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn list(&self, user_id: Uuid, filter: &CatalogFilter) -> AppResult<CatalogPage> {
        let entries = self.entries.lock().unwrap();
        let search = filter.search.as_deref().map(str::to_lowercase);

        let matching: Vec<CatalogEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .filter(|e| filter.category.map_or(true, |c| e.category == c))
            .filter(|e| {
                search
                    .as_deref()
                    .map_or(true, |s| e.title.to_lowercase().contains(s))
            })
            .cloned()
            .collect();

        Ok(CatalogPage {
            total: matching.len(),
            movies: matching
                .into_iter()
                .skip(filter.offset())
                .take(filter.limit as usize)
                .collect(),
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn all_for_user(&self, user_id: Uuid) -> AppResult<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<CatalogEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id && e.id == id)
            .cloned())
    }

    async fn find_by_title(
        &self,
        user_id: Uuid,
        title: &str,
        category: Category,
    ) -> AppResult<Option<CatalogEntry>> {
        let key = normalize_title(title);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id && e.category == category && normalize_title(&e.title) == key)
            .cloned())
    }

    async fn insert(&self, entry: &CatalogEntry) -> AppResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &CatalogEntry) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        let existing = entries
            .iter_mut()
            .find(|e| e.user_id == entry.user_id && e.id == entry.id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", entry.id)))?;
        *existing = entry.clone();
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.id == id));
        Ok(entries.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_google_sub(&self, google_sub: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.google_sub.as_deref() == Some(google_sub))
            .cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }
}

/// AI settings with no credentials and unroutable endpoints
pub fn ai_settings() -> AiSettings {
    AiSettings {
        kind: ProviderKind::Gemini,
        gemini_api_key: None,
        openrouter_api_key: None,
        cerebras_api_key: None,
        gemini_api_url: "http://127.0.0.1:1".to_string(),
        openrouter_api_url: "http://127.0.0.1:1".to_string(),
        cerebras_api_url: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_secs(5),
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub catalog: Arc<InMemoryCatalog>,
    pub users: Arc<InMemoryUsers>,
}

pub struct TestAppBuilder {
    ai: AiSettings,
    metadata: Vec<Arc<dyn MetadataProvider>>,
    rate_limit: u32,
    google: Option<GoogleOAuth>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            ai: ai_settings(),
            metadata: Vec::new(),
            rate_limit: 1_000,
            google: None,
        }
    }

    pub fn ai(mut self, ai: AiSettings) -> Self {
        self.ai = ai;
        self
    }

    pub fn metadata(mut self, providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        self.metadata = providers;
        self
    }

    pub fn rate_limit(mut self, max_requests: u32) -> Self {
        self.rate_limit = max_requests;
        self
    }

    pub fn google(mut self, google: GoogleOAuth) -> Self {
        self.google = Some(google);
        self
    }

    pub fn build(self) -> TestApp {
        let catalog = Arc::new(InMemoryCatalog::default());
        let users = Arc::new(InMemoryUsers::default());

        let state = AppState {
            catalog: catalog.clone(),
            users: users.clone(),
            metadata: Arc::new(MetadataLookup::new(self.metadata)),
            ai: self.ai,
            sessions: SessionManager::new("test-secret", 1).with_password_rounds(1_000),
            google: self.google,
            rate_limiter: RateLimiter::in_memory(self.rate_limit, Duration::from_secs(10)),
        };

        TestApp {
            server: TestServer::new(create_router(state)).unwrap(),
            catalog,
            users,
        }
    }
}

pub fn create_test_app() -> TestApp {
    TestAppBuilder::new().build()
}

/// Registers a user and returns (user id, bearer header value)
pub async fn sign_up(server: &TestServer, username: &str) -> (Uuid, HeaderValue) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "username": username, "password": "password123" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    let id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", body["token"].as_str().unwrap())).unwrap();
    (id, bearer)
}

pub fn bearer_header() -> axum::http::HeaderName {
    header::AUTHORIZATION
}
