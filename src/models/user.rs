use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered account
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Google OAuth subject for accounts created through Google sign-in
    #[serde(skip_serializing)]
    pub google_sub: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: Option<String>, google_sub: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            google_sub,
            created_at: Utc::now(),
        }
    }
}
