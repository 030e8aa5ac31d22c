/// Accounts and sessions
///
/// Passwords are stored as PHC-formatted PBKDF2-HMAC-SHA256 strings.
/// Sessions are stateless tokens: base64url JSON claims plus an HMAC-SHA256
/// signature over them. Nothing about a session is stored server-side.
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    db::UserRepository,
    error::{AppError, AppResult, FieldError},
    models::User,
};

type HmacSha256 = Hmac<Sha256>;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;
const PHC_B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD_NO_PAD;

pub const SESSION_COOKIE: &str = "cinepath_session";
pub const USER_COOKIE: &str = "cinepath_user";
pub const DEFAULT_PASSWORD_ROUNDS: u32 = 100_000;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

// ============================================================================
// Passwords
// ============================================================================

pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut hash);

    format!(
        "$pbkdf2-sha256$i={},l={}${}${}",
        rounds,
        HASH_LEN,
        PHC_B64.encode(salt),
        PHC_B64.encode(hash)
    )
}

/// Checks a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((rounds, salt, expected)) = parse_phc(stored) else {
        tracing::warn!("Stored password hash is not in the expected format");
        return false;
    };

    let mut hash = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut hash);
    constant_time_eq(&hash, &expected)
}

fn parse_phc(stored: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.strip_prefix('$')?.split('$');
    if parts.next()? != "pbkdf2-sha256" {
        return None;
    }
    let rounds = parts
        .next()?
        .split(',')
        .find_map(|p| p.strip_prefix("i="))?
        .parse()
        .ok()?;
    let salt = PHC_B64.decode(parts.next()?).ok()?;
    let hash = PHC_B64.decode(parts.next()?).ok()?;
    (!hash.is_empty()).then_some((rounds, salt, hash))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn validate_username(username: &str) -> Option<FieldError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Some(FieldError::new(
            "username",
            format!("Username must be {}-{} characters", USERNAME_MIN, USERNAME_MAX),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Some(FieldError::new(
            "username",
            "Username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    None
}

pub fn validate_password(field: &'static str, password: &str) -> Option<FieldError> {
    (password.chars().count() < PASSWORD_MIN).then(|| {
        FieldError::new(
            field,
            format!("Password must be at least {} characters", PASSWORD_MIN),
        )
    })
}

// ============================================================================
// Sessions
// ============================================================================

/// What a session token asserts, also exposed to the browser in the user cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
}

/// Issues and verifies signed session tokens
#[derive(Clone)]
pub struct SessionManager {
    secret: Vec<u8>,
    ttl: Duration,
    password_rounds: u32,
}

impl SessionManager {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::hours(ttl_hours),
            password_rounds: DEFAULT_PASSWORD_ROUNDS,
        }
    }

    /// Fewer PBKDF2 rounds, for tests
    pub fn with_password_rounds(mut self, rounds: u32) -> Self {
        self.password_rounds = rounds;
        self
    }

    pub fn password_rounds(&self) -> u32 {
        self.password_rounds
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }

    pub fn issue(&self, user: &User) -> AppResult<Session> {
        let claims = SessionClaims {
            user_id: user.id,
            username: user.username.clone(),
            expires_at: Utc::now() + self.ttl,
        };

        let payload = B64.encode(
            serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.to_string()))?,
        );
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = B64.encode(mac.finalize().into_bytes());

        Ok(Session {
            token: format!("{}.{}", payload, signature),
            claims,
        })
    }

    /// Returns the claims of a well-signed, unexpired token
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let (payload, signature) = token.trim().split_once('.')?;
        let signature = B64.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let claims: SessionClaims = serde_json::from_slice(&B64.decode(payload).ok()?).ok()?;
        (claims.expires_at > Utc::now()).then_some(claims)
    }

    /// `Set-Cookie` values for a new session
    pub fn cookies(&self, session: &Session) -> AppResult<[String; 2]> {
        let max_age = self.ttl.num_seconds();
        let user = B64.encode(
            serde_json::to_vec(&session.claims).map_err(|e| AppError::Internal(e.to_string()))?,
        );
        Ok([
            format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                SESSION_COOKIE, session.token, max_age
            ),
            format!("{}={}; Path=/; SameSite=Lax; Max-Age={}", USER_COOKIE, user, max_age),
        ])
    }

    /// `Set-Cookie` values that remove both session cookies
    pub fn clear_cookies() -> [String; 2] {
        [
            format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE),
            format!("{}=; Path=/; SameSite=Lax; Max-Age=0", USER_COOKIE),
        ]
    }
}

/// Value of one cookie from a `Cookie` header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

// ============================================================================
// Accounts
// ============================================================================

fn reject(errors: Vec<FieldError>) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn register(
    users: &dyn UserRepository,
    sessions: &SessionManager,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let username = username.trim();
    reject(
        validate_username(username)
            .into_iter()
            .chain(validate_password("password", password))
            .collect(),
    )?;

    if users.find_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let user = User::new(
        username.to_string(),
        Some(hash_password(password, sessions.password_rounds())),
        None,
    );
    users.insert(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

pub async fn login(users: &dyn UserRepository, username: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let user = users
        .find_by_username(username.trim())
        .await?
        .ok_or_else(invalid)?;
    let stored = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(password, stored) {
        tracing::info!(username = %user.username, "Rejected login with wrong password");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(user)
}

pub async fn change_password(
    users: &dyn UserRepository,
    sessions: &SessionManager,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    reject(validate_password("newPassword", new_password).into_iter().collect())?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    // Google-only accounts have no password to confirm
    if let Some(stored) = user.password_hash.as_deref() {
        if !verify_password(current_password, stored) {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }
    }

    users
        .update_password(user_id, &hash_password(new_password, sessions.password_rounds()))
        .await?;
    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

// ============================================================================
// Google sign-in
// ============================================================================

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// The parts of Google's userinfo response we use
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct GoogleOAuth {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    /// `None` unless client id, secret and redirect URI are all set
    pub fn from_parts(
        http_client: reqwest::Client,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            http_client,
            client_id: client_id?,
            client_secret: client_secret?,
            redirect_uri: redirect_uri?,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }

    /// Points token and userinfo requests at another host
    pub fn with_endpoints(mut self, token_url: impl Into<String>, userinfo_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }

    pub fn authorization_url(&self) -> AppResult<String> {
        let url = reqwest::Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("access_type", "online"),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid Google authorization URL: {}", e)))?;
        Ok(url.into())
    }

    /// Exchanges an authorization code for the signed-in user's profile
    pub async fn exchange_code(&self, code: &str) -> AppResult<GoogleProfile> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = "google", status = status.as_u16(), "Code exchange failed");
            return Err(AppError::Unauthorized(format!(
                "Google sign-in failed ({}): {}",
                status, body
            )));
        }
        let token: GoogleTokenResponse = response.json().await?;

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Google userinfo returned status {}",
                status
            )));
        }

        Ok(response.json().await?)
    }
}

/// Username derived from a Google profile: the email's local part, sanitized
fn username_base(profile: &GoogleProfile) -> String {
    let raw = profile
        .email
        .as_deref()
        .and_then(|e| e.split('@').next())
        .or(profile.name.as_deref())
        .unwrap_or("user");

    let mut base: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .take(USERNAME_MAX - 4)
        .collect();
    while base.chars().count() < USERNAME_MIN {
        base.push('_');
    }
    base
}

/// Finds the account linked to a Google subject, creating it on first sign-in
pub async fn google_login(users: &dyn UserRepository, profile: &GoogleProfile) -> AppResult<User> {
    if let Some(user) = users.find_by_google_sub(&profile.sub).await? {
        return Ok(user);
    }

    let base = username_base(profile);
    let mut username = base.clone();
    let mut suffix = 1;
    while users.find_by_username(&username).await?.is_some() {
        suffix += 1;
        if suffix > 999 {
            return Err(AppError::Conflict("Could not allocate a username".to_string()));
        }
        username = format!("{}{}", base, suffix);
    }

    let user = User::new(username, None, Some(profile.sub.clone()));
    users.insert(&user).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User created from Google sign-in");
    Ok(user)
}
