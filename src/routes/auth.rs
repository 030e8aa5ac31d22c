use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::User,
    routes::AppState,
    services::auth::{self, SessionManager},
};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCompleteRequest {
    pub code: String,
}

/// Issues a session for `user` and returns it with both cookies set
fn signed_in(state: &AppState, status: StatusCode, user: &User) -> AppResult<Response> {
    let session = state.sessions.issue(user)?;
    let [session_cookie, user_cookie] = state.sessions.cookies(&session)?;

    Ok((
        status,
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, user_cookie),
        ]),
        Json(json!({
            "user": user,
            "token": session.token,
            "expiresAt": session.claims.expires_at,
        })),
    )
        .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let user = auth::register(
        state.users.as_ref(),
        &state.sessions,
        &request.username,
        &request.password,
    )
    .await?;
    signed_in(&state, StatusCode::CREATED, &user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let user = auth::login(state.users.as_ref(), &request.username, &request.password).await?;
    signed_in(&state, StatusCode::OK, &user)
}

pub async fn logout() -> impl IntoResponse {
    let [session_cookie, user_cookie] = SessionManager::clear_cookies();
    (
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, user_cookie),
        ]),
        Json(json!({ "success": true })),
    )
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<User>> {
    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    auth::change_password(
        state.users.as_ref(),
        &state.sessions,
        current.id,
        &request.current_password,
        &request.new_password,
    )
    .await?;
    Ok(Json(json!({ "success": true })))
}

fn google(state: &AppState) -> AppResult<&auth::GoogleOAuth> {
    state.google.as_ref().ok_or_else(|| {
        AppError::MissingCredential(
            "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URI".to_string(),
        )
    })
}

pub async fn google_authorization_url(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let url = google(&state)?.authorization_url()?;
    Ok(Json(json!({ "url": url })))
}

pub async fn google_complete(
    State(state): State<AppState>,
    Json(request): Json<GoogleCompleteRequest>,
) -> AppResult<Response> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::InvalidInput("Authorization code is required".to_string()));
    }

    let profile = google(&state)?.exchange_code(code).await?;
    let user = auth::google_login(state.users.as_ref(), &profile).await?;
    signed_in(&state, StatusCode::OK, &user)
}
