use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::AppState,
    services::auth::{cookie_value, SESSION_COOKIE},
};

/// The signed-in user, from the session cookie or an `Authorization: Bearer` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

fn session_token(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookies| cookie_value(cookies, SESSION_COOKIE))
            .filter(|t| !t.is_empty())
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;

        let claims = state
            .sessions
            .verify(token)
            .ok_or_else(|| AppError::Unauthorized("Session is invalid or has expired".to_string()))?;

        Ok(CurrentUser {
            id: claims.user_id,
            username: claims.username,
        })
    }
}

/// User a request acts for. A body `userId` must name the signed-in user.
pub fn resolve_user_id(explicit: Option<Uuid>, session: Option<CurrentUser>) -> Result<Uuid, AppError> {
    let session = session.ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;
    match explicit {
        Some(id) if id != session.id => Err(AppError::Forbidden(
            "userId does not match the signed-in user".to_string(),
        )),
        _ => Ok(session.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/movies");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_cookie() {
        let parts = parts(&[("cookie", "theme=dark; cinepath_session=abc.def")]);
        assert_eq!(session_token(&parts), Some("abc.def"));
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let parts = parts(&[
            ("authorization", "Bearer header.token"),
            ("cookie", "cinepath_session=cookie.token"),
        ]);
        assert_eq!(session_token(&parts), Some("header.token"));
    }

    #[test]
    fn test_resolve_user_id() {
        let session = CurrentUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
        };
        assert_eq!(resolve_user_id(None, Some(session.clone())).unwrap(), session.id);
        assert_eq!(resolve_user_id(Some(session.id), Some(session.clone())).unwrap(), session.id);
    }

    #[test]
    fn test_resolve_user_id_requires_session() {
        assert!(matches!(resolve_user_id(None, None), Err(AppError::Unauthorized(_))));
        assert!(matches!(
            resolve_user_id(Some(Uuid::new_v4()), None),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_resolve_user_id_rejects_other_user() {
        let session = CurrentUser {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
        };
        assert!(matches!(
            resolve_user_id(Some(Uuid::new_v4()), Some(session)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(session_token(&parts(&[("cookie", "cinepath_session=")])), None);
        assert_eq!(session_token(&parts(&[])), None);
    }
}
