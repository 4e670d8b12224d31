//! Extractor for the authenticated user.
//!
//! Authentication methods are tried in priority order:
//!
//! 1. `Authorization: Bearer <token>` header
//! 2. Session cookie
//!
//! Both carry the same JWT. After a token verifies, the account is checked
//! against the database so deactivated users are locked out immediately even
//! though tokens are stateless.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    db::errors::DbError,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Extract user from a bearer token if present and valid
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid token found and verified
/// - Some(Err(error)): Bearer token present but invalid
fn try_bearer_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = auth_str.strip_prefix("Bearer ")?;
    Some(session::verify_session_token(token, config))
}

/// Extract user from the session cookie if present and valid
fn try_cookie_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                match session::verify_session_token(value, config) {
                    Ok(user) => return Some(Ok(user)),
                    // Expired/invalid cookies are expected; keep scanning
                    Err(_) => continue,
                }
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let candidate = match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer authenticated user: {}", user.id);
                Some(user)
            }
            Some(Err(e)) => {
                trace!("Bearer authentication failed: {:?}", e);
                None
            }
            None => None,
        };

        let candidate = match candidate {
            Some(user) => Some(user),
            None if state.config.auth.native.enabled => match try_cookie_auth(parts, &state.config) {
                Some(Ok(user)) => {
                    debug!("Found session cookie authenticated user: {}", user.id);
                    Some(user)
                }
                _ => None,
            },
            None => None,
        };

        let user = candidate.ok_or(Error::Unauthenticated { message: None })?;

        // Token is valid; make sure the account still exists and is active
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let active: Option<bool> =
            sqlx::query_scalar("SELECT active FROM users WHERE id = ?")
                .bind(user.id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| Error::Database(DbError::from(e)))?;

        match active {
            Some(true) => Ok(user),
            _ => Err(Error::Unauthenticated {
                message: Some("Account is deactivated".to_string()),
            }),
        }
    }
}
