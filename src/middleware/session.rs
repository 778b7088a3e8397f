//! Session cookie middleware.
//!
//! Every protected request goes through [`session_middleware`]:
//! 1. Read the session secret from the `banking-session` cookie
//! 2. Resolve it to the signed-in user through the identity provider
//! 3. Inject a [`SessionContext`] into the request extensions
//! 4. Reject the request with HTTP 401 when any step fails

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::user::User,
    providers::{ProviderError, Session},
    routes::AppState,
    services::user_service,
};

pub const SESSION_COOKIE: &str = "banking-session";

/// Signed-in user attached to authenticated requests.
///
/// Not `Debug`: carries the session secret.
#[derive(Clone)]
pub struct SessionContext {
    /// Session secret from the cookie, needed to sign out
    pub secret: String,

    /// Profile document of the signed-in user
    pub user: User,
}

/// Session secret from the `Cookie` header, if present and non-empty.
pub fn session_secret(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn cookie_header(value: String) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&value).map_err(|_| {
        AppError::Upstream(ProviderError::Decode {
            provider: "identity",
            message: "session secret is not a valid cookie value".to_string(),
        })
    })
}

/// `Set-Cookie` value carrying the session secret.
///
/// The cookie lives as long as the session; without an expiry it is a
/// browser-session cookie.
pub fn session_cookie(session: &Session) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Secure",
        SESSION_COOKIE, session.secret
    );

    if let Some(expire) = session.expire {
        let max_age = (expire - Utc::now()).num_seconds().max(0);
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }

    cookie_header(cookie)
}

/// `Set-Cookie` value that removes the session cookie.
pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "banking-session=; Path=/; HttpOnly; SameSite=Strict; Secure; Max-Age=0",
    )
}

/// Session authentication middleware function.
///
/// # Returns
///
/// - `Ok(Response)` from the next handler when the session resolves to a user
/// - `Err(AppError::Unauthorized)` without a cookie or with a dead session
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = session_secret(request.headers()).ok_or(AppError::Unauthorized)?;

    let user = user_service::get_logged_in_user(&state, &secret).await?;
    tracing::debug!(user_id = %user.user_id, "Session resolved");

    request
        .extensions_mut()
        .insert(SessionContext { secret, user });

    Ok(next.run(request).await)
}
