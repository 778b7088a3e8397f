//! Authentication handlers.
//!
//! - POST /api/v1/auth/sign-up - Register, open a session, set the cookie
//! - POST /api/v1/auth/sign-in - Open a session, set the cookie
//! - POST /api/v1/auth/sign-out - Delete the session, clear the cookie
//! - GET /api/v1/auth/me - Current user

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    middleware::session::{SessionContext, cleared_cookie, session_cookie},
    models::user::{SignInRequest, SignUpRequest, UserResponse},
    routes::AppState,
    services::user_service,
};

/// Register a new user.
///
/// # Request Body
///
/// ```json
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "address1": "1 Analytical Way",
///   "city": "New York",
///   "state": "NY",
///   "postal_code": "10001",
///   "date_of_birth": "1990-12-10",
///   "ssn": "1234",
///   "email": "ada@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the user, with `Set-Cookie: banking-session=...`
/// - **Error (400)**: validation failed
/// - **Error (409)**: email already registered
/// - **Error (502)**: a provider call failed
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, session) = user_service::sign_up(&state, request).await?;
    let cookie = session_cookie(&session)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// Sign in with email and password.
///
/// Returns the user and sets the session cookie; 401 on bad credentials.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, session) = user_service::sign_in(&state, request).await?;
    let cookie = session_cookie(&session)?;

    Ok(([(header::SET_COOKIE, cookie)], Json(UserResponse::from(user))))
}

/// Delete the current session. Always clears the cookie (204 No Content).
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<impl IntoResponse, AppError> {
    user_service::sign_out(&state, &session.secret).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_cookie())],
    ))
}

pub async fn me(Extension(session): Extension<SessionContext>) -> Json<UserResponse> {
    Json(session.user.into())
}
