//! Bank-link handlers.
//!
//! - POST /api/v1/link/token - Link token for the hosted flow
//! - POST /api/v1/link/exchange - Exchange the public token and link the account

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    middleware::session::SessionContext,
    models::link::{EXCHANGE_COMPLETE, ExchangeRequest, ExchangeResponse, LinkTokenResponse},
    routes::AppState,
    services::link_service,
};

pub async fn create_link_token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<LinkTokenResponse>, AppError> {
    let link_token = link_service::create_link_token(&state, &session.user).await?;

    Ok(Json(LinkTokenResponse { link_token }))
}

/// Finish a link.
///
/// # Response
///
/// - **Success (200 OK)**: `{"public_token_exchange": "complete", "bank": {...}}`
/// - **Error (409)**: account already linked
/// - **Error (422)**: no funding source, or no account on the item
/// - **Error (502)**: a provider call failed (including a reused public token)
pub async fn exchange_public_token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let bank = link_service::exchange_public_token(
        &state,
        &session.user,
        &request.public_token,
        request.account_id.as_deref(),
    )
    .await?;

    Ok(Json(ExchangeResponse {
        public_token_exchange: EXCHANGE_COMPLETE.to_string(),
        bank: bank.into(),
    }))
}
