//! Linked bank handlers.
//!
//! - GET /api/v1/banks - Banks of the signed-in user
//! - GET /api/v1/banks/{id} - Bank by document id
//! - GET /api/v1/banks/by-account/{account_id} - Bank by aggregator account id
//! - GET /api/v1/banks/shared/{shareable_id} - Bank by shareable id
//!
//! Responses never carry the aggregator access token.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    middleware::session::SessionContext,
    models::bank::{BankAccount, BankAccountResponse},
    routes::AppState,
    services::bank_service,
};

/// Banks owned by someone else read as missing, so ids of other users'
/// records are not confirmed.
fn owned_by(bank: BankAccount, session: &SessionContext) -> Result<BankAccount, AppError> {
    if bank.user_id == session.user.id {
        Ok(bank)
    } else {
        Err(AppError::BankNotFound)
    }
}

pub async fn list_banks(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<BankAccountResponse>>, AppError> {
    let banks = bank_service::get_banks(state.store.as_ref(), &session.user.id).await?;

    Ok(Json(banks.into_iter().map(Into::into).collect()))
}

pub async fn get_bank(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(bank_id): Path<String>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let bank = bank_service::get_bank(state.store.as_ref(), &bank_id).await?;

    Ok(Json(owned_by(bank, &session)?.into()))
}

/// 404 unless exactly one bank record references the account.
pub async fn get_bank_by_account(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(account_id): Path<String>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let bank = bank_service::get_bank_by_account_id(state.store.as_ref(), &account_id)
        .await?
        .ok_or(AppError::BankNotFound)?;

    Ok(Json(owned_by(bank, &session)?.into()))
}

/// Shareable ids are meant to be handed to other users, so there is no
/// owner check here.
pub async fn get_shared_bank(
    State(state): State<AppState>,
    Path(shareable_id): Path<String>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let bank = bank_service::get_bank_by_shareable_id(
        state.store.as_ref(),
        &state.shareable_ids,
        &shareable_id,
    )
    .await?;

    Ok(Json(bank.into()))
}
