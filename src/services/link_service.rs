//! Bank-link orchestrator.
//!
//! Turns a public token from the aggregator's hosted flow into a funded,
//! persisted bank record:
//!
//! 1. Exchange the public token for an access token and item id
//! 2. List the item's accounts and pick one
//! 3. Refuse accounts that already have a bank record (a concurrent link of
//!    the same account is caught by the store's uniqueness check in step 6)
//! 4. Create a processor token for the account
//! 5. Create a funding source for the user's processor customer
//! 6. Persist the bank record (removing the funding source if that fails)
//! 7. Revalidate the cached home view
//!
//! A bank record therefore only exists when both the aggregator link and the
//! funding source succeeded.

use crate::{
    error::AppError,
    models::{
        bank::{BankAccount, NewBankAccount},
        user::User,
    },
    providers::{AggregatorAccount, LinkTokenParams},
    routes::AppState,
    services::bank_service,
    views::HOME_PATH,
};

/// Create a link token for the user's hosted-link session.
pub async fn create_link_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let params = LinkTokenParams {
        client_name: user.full_name(),
        client_user_id: user.id.clone(),
    };

    let link_token = state.aggregator.create_link_token(&params).await?;
    tracing::info!(user_id = %user.id, "Link token created");

    Ok(link_token)
}

/// Pick the account to link.
///
/// With no explicit choice the first account is used.
fn select_account(
    accounts: Vec<AggregatorAccount>,
    requested: Option<&str>,
) -> Result<AggregatorAccount, AppError> {
    if accounts.is_empty() {
        return Err(AppError::NoLinkableAccount);
    }

    match requested {
        Some(account_id) => accounts
            .into_iter()
            .find(|account| account.account_id == account_id)
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "account {} is not part of the linked item",
                    account_id
                ))
            }),
        None => accounts
            .into_iter()
            .next()
            .ok_or(AppError::NoLinkableAccount),
    }
}

/// Exchange a public token and link the selected account.
///
/// # Errors
///
/// - `InvalidRequest`: empty public token, or unknown `account_id`
/// - `NoLinkableAccount`: the item exposes no accounts
/// - `BankAlreadyLinked`: the account already has a bank record, or another
///   link of it won the race to persist
/// - `FundingSourceNotCreated`: the processor returned no funding source
/// - `Upstream`: any provider call failed (a reused public token lands here)
pub async fn exchange_public_token(
    state: &AppState,
    user: &User,
    public_token: &str,
    account_id: Option<&str>,
) -> Result<BankAccount, AppError> {
    if public_token.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "public_token is required".to_string(),
        ));
    }

    let exchange = state.aggregator.exchange_public_token(public_token).await?;
    tracing::info!(user_id = %user.id, item_id = %exchange.item_id, "Public token exchanged");

    let accounts = state.aggregator.list_accounts(&exchange.access_token).await?;
    if accounts.len() > 1 && account_id.is_none() {
        tracing::warn!(
            item_id = %exchange.item_id,
            accounts = accounts.len(),
            "Item has several accounts, linking the first"
        );
    }
    let account = select_account(accounts, account_id)?;

    if bank_service::is_account_linked(state.store.as_ref(), &account.account_id).await? {
        tracing::warn!(account_id = %account.account_id, "Account is already linked");
        return Err(AppError::BankAlreadyLinked);
    }

    let processor_token = state
        .aggregator
        .create_processor_token(&exchange.access_token, &account.account_id)
        .await?;

    let funding_source_url = state
        .processor
        .create_funding_source(
            &user.processor_customer_id,
            &processor_token,
            &account.name,
        )
        .await?
        .filter(|url| !url.is_empty())
        .ok_or(AppError::FundingSourceNotCreated)?;
    tracing::info!(account_id = %account.account_id, "Funding source created");

    let new_bank = NewBankAccount {
        user_id: user.id.clone(),
        bank_id: exchange.item_id,
        account_id: account.account_id.clone(),
        access_token: exchange.access_token,
        funding_source_url: funding_source_url.clone(),
        shareable_id: state.shareable_ids.encode(&account.account_id),
    };

    let bank = match bank_service::create_bank_account(state.store.as_ref(), &new_bank).await {
        Ok(bank) => bank,
        Err(err) => {
            tracing::error!(
                account_id = %account.account_id,
                error = %err,
                "Persisting bank account failed, removing funding source"
            );
            if let Err(remove_err) = state
                .processor
                .remove_funding_source(&funding_source_url)
                .await
            {
                tracing::error!(
                    funding_source_url = %funding_source_url,
                    error = %remove_err,
                    "Funding source left without a bank record"
                );
            }
            return Err(match err {
                AppError::Upstream(e) if e.is_conflict() => AppError::BankAlreadyLinked,
                other => other,
            });
        }
    };

    state.views.revalidate_path(HOME_PATH).await;

    tracing::info!(user_id = %user.id, bank_id = %bank.id, "Bank account linked");
    Ok(bank)
}
