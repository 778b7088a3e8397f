//! User service - sign-up, sign-in, session resolution and sign-out.
//!
//! Session cookies are set and cleared by the handlers; this module only
//! deals with the identity provider, the processor and the users collection.

use crate::{
    error::AppError,
    models::user::{NewUser, SignInRequest, SignUpRequest, User},
    providers::{
        Collection, DocumentStore, Filter, ProviderError, Session, attributes,
        resource_id_from_url,
    },
    routes::AppState,
};

/// Register a new user.
///
/// # Process
///
/// 1. Create the identity account ("First Last")
/// 2. Create a personal customer with the processor
/// 3. Store the profile document with the processor customer id and URL
/// 4. Open an email/password session
///
/// If any step after the first fails, the identity account is deleted so
/// the email can sign up again.
///
/// # Returns
///
/// The stored profile and the session whose secret goes into the cookie.
///
/// # Errors
///
/// - `InvalidRequest`: request failed validation
/// - `EmailAlreadyRegistered`: identity provider already knows the email
/// - `Upstream`: any provider call failed
pub async fn sign_up(
    state: &AppState,
    request: SignUpRequest,
) -> Result<(User, Session), AppError> {
    request.validate()?;

    let account = state
        .identity
        .create_account(&request.email, &request.password, &request.full_name())
        .await
        .map_err(|e| {
            if e.is_conflict() {
                AppError::EmailAlreadyRegistered
            } else {
                AppError::Upstream(e)
            }
        })?;
    tracing::info!(user_id = %account.id, "Identity account created");

    match complete_sign_up(state, &request, &account.id).await {
        Ok((user, session)) => {
            tracing::info!(user_id = %user.user_id, document_id = %user.id, "User signed up");
            Ok((user, session))
        }
        Err(err) => {
            tracing::error!(
                user_id = %account.id,
                error = %err,
                "Sign-up failed, removing identity account"
            );
            if let Err(remove_err) = state.identity.delete_account(&account.id).await {
                tracing::error!(
                    user_id = %account.id,
                    error = %remove_err,
                    "Identity account left without a profile"
                );
            }
            Err(err)
        }
    }
}

/// Steps 2-4 of [`sign_up`] for an existing identity account.
async fn complete_sign_up(
    state: &AppState,
    request: &SignUpRequest,
    account_id: &str,
) -> Result<(User, Session), AppError> {
    let customer_url = state.processor.create_customer(&request.customer()).await?;
    let customer_id =
        resource_id_from_url(&customer_url).ok_or_else(|| ProviderError::Decode {
            provider: "processor",
            message: format!("customer URL has no id: {}", customer_url),
        })?;
    tracing::info!(
        user_id = %account_id,
        customer_id = %customer_id,
        "Processor customer created"
    );

    let new_user = NewUser {
        user_id: account_id.to_string(),
        email: request.email.clone(),
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        address1: request.address1.clone(),
        city: request.city.clone(),
        state: request.state.clone(),
        postal_code: request.postal_code.clone(),
        date_of_birth: request.date_of_birth.clone(),
        processor_customer_id: customer_id,
        processor_customer_url: customer_url,
    };

    let document = state
        .store
        .create_document(Collection::Users, attributes(&new_user)?)
        .await?;
    let user: User = document.decode()?;

    let session = state
        .identity
        .create_session(&request.email, &request.password)
        .await?;

    Ok((user, session))
}

/// Open a session and return the matching profile.
///
/// # Errors
///
/// - `InvalidCredentials`: the identity provider rejected the pair
/// - `UserNotFound`: identity exists without a profile document
pub async fn sign_in(
    state: &AppState,
    request: SignInRequest,
) -> Result<(User, Session), AppError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let session = state
        .identity
        .create_session(&request.email, &request.password)
        .await
        .map_err(|e| match e.status() {
            Some(400 | 401 | 403) => AppError::InvalidCredentials,
            _ => AppError::Upstream(e),
        })?;

    let user = get_user_info(state.store.as_ref(), &session.user_id).await?;

    tracing::info!(user_id = %user.user_id, "User signed in");
    Ok((user, session))
}

/// Resolve the profile behind a session secret.
///
/// # Errors
///
/// - `Unauthorized`: session missing, expired or revoked
/// - `UserNotFound`: identity exists without a profile document
/// - `Upstream`: the identity provider or store failed
pub async fn get_logged_in_user(
    state: &AppState,
    session_secret: &str,
) -> Result<User, AppError> {
    let account = state
        .identity
        .current_account(session_secret)
        .await
        .map_err(|e| {
            if e.is_unauthorized() {
                AppError::Unauthorized
            } else {
                AppError::Upstream(e)
            }
        })?;

    get_user_info(state.store.as_ref(), &account.id).await
}

/// Delete the current session.
///
/// An already-invalid session counts as signed out.
pub async fn sign_out(state: &AppState, session_secret: &str) -> Result<(), AppError> {
    match state.identity.delete_session(session_secret).await {
        Ok(()) => {
            tracing::info!("User signed out");
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            tracing::debug!("Session was already invalid at sign-out");
            Ok(())
        }
        Err(e) => Err(AppError::Upstream(e)),
    }
}

/// Profile document for an identity account id.
pub async fn get_user_info(store: &dyn DocumentStore, user_id: &str) -> Result<User, AppError> {
    let list = store
        .list_documents(Collection::Users, &[Filter::equal("userId", user_id)])
        .await?;

    let document = list.documents.first().ok_or(AppError::UserNotFound)?;
    Ok(document.decode()?)
}
