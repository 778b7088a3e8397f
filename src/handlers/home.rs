//! Home page data (`GET /`).

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    middleware::session::SessionContext,
    routes::AppState,
    services::bank_service,
    views::{HOME_PATH, HomeView},
};

/// Cached per user until a link revalidates the path.
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<HomeView>, AppError> {
    let user = &session.user;

    if let Some(view) = state.views.get(HOME_PATH, &user.id).await {
        return Ok(Json(view));
    }

    // Captured before reading so a concurrent link invalidates this build
    let generation = state.views.generation().await;
    let banks = bank_service::get_banks(state.store.as_ref(), &user.id).await?;
    let view = HomeView::new(
        user.clone().into(),
        banks.into_iter().map(Into::into).collect(),
    );
    state.views.put(HOME_PATH, &user.id, generation, view.clone()).await;

    Ok(Json(view))
}
