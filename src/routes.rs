//! Router construction and shared application state.
//!
//! Public routes (health, sign-up, sign-in) sit next to a session-protected
//! group; the session middleware is applied with `route_layer` so unknown
//! paths still 404 instead of 401.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers, middleware,
    providers::{Aggregator, DocumentStore, IdentityProvider, Processor},
    shareable::ShareableIds,
    views::ViewCache,
};

/// State shared by every handler.
///
/// Provider clients sit behind their capability traits so tests can swap in
/// in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub aggregator: Arc<dyn Aggregator>,
    pub processor: Arc<dyn Processor>,
    pub shareable_ids: ShareableIds,
    pub views: ViewCache,
}

pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/", get(handlers::home::home))
        // Session
        .route("/api/v1/auth/sign-out", post(handlers::auth::sign_out))
        .route("/api/v1/auth/me", get(handlers::auth::me))
        // Bank link
        .route("/api/v1/link/token", post(handlers::link::create_link_token))
        .route(
            "/api/v1/link/exchange",
            post(handlers::link::exchange_public_token),
        )
        .route("/api/v1/link/widget", get(handlers::widget::link_button))
        .route(
            "/api/v1/link/widget/success",
            post(handlers::widget::link_success),
        )
        // Banks
        .route("/api/v1/banks", get(handlers::banks::list_banks))
        .route("/api/v1/banks/{id}", get(handlers::banks::get_bank))
        .route(
            "/api/v1/banks/by-account/{account_id}",
            get(handlers::banks::get_bank_by_account),
        )
        .route(
            "/api/v1/banks/shared/{shareable_id}",
            get(handlers::banks::get_shared_bank),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session::session_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/v1/auth/sign-in", post(handlers::auth::sign_in))
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
