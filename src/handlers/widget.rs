//! "Connect bank" button.
//!
//! The client renders the button; this module decides how it looks, whether
//! it is enabled, and what happens once the hosted flow reports success.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    middleware::session::SessionContext,
    routes::AppState,
    services::link_service,
    views::HOME_PATH,
};

pub const BUTTON_LABEL: &str = "Connect bank";
pub const BUTTON_ICON: &str = "/icons/connect-bank.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkVariant {
    Primary,
    Ghost,
    #[default]
    Default,
}

impl LinkVariant {
    fn class_name(self) -> &'static str {
        match self {
            LinkVariant::Primary => "plaidlink-primary rounded-[3rem]",
            LinkVariant::Ghost => "plaidlink-ghost rounded-[3rem]",
            LinkVariant::Default => "plaidlink-default rounded-[3rem]",
        }
    }

    /// Primary is text-only.
    fn icon(self) -> Option<&'static str> {
        match self {
            LinkVariant::Primary => None,
            LinkVariant::Ghost | LinkVariant::Default => Some(BUTTON_ICON),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WidgetQuery {
    #[serde(default)]
    pub variant: LinkVariant,
}

/// Button descriptor returned by `GET /api/v1/link/widget`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub variant: LinkVariant,
    pub label: String,
    pub class_name: String,
    pub icon: Option<String>,

    /// Token that opens the hosted flow; absent when it could not be created
    pub link_token: Option<String>,

    /// Whether the button may be clicked
    pub ready: bool,
}

impl LinkButton {
    pub fn new(variant: LinkVariant, link_token: Option<String>) -> Self {
        Self {
            variant,
            label: BUTTON_LABEL.to_string(),
            class_name: variant.class_name().to_string(),
            icon: variant.icon().map(str::to_string),
            ready: link_token.is_some(),
            link_token,
        }
    }
}

/// Describe the button for the signed-in user.
///
/// A failed link-token request disables the button instead of failing the
/// page.
pub async fn link_button(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<WidgetQuery>,
) -> Json<LinkButton> {
    let link_token = match link_service::create_link_token(&state, &session.user).await {
        Ok(token) => Some(token),
        Err(err) => {
            tracing::warn!(user_id = %session.user.id, error = %err, "Link button disabled");
            None
        }
    };

    Json(LinkButton::new(query.variant, link_token))
}

#[derive(Debug, Deserialize)]
pub struct LinkSuccess {
    pub public_token: String,
}

/// Hosted flow finished: link the account, then go home (303 See Other).
pub async fn link_success(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(success): Json<LinkSuccess>,
) -> Result<Redirect, AppError> {
    link_service::exchange_public_token(&state, &session.user, &success.public_token, None)
        .await?;

    Ok(Redirect::to(HOME_PATH))
}
