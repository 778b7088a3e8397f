//! HTTP request handlers (route handlers).
//!
//! Handlers extract the request, call into `services`, and map the result to
//! a JSON response, a cookie, or a redirect. Protected handlers receive the
//! signed-in user as `Extension<SessionContext>`.

/// Sign-up, sign-in, sign-out and current user
pub mod auth;
/// Linked bank lookups
pub mod banks;
/// Store connectivity probe
pub mod health;
/// Cached home view
pub mod home;
/// Link token and public token exchange
pub mod link;
/// "Connect bank" button
pub mod widget;
