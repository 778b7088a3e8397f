//! HTTP middleware components.
//!
//! Middleware run before route handlers. The session middleware rejects
//! requests without a valid session and hands the signed-in user to handlers.

/// Session cookie authentication
pub mod session;
