//! Business logic services.
//!
//! Services sequence provider calls and turn their results into typed
//! records and errors. Handlers stay thin wrappers around them.

pub mod bank_service;
pub mod link_service;
pub mod user_service;
