//! Data models for stored documents and API payloads.

/// User profile documents and auth payloads
pub mod user;
/// Linked bank-account documents
pub mod bank;
/// Bank-link handshake payloads
pub mod link;
