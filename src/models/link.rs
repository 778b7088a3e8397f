//! Bank-link handshake payloads.

use serde::{Deserialize, Serialize};

use crate::models::bank::BankAccountResponse;

/// Status reported once a public token has been fully exchanged.
pub const EXCHANGE_COMPLETE: &str = "complete";

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

/// Request to finish a link with the public token from the hosted flow.
///
/// # JSON Example
///
/// ```json
/// {
///   "public_token": "public-sandbox-b0e2c4ee",
///   "account_id": "BxBXxLj1m4HMXBm9WZZmCWVbPjX16EHwv99vp"
/// }
/// ```
///
/// `account_id` picks one account of a multi-account item; without it the
/// first account is linked.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub public_token: String,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResponse {
    /// Always [`EXCHANGE_COMPLETE`]
    pub public_token_exchange: String,
    pub bank: BankAccountResponse,
}
