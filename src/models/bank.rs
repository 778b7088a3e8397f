//! Linked bank-account models.
//!
//! A `BankAccount` document is written once per successful link and never
//! updated. It holds the aggregator access token, which must not leave the
//! server: `BankAccountResponse` is what clients see.

use serde::{Deserialize, Serialize};

/// Represents a bank-account document.
///
/// # Collection
///
/// Lives in the configured banks collection, queried by `userId`, by
/// document id, or by `accountId` (expected to be unique).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    /// Document id assigned by the store
    #[serde(rename = "$id")]
    pub id: String,

    /// Owning user's identity account id
    pub user_id: String,

    /// Aggregator item id
    pub bank_id: String,

    /// Aggregator account id
    pub account_id: String,

    /// Aggregator access token (secret)
    pub access_token: String,

    /// Processor funding-source URL
    pub funding_source_url: String,

    /// Signed form of `account_id` safe to hand out
    pub shareable_id: String,
}

/// Attributes of a new bank-account document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankAccount {
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub access_token: String,
    pub funding_source_url: String,
    pub shareable_id: String,
}

/// Response body for bank endpoints (no access token).
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "6680b2c4001f",
///   "user_id": "667fd0a1002b",
///   "bank_id": "eVBnVMp7zdTJLkRNr33Rs6zr7KNJqBFL9DrE6",
///   "account_id": "BxBXxLj1m4HMXBm9WZZmCWVbPjX16EHwv99vp",
///   "funding_source_url": "https://api-sandbox.dwolla.com/funding-sources/...",
///   "shareable_id": "42784278...a1b2"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountResponse {
    pub id: String,
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub funding_source_url: String,
    pub shareable_id: String,
}

impl From<BankAccount> for BankAccountResponse {
    fn from(bank: BankAccount) -> Self {
        Self {
            id: bank.id,
            user_id: bank.user_id,
            bank_id: bank.bank_id,
            account_id: bank.account_id,
            funding_source_url: bank.funding_source_url,
            shareable_id: bank.shareable_id,
        }
    }
}
