//! External provider capabilities.
//!
//! The service talks to three vendors: an identity/document provider, a bank
//! data aggregator and a payments processor. Each capability is a narrow
//! async trait so handlers and services only see what they call, and tests
//! swap in the in-memory fakes from [`fake`].

pub mod appwrite;
pub mod dwolla;
pub mod plaid;
pub mod postgres;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error returned by any provider adapter.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure (connect, timeout, TLS).
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The provider answered with a body we could not interpret.
    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    /// A created resource came back without its `Location` header.
    #[error("{0} did not return a resource location")]
    MissingLocation(&'static str),

    /// Local storage failure (postgres document backend).
    #[error("Document storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ProviderError {
    pub fn http(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Http { provider, source }
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Account record held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityAccount {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Email/password session issued by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub secret: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, ProviderError>;

    async fn create_session(&self, email: &str, password: &str)
    -> Result<Session, ProviderError>;

    /// Resolve the account owning `session_secret`.
    async fn current_account(&self, session_secret: &str)
    -> Result<IdentityAccount, ProviderError>;

    async fn delete_session(&self, session_secret: &str) -> Result<(), ProviderError>;

    /// Remove an account and its sessions (admin call).
    async fn delete_account(&self, account_id: &str) -> Result<(), ProviderError>;
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Logical collections; adapters map them to configured ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Banks,
}

/// Equality filter on a document attribute. `$id` addresses the document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub attribute: String,
    pub value: String,
}

impl Filter {
    pub const DOCUMENT_ID: &'static str = "$id";

    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Whether `document` satisfies this filter.
    pub fn matches(&self, document: &Document) -> bool {
        if self.attribute == Self::DOCUMENT_ID {
            return document.id == self.value;
        }
        document.data.get(&self.attribute).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

/// A stored document: store-assigned id plus its attribute map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub data: Map<String, Value>,
}

impl Document {
    /// Decode the attribute map into a typed record.
    ///
    /// The document id is injected as `$id` so records can carry it.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProviderError> {
        let mut data = self.data.clone();
        data.insert(
            Filter::DOCUMENT_ID.to_string(),
            Value::String(self.id.clone()),
        );
        serde_json::from_value(Value::Object(data)).map_err(|e| ProviderError::Decode {
            provider: "document store",
            message: e.to_string(),
        })
    }
}

/// Serialize a record into a document attribute map.
pub fn attributes<T: Serialize>(record: &T) -> Result<Map<String, Value>, ProviderError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ProviderError::Decode {
            provider: "document store",
            message: "record is not an object".to_string(),
        }),
        Err(e) => Err(ProviderError::Decode {
            provider: "document store",
            message: e.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Document, ProviderError>;

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<DocumentList, ProviderError>;

    /// Cheap connectivity check used by `/health`.
    async fn ping(&self) -> Result<(), ProviderError>;
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Inputs for a hosted-link session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTokenParams {
    pub client_name: String,
    pub client_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

/// Account exposed by a linked item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregatorAccount {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn create_link_token(&self, params: &LinkTokenParams) -> Result<String, ProviderError>;

    async fn exchange_public_token(&self, public_token: &str)
    -> Result<TokenExchange, ProviderError>;

    async fn list_accounts(&self, access_token: &str)
    -> Result<Vec<AggregatorAccount>, ProviderError>;

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Personal customer profile sent to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub customer_type: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
}

#[async_trait]
pub trait Processor: Send + Sync {
    /// Create a customer and return its resource URL.
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, ProviderError>;

    /// Attach a bank account to a customer. `None` when the processor
    /// accepted the request but did not hand back a funding-source URL.
    async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        name: &str,
    ) -> Result<Option<String>, ProviderError>;

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), ProviderError>;
}

/// Last non-empty path segment of a processor resource URL.
///
/// `https://api-sandbox.dwolla.com/customers/abc` -> `abc`
pub fn resource_id_from_url(resource_url: &str) -> Option<String> {
    let parsed = url::Url::parse(resource_url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_id_is_last_path_segment() {
        assert_eq!(
            resource_id_from_url("https://api-sandbox.dwolla.com/customers/FC451A7A-AE30/")
                .as_deref(),
            Some("FC451A7A-AE30")
        );
        assert_eq!(resource_id_from_url("not a url"), None);
    }

    #[test]
    fn filter_addresses_document_id_and_attributes() {
        let document = Document {
            id: "doc-1".to_string(),
            created_at: None,
            data: json!({ "userId": "u-1" }).as_object().cloned().unwrap(),
        };

        assert!(Filter::equal("$id", "doc-1").matches(&document));
        assert!(Filter::equal("userId", "u-1").matches(&document));
        assert!(!Filter::equal("userId", "u-2").matches(&document));
        assert!(!Filter::equal("accountId", "u-1").matches(&document));
    }

    #[test]
    fn unauthorized_statuses_are_recognised() {
        let err = ProviderError::Api {
            provider: "appwrite",
            status: 401,
            code: Some("user_unauthorized".to_string()),
            message: "no session".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(!err.is_conflict());
    }
}
