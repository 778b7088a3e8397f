//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize them into a type-safe struct that is
//! built once at startup and handed to every provider adapter. There are no
//! baked-in fallback identifiers: a missing collection id is a startup error.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// Required:
/// - `APPWRITE_ENDPOINT`, `APPWRITE_PROJECT_ID`, `APPWRITE_API_KEY`: identity provider
/// - `STORE_DATABASE_ID`, `USER_COLLECTION_ID`, `BANK_COLLECTION_ID`: document store ids
/// - `PLAID_CLIENT_ID`, `PLAID_SECRET`: aggregator credentials
/// - `DWOLLA_KEY`, `DWOLLA_SECRET`: processor credentials
/// - `SHAREABLE_ID_SECRET`: key used to sign shareable bank ids
///
/// Optional:
/// - `SERVER_PORT` (3000)
/// - `PLAID_ENV` (sandbox), `DWOLLA_ENV` (sandbox)
/// - `DOCUMENT_BACKEND` (appwrite) and `DATABASE_URL` (required for postgres)
/// - `HTTP_TIMEOUT_SECS` (10)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    pub appwrite_endpoint: String,
    pub appwrite_project_id: String,
    pub appwrite_api_key: String,

    pub store_database_id: String,
    pub user_collection_id: String,
    pub bank_collection_id: String,

    #[serde(default)]
    pub document_backend: DocumentBackend,
    pub database_url: Option<String>,

    pub plaid_client_id: String,
    pub plaid_secret: String,
    #[serde(default)]
    pub plaid_env: PlaidEnvironment,

    pub dwolla_key: String,
    pub dwolla_secret: String,
    #[serde(default)]
    pub dwolla_env: DwollaEnvironment,

    pub shareable_id_secret: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

/// Where documents (users, bank accounts) are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    /// Hosted collections on the identity provider
    #[default]
    Appwrite,
    /// Self-hosted Postgres `documents` table
    Postgres,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwollaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl DwollaEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            DwollaEnvironment::Sandbox => "https://api-sandbox.dwolla.com",
            DwollaEnvironment::Production => "https://api.dwolla.com",
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment error: {0}")]
    Env(#[from] envy::Error),

    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_http_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    /// - The selected document backend lacks its settings
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: plaid_client_id -> PLAID_CLIENT_ID
        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    /// Cross-field checks envy cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_backend == DocumentBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        url::Url::parse(&self.appwrite_endpoint)
            .map_err(|e| ConfigError::Invalid(format!("APPWRITE_ENDPOINT: {}", e)))?;

        for (name, value) in [
            ("APPWRITE_PROJECT_ID", &self.appwrite_project_id),
            ("APPWRITE_API_KEY", &self.appwrite_api_key),
            ("STORE_DATABASE_ID", &self.store_database_id),
            ("USER_COLLECTION_ID", &self.user_collection_id),
            ("BANK_COLLECTION_ID", &self.bank_collection_id),
            ("PLAID_CLIENT_ID", &self.plaid_client_id),
            ("PLAID_SECRET", &self.plaid_secret),
            ("DWOLLA_KEY", &self.dwolla_key),
            ("DWOLLA_SECRET", &self.dwolla_secret),
            ("SHAREABLE_ID_SECRET", &self.shareable_id_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "HTTP_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_port: 3000,
        appwrite_endpoint: "https://cloud.appwrite.io/v1".to_string(),
        appwrite_project_id: "project".to_string(),
        appwrite_api_key: "key".to_string(),
        store_database_id: "bank-db".to_string(),
        user_collection_id: "users".to_string(),
        bank_collection_id: "banks".to_string(),
        document_backend: DocumentBackend::Appwrite,
        database_url: None,
        plaid_client_id: "plaid-client".to_string(),
        plaid_secret: "plaid-secret".to_string(),
        plaid_env: PlaidEnvironment::Sandbox,
        dwolla_key: "dwolla-key".to_string(),
        dwolla_secret: "dwolla-secret".to_string(),
        dwolla_env: DwollaEnvironment::Sandbox,
        shareable_id_secret: "shareable-secret".to_string(),
        http_timeout_secs: 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_backend_requires_database_url() {
        let mut config = test_config();
        config.document_backend = DocumentBackend::Postgres;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));

        config.database_url = Some("postgres://localhost/banking".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_collection_id_is_rejected() {
        let mut config = test_config();
        config.bank_collection_id = "  ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("BANK_COLLECTION_ID"))
        ));
    }

    #[test]
    fn environments_select_vendor_hosts() {
        assert_eq!(
            PlaidEnvironment::Production.base_url(),
            "https://production.plaid.com"
        );
        assert_eq!(
            DwollaEnvironment::Sandbox.base_url(),
            "https://api-sandbox.dwolla.com"
        );
    }
}
