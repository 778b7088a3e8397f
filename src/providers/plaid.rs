//! Plaid adapter: link tokens, public-token exchange, accounts and
//! processor tokens.
//!
//! Every endpoint is a JSON `POST` carrying the client id and secret in the
//! body.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::Config;

use super::{Aggregator, AggregatorAccount, LinkTokenParams, ProviderError, TokenExchange};

const PROVIDER: &str = "plaid";

/// Products requested for every hosted-link session.
pub const LINK_PRODUCTS: [&str; 2] = ["auth", "transactions"];
pub const LINK_COUNTRY_CODES: [&str; 1] = ["US"];
pub const LINK_LANGUAGE: &str = "en";

/// Processor the generated processor tokens are scoped to.
pub const PROCESSOR: &str = "dwolla";

#[derive(Debug, Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct PlaidErrorBody {
    error_code: Option<String>,
    error_message: String,
    display_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<AggregatorAccount>,
}

#[derive(Debug, Deserialize)]
struct ProcessorTokenResponse {
    processor_token: String,
}

impl PlaidClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.plaid_env.base_url().to_string(),
            client_id: config.plaid_client_id.clone(),
            secret: config.plaid_secret.clone(),
        }
    }

    /// POST `body` to `path` with credentials merged in.
    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ProviderError> {
        let mut body = body;
        if let Value::Object(fields) = &mut body {
            fields.insert("client_id".to_string(), json!(self.client_id));
            fields.insert("secret".to_string(), json!(self.secret));
        }

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::http(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &raw));
        }

        response.json::<T>().await.map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

/// Build an API error from a Plaid error body, keeping the raw text when the
/// body is not the documented shape.
fn api_error(status: u16, raw: &str) -> ProviderError {
    match serde_json::from_str::<PlaidErrorBody>(raw) {
        Ok(body) => ProviderError::Api {
            provider: PROVIDER,
            status,
            code: body.error_code,
            message: body.display_message.unwrap_or(body.error_message),
        },
        Err(_) => ProviderError::Api {
            provider: PROVIDER,
            status,
            code: None,
            message: raw.to_string(),
        },
    }
}

fn link_token_body(params: &LinkTokenParams) -> Value {
    json!({
        "client_name": params.client_name,
        "products": LINK_PRODUCTS,
        "country_codes": LINK_COUNTRY_CODES,
        "language": LINK_LANGUAGE,
        "user": { "client_user_id": params.client_user_id },
    })
}

#[async_trait]
impl Aggregator for PlaidClient {
    async fn create_link_token(&self, params: &LinkTokenParams) -> Result<String, ProviderError> {
        let response: LinkTokenResponse = self
            .post("/link/token/create", link_token_body(params))
            .await?;
        Ok(response.link_token)
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<TokenExchange, ProviderError> {
        self.post(
            "/item/public_token/exchange",
            json!({ "public_token": public_token }),
        )
        .await
    }

    async fn list_accounts(
        &self,
        access_token: &str,
    ) -> Result<Vec<AggregatorAccount>, ProviderError> {
        let response: AccountsResponse = self
            .post("/accounts/get", json!({ "access_token": access_token }))
            .await?;
        Ok(response.accounts)
    }

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, ProviderError> {
        let response: ProcessorTokenResponse = self
            .post(
                "/processor/token/create",
                json!({
                    "access_token": access_token,
                    "account_id": account_id,
                    "processor": PROCESSOR,
                }),
            )
            .await?;
        Ok(response.processor_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_token_request_names_user_and_products() {
        let body = link_token_body(&LinkTokenParams {
            client_name: "Ada Lovelace".to_string(),
            client_user_id: "user-1".to_string(),
        });

        assert_eq!(body["client_name"], "Ada Lovelace");
        assert_eq!(body["user"]["client_user_id"], "user-1");
        assert_eq!(body["products"], json!(["auth", "transactions"]));
        assert_eq!(body["country_codes"], json!(["US"]));
        assert_eq!(body["language"], "en");
    }

    #[test]
    fn error_body_prefers_display_message() {
        let raw = r#"{
            "error_type": "INVALID_INPUT",
            "error_code": "INVALID_PUBLIC_TOKEN",
            "error_message": "provided public token is expired",
            "display_message": "Please link your bank again",
            "request_id": "abc"
        }"#;

        match api_error(400, raw) {
            ProviderError::Api {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("INVALID_PUBLIC_TOKEN"));
                assert_eq!(message, "Please link your bank again");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_body_is_kept() {
        let err = api_error(503, "upstream unavailable");
        assert!(matches!(
            err,
            ProviderError::Api { status: 503, ref message, .. } if message == "upstream unavailable"
        ));
    }

    #[test]
    fn accounts_decode_with_optional_fields() {
        let raw = json!({
            "accounts": [
                {
                    "account_id": "acc-1",
                    "name": "Plaid Checking",
                    "mask": "0000",
                    "type": "depository"
                },
                { "account_id": "acc-2", "name": "Plaid Saving" }
            ],
            "item": {}
        });

        let parsed: AccountsResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.accounts.len(), 2);
        assert_eq!(parsed.accounts[0].account_type.as_deref(), Some("depository"));
        assert_eq!(parsed.accounts[1].mask, None);
    }
}
