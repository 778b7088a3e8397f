//! Dwolla adapter: customers and funding sources.
//!
//! Created resources are identified by the `Location` header of the `201`
//! response. An application token is requested with client credentials
//! before each operation.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Config;

use super::{NewCustomer, Processor, ProviderError};

const PROVIDER: &str = "dwolla";

const HAL_JSON: &str = "application/vnd.dwolla.v1.hal+json";

#[derive(Debug, Clone)]
pub struct DwollaClient {
    http: reqwest::Client,
    base_url: String,
    key: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DwollaErrorBody {
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct OnDemandAuthorization {
    #[serde(rename = "_links")]
    links: Value,
}

impl DwollaClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.dwolla_env.base_url().to_string(),
            key: config.dwolla_key.clone(),
            secret: config.dwolla_secret.clone(),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .basic_auth(&self.key, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(ProviderError::http(PROVIDER))?;

        let token: TokenResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(token.access_token)
    }

    /// Authenticated HAL+JSON `POST` to an absolute URL.
    async fn post(&self, url: &str, body: &Value) -> Result<Response, ProviderError> {
        let token = self.access_token().await?;

        let request: RequestBuilder = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, HAL_JSON)
            .header(CONTENT_TYPE, HAL_JSON)
            .body(body.to_string());

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        check(response).await
    }

    /// Links returned by a fresh on-demand authorization, required when a
    /// funding source is created from a processor token.
    async fn create_on_demand_authorization(&self) -> Result<Value, ProviderError> {
        let response = self
            .post(
                &format!("{}/on-demand-authorizations", self.base_url),
                &json!({}),
            )
            .await?;

        let authorization: OnDemandAuthorization =
            response.json().await.map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(authorization.links)
    }
}

async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<DwollaErrorBody>(&raw) {
        Ok(body) => (body.code, body.message),
        Err(_) => (None, raw),
    };

    Err(ProviderError::Api {
        provider: PROVIDER,
        status: status.as_u16(),
        code,
        message,
    })
}

fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn funding_source_body(processor_token: &str, name: &str, links: Value) -> Value {
    json!({
        "name": name,
        "plaidToken": processor_token,
        "_links": links,
    })
}

#[async_trait]
impl Processor for DwollaClient {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, ProviderError> {
        let body = serde_json::to_value(customer).map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let response = self
            .post(&format!("{}/customers", self.base_url), &body)
            .await?;

        location(&response).ok_or(ProviderError::MissingLocation(PROVIDER))
    }

    async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        name: &str,
    ) -> Result<Option<String>, ProviderError> {
        let links = self.create_on_demand_authorization().await?;

        let response = self
            .post(
                &format!("{}/customers/{}/funding-sources", self.base_url, customer_id),
                &funding_source_body(processor_token, name, links),
            )
            .await?;

        Ok(location(&response))
    }

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), ProviderError> {
        self.post(funding_source_url, &json!({ "removed": true }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_serializes_in_processor_field_names() {
        let customer = NewCustomer {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            customer_type: "personal".to_string(),
            address1: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
            date_of_birth: "1990-12-10".to_string(),
            ssn: "1234".to_string(),
        };

        let body = serde_json::to_value(&customer).unwrap();
        assert_eq!(body["firstName"], "Ada");
        assert_eq!(body["type"], "personal");
        assert_eq!(body["postalCode"], "10001");
        assert_eq!(body["dateOfBirth"], "1990-12-10");
    }

    #[test]
    fn funding_source_carries_authorization_links() {
        let links = json!({
            "self": { "href": "https://api-sandbox.dwolla.com/on-demand-authorizations/1" }
        });
        let body = funding_source_body("processor-sandbox-1", "Plaid Checking", links.clone());

        assert_eq!(body["name"], "Plaid Checking");
        assert_eq!(body["plaidToken"], "processor-sandbox-1");
        assert_eq!(body["_links"], links);
    }
}
