//! Appwrite adapter: identity (accounts, sessions) and hosted documents.
//!
//! Admin calls carry the project API key; calls made on behalf of a user
//! carry the session secret instead, so the provider resolves "current" to
//! that user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::config::Config;

use super::{
    Collection, Document, DocumentList, DocumentStore, Filter, IdentityAccount, IdentityProvider,
    ProviderError, Session,
};

const PROVIDER: &str = "appwrite";

/// Ask the provider to generate an id.
const UNIQUE_ID: &str = "unique()";

#[derive(Debug, Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: String,
    database_id: String,
    user_collection_id: String,
    bank_collection_id: String,
}

/// Error body returned by every Appwrite endpoint.
#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocumentList {
    total: u64,
    documents: Vec<Value>,
}

impl AppwriteClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.appwrite_endpoint.trim_end_matches('/').to_string(),
            project_id: config.appwrite_project_id.clone(),
            api_key: config.appwrite_api_key.clone(),
            database_id: config.store_database_id.clone(),
            user_collection_id: config.user_collection_id.clone(),
            bank_collection_id: config.bank_collection_id.clone(),
        }
    }

    fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.user_collection_id,
            Collection::Banks => &self.bank_collection_id,
        }
    }

    fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint,
            self.database_id,
            self.collection_id(collection)
        )
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    fn as_session(&self, builder: RequestBuilder, session_secret: &str) -> RequestBuilder {
        builder
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Session", session_secret)
    }
}

/// Turn a non-success response into `ProviderError::Api`.
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<AppwriteErrorBody>(&body) {
        Ok(parsed) => (parsed.kind, parsed.message),
        Err(_) => (None, body),
    };

    Err(ProviderError::Api {
        provider: PROVIDER,
        status: status.as_u16(),
        code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    check(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })
}

/// Split an Appwrite document into id, creation time and user attributes.
///
/// System attributes (`$id`, `$createdAt`, `$collectionId`, ...) are dropped
/// from the attribute map.
pub(crate) fn document_from_value(value: Value) -> Result<Document, ProviderError> {
    let Value::Object(mut fields) = value else {
        return Err(ProviderError::Decode {
            provider: PROVIDER,
            message: "document is not an object".to_string(),
        });
    };

    let id = match fields.remove("$id") {
        Some(Value::String(id)) => id,
        _ => {
            return Err(ProviderError::Decode {
                provider: PROVIDER,
                message: "document has no $id".to_string(),
            });
        }
    };

    let created_at = fields
        .get("$createdAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    fields.retain(|key, _| !key.starts_with('$'));

    Ok(Document {
        id,
        created_at,
        data: fields,
    })
}

/// Appwrite query string for an equality filter.
pub(crate) fn equal_query(filter: &Filter) -> String {
    json!({
        "method": "equal",
        "attribute": filter.attribute,
        "values": [filter.value],
    })
    .to_string()
}

#[async_trait]
impl IdentityProvider for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, ProviderError> {
        let request = self
            .admin(self.http.post(format!("{}/account", self.endpoint)))
            .json(&json!({
                "userId": UNIQUE_ID,
                "email": email,
                "password": password,
                "name": name,
            }));

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        decode(response).await
    }

    async fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let request = self
            .admin(
                self.http
                    .post(format!("{}/account/sessions/email", self.endpoint)),
            )
            .json(&json!({ "email": email, "password": password }));

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        decode(response).await
    }

    async fn current_account(
        &self,
        session_secret: &str,
    ) -> Result<IdentityAccount, ProviderError> {
        let request = self.as_session(
            self.http.get(format!("{}/account", self.endpoint)),
            session_secret,
        );

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        decode(response).await
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), ProviderError> {
        let request = self.as_session(
            self.http
                .delete(format!("{}/account/sessions/current", self.endpoint)),
            session_secret,
        );

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        check(response).await?;
        Ok(())
    }

    async fn delete_account(&self, account_id: &str) -> Result<(), ProviderError> {
        let url = format!("{}/users/{}", self.endpoint, account_id);
        let request = self.admin(self.http.delete(url));

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Document, ProviderError> {
        let request = self
            .admin(self.http.post(self.documents_url(collection)))
            .json(&json!({ "documentId": UNIQUE_ID, "data": data }));

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        let raw: Value = decode(response).await?;
        document_from_value(raw)
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<DocumentList, ProviderError> {
        let queries: Vec<(&str, String)> = filters
            .iter()
            .map(|filter| ("queries[]", equal_query(filter)))
            .collect();

        let request = self
            .admin(self.http.get(self.documents_url(collection)))
            .query(&queries);

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        let raw: RawDocumentList = decode(response).await?;

        let documents = raw
            .documents
            .into_iter()
            .map(document_from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentList {
            total: raw.total,
            documents,
        })
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let request = self.admin(
            self.http
                .get(format!("{}/databases/{}", self.endpoint, self.database_id)),
        );

        let response = request.send().await.map_err(ProviderError::http(PROVIDER))?;
        check(response).await?;
        Ok(())
    }
}
