//! Postgres document backend.
//!
//! Stores every collection in the single `documents` table; attributes live
//! in a JSONB column and equality filters compare `data->>attribute`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;

use super::{Collection, Document, DocumentList, DocumentStore, Filter, ProviderError};

const PROVIDER: &str = "postgres";

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
    user_collection_id: String,
    bank_collection_id: String,
}

/// Row shape of the `documents` table.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            created_at: Some(row.created_at),
            data: row.data.0,
        }
    }
}

impl PgDocumentStore {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            pool,
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
}

/// Unique-index violations are conflicts (409), like a hosted store's
/// duplicate-document error; anything else is a storage failure.
fn storage_error(err: sqlx::Error) -> ProviderError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return ProviderError::Api {
                provider: PROVIDER,
                status: 409,
                code: db.constraint().map(str::to_string),
                message: db.message().to_string(),
            };
        }
    }

    ProviderError::Storage(err)
}

/// Build the `SELECT` for a collection and its equality filters.
fn select_documents<'a>(collection_id: &str, filters: &[Filter]) -> QueryBuilder<'a, Postgres> {
    let mut query =
        QueryBuilder::new("SELECT id, data, created_at FROM documents WHERE collection_id = ");
    query.push_bind(collection_id.to_string());

    for filter in filters {
        if filter.attribute == Filter::DOCUMENT_ID {
            query.push(" AND id = ").push_bind(filter.value.clone());
        } else {
            query
                .push(" AND data->>")
                .push_bind(filter.attribute.clone())
                .push(" = ")
                .push_bind(filter.value.clone());
        }
    }

    query.push(" ORDER BY created_at");
    query
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Document, ProviderError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, collection_id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data, created_at
            "#,
        )
        .bind(Uuid::new_v4().simple().to_string())
        .bind(self.collection_id(collection))
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.into())
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<DocumentList, ProviderError> {
        let mut query = select_documents(self.collection_id(collection), filters);

        let rows = query
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;

        let documents: Vec<Document> = rows.into_iter().map(Into::into).collect();

        Ok(DocumentList {
            total: documents.len() as u64,
            documents,
        })
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
