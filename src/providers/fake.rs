//! In-memory provider doubles used by unit and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::routes::AppState;
use crate::shareable::ShareableIds;
use crate::views::ViewCache;

use super::{
    Aggregator, AggregatorAccount, Collection, Document, DocumentList, DocumentStore, Filter,
    IdentityAccount, IdentityProvider, LinkTokenParams, NewCustomer, Processor, ProviderError,
    Session, TokenExchange,
};

fn api_error(provider: &'static str, status: u16, message: &str) -> ProviderError {
    ProviderError::Api {
        provider,
        status,
        code: None,
        message: message.to_string(),
    }
}

#[derive(Debug, Clone)]
struct FakeAccount {
    id: String,
    email: String,
    password: String,
    name: String,
}

/// Accounts and sessions kept in memory.
#[derive(Debug, Default)]
pub struct FakeIdentity {
    accounts: Mutex<Vec<FakeAccount>>,
    sessions: Mutex<HashMap<String, String>>,
    counter: AtomicUsize,
}

impl FakeIdentity {
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, ProviderError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == email) {
            return Err(api_error("fake-identity", 409, "user already exists"));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let account = FakeAccount {
            id: format!("user-{n}"),
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        accounts.push(account.clone());

        Ok(IdentityAccount {
            id: account.id,
            email: account.email,
            name: account.name,
        })
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let account = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned()
            .ok_or_else(|| api_error("fake-identity", 401, "invalid credentials"))?;

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let secret = format!("secret-{n}");
        self.sessions
            .lock()
            .unwrap()
            .insert(secret.clone(), account.id.clone());

        Ok(Session {
            user_id: account.id,
            secret,
            expire: Some(Utc::now() + chrono::Duration::days(365)),
        })
    }

    async fn current_account(
        &self,
        session_secret: &str,
    ) -> Result<IdentityAccount, ProviderError> {
        let user_id = self
            .sessions
            .lock()
            .unwrap()
            .get(session_secret)
            .cloned()
            .ok_or_else(|| api_error("fake-identity", 401, "session expired"))?;

        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| IdentityAccount {
                id: a.id.clone(),
                email: a.email.clone(),
                name: a.name.clone(),
            })
            .ok_or_else(|| api_error("fake-identity", 401, "account removed"))
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), ProviderError> {
        self.sessions
            .lock()
            .unwrap()
            .remove(session_secret)
            .map(|_| ())
            .ok_or_else(|| api_error("fake-identity", 401, "session expired"))
    }

    async fn delete_account(&self, account_id: &str) -> Result<(), ProviderError> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != account_id);
        if accounts.len() == before {
            return Err(api_error("fake-identity", 404, "user not found"));
        }

        self.sessions
            .lock()
            .unwrap()
            .retain(|_, user_id| user_id != account_id);
        Ok(())
    }
}

/// Collections kept in memory; filters evaluated with [`Filter::matches`].
#[derive(Debug, Default)]
pub struct FakeStore {
    collections: Mutex<HashMap<Collection, Vec<Document>>>,
    counter: AtomicUsize,
    fail_creates: Mutex<HashMap<Collection, u16>>,
}

impl FakeStore {
    /// Make every `create_document` on `collection` fail.
    pub fn fail_creates_in(&self, collection: Collection) {
        self.fail_creates.lock().unwrap().insert(collection, 503);
    }

    /// Make every `create_document` on `collection` hit a uniqueness
    /// conflict, as when a concurrent writer got there first.
    pub fn conflict_creates_in(&self, collection: Collection) {
        self.fail_creates.lock().unwrap().insert(collection, 409);
    }

    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn create_document(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> Result<Document, ProviderError> {
        if let Some(&status) = self.fail_creates.lock().unwrap().get(&collection) {
            return Err(api_error("fake-store", status, "document was not created"));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let document = Document {
            id: format!("doc-{n}"),
            created_at: Some(Utc::now()),
            data,
        };

        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(document.clone());

        Ok(document)
    }

    async fn list_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<DocumentList, ProviderError> {
        let documents: Vec<Document> = self
            .collections
            .lock()
            .unwrap()
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(DocumentList {
            total: documents.len() as u64,
            documents,
        })
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Aggregator whose items expose a fixed account list.
///
/// Public tokens are single-use, like the real provider.
#[derive(Debug)]
pub struct FakeAggregator {
    pub accounts: Vec<AggregatorAccount>,
    used_public_tokens: Mutex<HashSet<String>>,
    pub processor_tokens_issued: AtomicUsize,
    pub fail_link_tokens: bool,
}

impl Default for FakeAggregator {
    fn default() -> Self {
        Self::with_accounts(vec![account("acc-checking", "Plaid Checking")])
    }
}

pub fn account(id: &str, name: &str) -> AggregatorAccount {
    AggregatorAccount {
        account_id: id.to_string(),
        name: name.to_string(),
        official_name: None,
        mask: Some("0000".to_string()),
        account_type: Some("depository".to_string()),
        subtype: Some("checking".to_string()),
    }
}

impl FakeAggregator {
    pub fn with_accounts(accounts: Vec<AggregatorAccount>) -> Self {
        Self {
            accounts,
            used_public_tokens: Mutex::new(HashSet::new()),
            processor_tokens_issued: AtomicUsize::new(0),
            fail_link_tokens: false,
        }
    }
}

#[async_trait]
impl Aggregator for FakeAggregator {
    async fn create_link_token(&self, params: &LinkTokenParams) -> Result<String, ProviderError> {
        if self.fail_link_tokens {
            return Err(api_error("fake-aggregator", 500, "link token unavailable"));
        }
        Ok(format!("link-sandbox-{}", params.client_user_id))
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<TokenExchange, ProviderError> {
        if !self
            .used_public_tokens
            .lock()
            .unwrap()
            .insert(public_token.to_string())
        {
            return Err(api_error("fake-aggregator", 400, "INVALID_PUBLIC_TOKEN"));
        }

        Ok(TokenExchange {
            access_token: format!("access-{public_token}"),
            item_id: format!("item-{public_token}"),
        })
    }

    async fn list_accounts(
        &self,
        _access_token: &str,
    ) -> Result<Vec<AggregatorAccount>, ProviderError> {
        Ok(self.accounts.clone())
    }

    async fn create_processor_token(
        &self,
        _access_token: &str,
        account_id: &str,
    ) -> Result<String, ProviderError> {
        self.processor_tokens_issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("processor-{account_id}"))
    }
}

/// How [`FakeProcessor::create_funding_source`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FundingOutcome {
    #[default]
    Created,
    NoLocation,
    Rejected,
}

#[derive(Debug, Default)]
pub struct FakeProcessor {
    pub funding_outcome: FundingOutcome,
    /// How many upcoming `create_customer` calls fail.
    pub failing_customer_creates: AtomicUsize,
    pub customers: Mutex<Vec<NewCustomer>>,
    pub funding_sources: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
}

impl FakeProcessor {
    pub fn answering(funding_outcome: FundingOutcome) -> Self {
        Self {
            funding_outcome,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Processor for FakeProcessor {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, ProviderError> {
        let failing = self.failing_customer_creates.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |n| n.checked_sub(1),
        );
        if failing.is_ok() {
            return Err(api_error("fake-processor", 503, "service unavailable"));
        }

        let mut customers = self.customers.lock().unwrap();
        customers.push(customer.clone());
        Ok(format!(
            "https://api-sandbox.dwolla.com/customers/cust-{}",
            customers.len()
        ))
    }

    async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        _name: &str,
    ) -> Result<Option<String>, ProviderError> {
        match self.funding_outcome {
            FundingOutcome::Created => {
                let url = format!(
                    "https://api-sandbox.dwolla.com/funding-sources/{customer_id}-{processor_token}"
                );
                self.funding_sources.lock().unwrap().push(url.clone());
                Ok(Some(url))
            }
            FundingOutcome::NoLocation => Ok(None),
            FundingOutcome::Rejected => Err(api_error("fake-processor", 400, "invalid token")),
        }
    }

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), ProviderError> {
        self.removed
            .lock()
            .unwrap()
            .push(funding_source_url.to_string());
        Ok(())
    }
}

/// Application state wired to fresh fakes, with handles kept for assertions.
pub struct Harness {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<FakeStore>,
    pub aggregator: Arc<FakeAggregator>,
    pub processor: Arc<FakeProcessor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeAggregator::default(), FakeProcessor::default())
    }

    pub fn with(aggregator: FakeAggregator, processor: FakeProcessor) -> Self {
        let identity = Arc::new(FakeIdentity::default());
        let store = Arc::new(FakeStore::default());
        let aggregator = Arc::new(aggregator);
        let processor = Arc::new(processor);

        let state = AppState {
            identity: identity.clone(),
            store: store.clone(),
            aggregator: aggregator.clone(),
            processor: processor.clone(),
            shareable_ids: ShareableIds::new("test-shareable-secret"),
            views: ViewCache::default(),
        };

        Self {
            state,
            identity,
            store,
            aggregator,
            processor,
        }
    }

    pub fn store_documents(&self, collection: Collection) -> Vec<Document> {
        self.store.documents(collection)
    }
}
