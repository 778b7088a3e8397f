//! Cached page views.
//!
//! The home view (`/`) is built from the user's profile and bank records.
//! Entries are keyed by path and user; [`ViewCache::revalidate_path`] drops
//! every entry of a path so the next request rebuilds it, which is how a
//! freshly linked bank shows up on the home page.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::bank::BankAccountResponse;
use crate::models::user::UserResponse;

pub const HOME_PATH: &str = "/";

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeView {
    pub user: UserResponse,
    pub banks: Vec<BankAccountResponse>,
    pub total_banks: usize,
}

impl HomeView {
    pub fn new(user: UserResponse, banks: Vec<BankAccountResponse>) -> Self {
        Self {
            total_banks: banks.len(),
            user,
            banks,
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    /// Bumped by every revalidation.
    generation: u64,
    views: HashMap<(String, String), HomeView>,
}

/// Views are built outside the lock, so a builder captures
/// [`ViewCache::generation`] before reading and [`ViewCache::put`] refuses
/// the view if a revalidation happened in between.
#[derive(Debug, Clone, Default)]
pub struct ViewCache {
    entries: Arc<RwLock<Entries>>,
}

impl ViewCache {
    pub async fn get(&self, path: &str, user_id: &str) -> Option<HomeView> {
        self.entries
            .read()
            .await
            .views
            .get(&(path.to_string(), user_id.to_string()))
            .cloned()
    }

    pub async fn generation(&self) -> u64 {
        self.entries.read().await.generation
    }

    /// Cache a view built from data read at `generation`.
    ///
    /// Returns `false` (and caches nothing) when the cache was revalidated
    /// since.
    pub async fn put(&self, path: &str, user_id: &str, generation: u64, view: HomeView) -> bool {
        let mut entries = self.entries.write().await;
        if entries.generation != generation {
            tracing::debug!(path, user_id, "Discarding view built before revalidation");
            return false;
        }

        entries.views.insert((path.to_string(), user_id.to_string()), view);
        true
    }

    /// Drop every cached view of `path`. Returns how many were dropped.
    pub async fn revalidate_path(&self, path: &str) -> usize {
        let mut entries = self.entries.write().await;
        entries.generation += 1;

        let before = entries.views.len();
        entries.views.retain(|(cached_path, _), _| cached_path != path);
        let dropped = before - entries.views.len();

        tracing::debug!(path, dropped, "Revalidated cached views");
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(user_id: &str) -> HomeView {
        HomeView::new(
            UserResponse {
                id: format!("doc-{user_id}"),
                user_id: user_id.to_string(),
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                processor_customer_id: "cust-1".to_string(),
            },
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn revalidation_drops_only_the_given_path() {
        let cache = ViewCache::default();
        let generation = cache.generation().await;
        assert!(cache.put(HOME_PATH, "u-1", generation, view("u-1")).await);
        assert!(cache.put(HOME_PATH, "u-2", generation, view("u-2")).await);
        assert!(cache.put("/banks", "u-1", generation, view("u-1")).await);

        assert_eq!(cache.revalidate_path(HOME_PATH).await, 2);
        assert!(cache.get(HOME_PATH, "u-1").await.is_none());
        assert!(cache.get("/banks", "u-1").await.is_some());
    }

    #[tokio::test]
    async fn view_built_before_revalidation_is_not_cached() {
        let cache = ViewCache::default();
        let generation = cache.generation().await;

        cache.revalidate_path(HOME_PATH).await;

        assert!(!cache.put(HOME_PATH, "u-1", generation, view("u-1")).await);
        assert!(cache.get(HOME_PATH, "u-1").await.is_none());

        let fresh = cache.generation().await;
        assert!(cache.put(HOME_PATH, "u-1", fresh, view("u-1")).await);
        assert!(cache.get(HOME_PATH, "u-1").await.is_some());
    }
}
