// Share link store - Hands out tokens for a frozen set of dashboard filters
use crate::domain::filters::DashboardFilters;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedView {
    pub token: String,
    pub filters: DashboardFilters,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Links {
    by_token: HashMap<String, SharedView>,
    order: VecDeque<String>,
}

/// In-memory share links; the oldest link is evicted once `max_entries` is reached.
#[derive(Clone)]
pub struct ShareLinkStore {
    links: Arc<Mutex<Links>>,
    max_entries: usize,
}

impl ShareLinkStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            links: Arc::new(Mutex::new(Links::default())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn create(&self, filters: DashboardFilters) -> SharedView {
        let view = SharedView {
            token: Uuid::new_v4().to_string(),
            filters,
            created_at: Utc::now(),
        };

        let mut links = self.links.lock();
        while links.order.len() >= self.max_entries {
            if let Some(oldest) = links.order.pop_front() {
                links.by_token.remove(&oldest);
            }
        }
        links.order.push_back(view.token.clone());
        links.by_token.insert(view.token.clone(), view.clone());

        tracing::debug!("Created share link {}", view.token);
        view
    }

    pub fn get(&self, token: &str) -> Option<SharedView> {
        self.links.lock().by_token.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = ShareLinkStore::new(10);
        let filters = DashboardFilters {
            sdr: "Alice".to_string(),
            ..DashboardFilters::new("2025-06-01")
        };

        let view = store.create(filters.clone());
        let resolved = store.get(&view.token).unwrap();
        assert_eq!(resolved.filters, filters);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_oldest_link_is_evicted() {
        let store = ShareLinkStore::new(2);
        let first = store.create(DashboardFilters::new("2025-01-01"));
        let second = store.create(DashboardFilters::new("2025-01-02"));
        let third = store.create(DashboardFilters::new("2025-01-03"));

        assert!(store.get(&first.token).is_none());
        assert!(store.get(&second.token).is_some());
        assert!(store.get(&third.token).is_some());
    }
}
