//! Time-bounded cache of the distinct category names a user has used.
//!
//! Backs the category autocomplete: a live entry answers without touching
//! the store, expiry forces a rescan of the user's monthly summaries, and a
//! store failure degrades to a fixed fallback list so the input form is
//! never blocked.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use crate::storage::traits::SummaryStorage;

/// Categories offered when the summary scan fails.
pub const FALLBACK_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Shopping",
    "Entertainment",
    "Bills",
    "Health",
    "Other",
];

/// How long a fetched category set stays fresh.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 5 * 60;

struct CacheEntry {
    user_id: String,
    categories: BTreeSet<String>,
    last_fetched: DateTime<Utc>,
}

/// Single-entry cache: the client serves one active user at a time, so a
/// request for a different user replaces the entry wholesale.
pub struct CategoryCache {
    entry: Mutex<Option<CacheEntry>>,
    freshness_window: Duration,
    clock: Arc<dyn Clock>,
}

impl CategoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_freshness_window(clock, Duration::seconds(DEFAULT_FRESHNESS_WINDOW_SECS))
    }

    pub fn with_freshness_window(clock: Arc<dyn Clock>, freshness_window: Duration) -> Self {
        CategoryCache {
            entry: Mutex::new(None),
            freshness_window,
            clock,
        }
    }

    /// Distinct categories for the user, sorted. Serves a live same-user
    /// entry without any store access; otherwise rescans every monthly
    /// summary and repopulates. Never fails: a store error yields the
    /// fallback list.
    pub fn get_categories<S: SummaryStorage>(&self, user_id: &str, store: &S) -> Vec<String> {
        let now = self.clock.now();

        {
            let entry = self.entry.lock().unwrap();
            if let Some(cached) = entry.as_ref() {
                if cached.user_id == user_id && now - cached.last_fetched < self.freshness_window {
                    debug!("Category cache hit for user {}", user_id);
                    return cached.categories.iter().cloned().collect();
                }
            }
        }

        let categories = match store.list_summaries(user_id) {
            Ok(summaries) => {
                let mut set = BTreeSet::new();
                for (_, summary) in &summaries {
                    for category in summary.category_breakdown.keys() {
                        set.insert(category.clone());
                    }
                }
                info!(
                    "Rebuilt category cache for user {} from {} summaries ({} categories)",
                    user_id,
                    summaries.len(),
                    set.len()
                );
                set
            }
            Err(err) => {
                warn!(
                    "Category scan failed for user {}, serving fallback list: {}",
                    user_id, err
                );
                return FALLBACK_CATEGORIES.iter().map(|s| s.to_string()).collect();
            }
        };

        let result: Vec<String> = categories.iter().cloned().collect();
        let mut entry = self.entry.lock().unwrap();
        *entry = Some(CacheEntry {
            user_id: user_id.to_string(),
            categories,
            last_fetched: now,
        });
        result
    }

    /// Write-through insert of a newly used category. No-op when there is no
    /// live entry for this exact user; the next full fetch picks it up from
    /// the store.
    pub fn add_category(&self, user_id: &str, category: &str) {
        let mut entry = self.entry.lock().unwrap();
        if let Some(cached) = entry.as_mut() {
            if cached.user_id == user_id {
                if cached.categories.insert(category.to_string()) {
                    debug!("Added category '{}' to cache for user {}", category, user_id);
                }
            }
        }
    }
}
