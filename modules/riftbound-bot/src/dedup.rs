// Process-local memory shared by backfill and both feeds: which items were
// already handled, and what each card name resolved to. Nothing persists
// across restarts.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;

use crate::tags::normalize;

/// Fullnames of items already handled in this process.
#[derive(Default)]
pub struct ProcessedSet {
    ids: Mutex<HashSet<String>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per id: the first caller marks it and gets to
    /// process it.
    pub fn should_process(&self, item_id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(item_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized card name → composed reply text.
#[derive(Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, card_name: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&normalize(card_name)).cloned()
    }

    /// Return the cached reply for `card_name`, or run `resolve` with the
    /// trimmed name and cache its result.
    ///
    /// The lock is released while `resolve` runs, so two tasks missing on the
    /// same name at once may both resolve it. Both produce the same text.
    pub async fn get_or_resolve<F, Fut>(&self, card_name: &str, resolve: F) -> String
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = String>,
    {
        let key = normalize(card_name);
        if let Some(hit) = self.get(&key) {
            return hit;
        }

        let message = resolve(card_name.trim().to_string()).await;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert(message).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn should_process_is_true_once() {
        let seen = ProcessedSet::new();
        assert!(seen.should_process("t3_abc"));
        assert!(!seen.should_process("t3_abc"));
        assert!(seen.should_process("t1_abc"));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn concurrent_claims_admit_one_winner() {
        let seen = Arc::new(ProcessedSet::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = seen.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if seen.should_process("t1_same") {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_key_ignores_case_and_whitespace() {
        let cache = ResolutionCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_resolve("Jinx", |name| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { format!("{name}\n\nImage: https://img") }
            })
            .await;
        let second = cache
            .get_or_resolve(" jinx ", |name| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { format!("{name}\n\nImage: other") }
            })
            .await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_miss_keeps_first_stored_reply() {
        let cache = ResolutionCache::new();
        // Another task stores "Jinx" while this resolve is still in flight.
        let message = cache
            .get_or_resolve("Jinx", |_| async {
                cache
                    .get_or_resolve("jinx", |_| async { "first".to_string() })
                    .await;
                "second".to_string()
            })
            .await;
        assert_eq!(message, "first");
        assert_eq!(cache.get("JINX").as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn resolver_sees_trimmed_original_casing() {
        let cache = ResolutionCache::new();
        let message = cache
            .get_or_resolve("  Teemo, Scout ", |name| async move { name })
            .await;
        assert_eq!(message, "Teemo, Scout");
        assert_eq!(cache.get("teemo, scout").as_deref(), Some("Teemo, Scout"));
    }
}
