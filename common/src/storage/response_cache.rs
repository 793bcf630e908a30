use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::types::answer_payload::AnswerPayload;

/// Exact-match memoization of answers keyed by question fingerprint.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<AnswerPayload>;

    async fn put(&self, key: String, value: AnswerPayload);

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, AnswerPayload>,
    insertion_order: VecDeque<String>,
}

/// Process-lifetime cache held in memory.
///
/// Without a capacity the cache only grows. With `Some(n)` the oldest insertion is
/// evicted once more than `n` entries are held; `Some(0)` stores nothing.
pub struct InMemoryResponseCache {
    capacity: Option<usize>,
    state: Mutex<CacheState>,
}

impl InMemoryResponseCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<AnswerPayload> {
        let guard = self.state.lock().await;
        guard.entries.get(key).cloned()
    }

    async fn put(&self, key: String, value: AnswerPayload) {
        if self.capacity == Some(0) {
            return;
        }

        let mut guard = self.state.lock().await;
        // Racing misses on the same key overwrite; the key keeps its original slot.
        if guard.entries.insert(key.clone(), value).is_none() {
            guard.insertion_order.push_back(key);
        }

        if let Some(capacity) = self.capacity {
            while guard.entries.len() > capacity {
                let Some(oldest) = guard.insertion_order.pop_front() else {
                    break;
                };
                guard.entries.remove(&oldest);
                debug!(key = %oldest, "evicted cached answer");
            }
        }
    }

    async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}
