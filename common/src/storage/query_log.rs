use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::types::query_log_entry::QueryLogEntry;

/// Append-only sink for answered questions. Nothing in request handling reads it back.
#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn append(&self, entry: QueryLogEntry);

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-lifetime log held in memory.
#[derive(Default)]
pub struct InMemoryQueryLog {
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl InMemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all entries in append order.
    pub async fn snapshot(&self) -> Vec<QueryLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl QueryLog for InMemoryQueryLog {
    async fn append(&self, entry: QueryLogEntry) {
        info!(
            entry_id = %entry.id,
            user_id = ?entry.user_id,
            response_time = entry.response_time,
            "query logged"
        );
        self.entries.lock().await.push(entry);
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
