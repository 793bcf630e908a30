use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: String,
    pub question: String,
    pub user_id: Option<String>,
    /// Seconds, as reported to the client.
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(question: String, user_id: Option<String>, response_time: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question,
            user_id,
            response_time,
            timestamp: Utc::now(),
        }
    }
}
