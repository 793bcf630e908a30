use serde::{Deserialize, Serialize};

/// The part of an answer that is memoized per question fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub retrieved_chunks: Vec<String>,
}
