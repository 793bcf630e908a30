pub mod answer_payload;
pub mod query_log_entry;
