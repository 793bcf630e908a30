pub mod query_log;
pub mod response_cache;
pub mod types;
pub mod vector_index;
pub mod vector_store;
