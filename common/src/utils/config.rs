use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::embedding::EmbeddingBackend;

/// Which generator answers questions. `openai` needs a completions endpoint serving
/// `generation_model`; `extractive` runs offline.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    OpenAI,
    #[default]
    Extractive,
}

/// Where the runtime knowledge base comes from.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    /// The FAQ chunk list compiled into the retrieval pipeline.
    #[default]
    Builtin,
    /// Artifacts written by the `ingest` binary into `vector_store_dir`.
    VectorStore,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default)]
    pub generation_backend: GenerationBackend,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// Path to a `tokenizer.json` or a hub identifier used for prompt budgeting.
    #[serde(default)]
    pub tokenizer: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
    #[serde(default = "default_avg_chars_per_token")]
    pub avg_chars_per_token: usize,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_num_beams")]
    pub num_beams: u8,
    #[serde(default = "default_no_repeat_ngram_size")]
    pub no_repeat_ngram_size: u8,
    #[serde(default = "default_true")]
    pub early_stopping: bool,
    #[serde(default = "default_prompt_instruction")]
    pub prompt_instruction: String,
    #[serde(default = "default_answer_sources")]
    pub answer_sources: Vec<String>,
    #[serde(default = "default_answer_confidence")]
    pub answer_confidence: f64,
    #[serde(default)]
    pub knowledge_source: KnowledgeSource,
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    #[serde(default = "default_vector_store_dir")]
    pub vector_store_dir: String,
    /// Maximum number of cached answers; unbounded when unset.
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    /// When false, 500 responses carry a generic message instead of the error text.
    #[serde(default = "default_true")]
    pub expose_error_details: bool,
}

fn default_http_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_dimensions() -> u32 {
    384
}

fn default_generation_model() -> String {
    "google/flan-t5-small".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_max_input_tokens() -> usize {
    512
}

fn default_avg_chars_per_token() -> usize {
    4
}

fn default_max_output_tokens() -> u32 {
    200
}

fn default_num_beams() -> u8 {
    5
}

fn default_no_repeat_ngram_size() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

fn default_prompt_instruction() -> String {
    "Provide a detailed and helpful answer about Iqra University using the context.".to_string()
}

fn default_answer_sources() -> Vec<String> {
    vec!["Official University Database".to_string()]
}

fn default_answer_confidence() -> f64 {
    0.92
}

fn default_documents_dir() -> String {
    "documents".to_string()
}

fn default_vector_store_dir() -> String {
    "vector_store".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: None,
            embedding_dimensions: default_embedding_dimensions(),
            generation_backend: GenerationBackend::default(),
            generation_model: default_generation_model(),
            tokenizer: None,
            top_k: default_top_k(),
            max_input_tokens: default_max_input_tokens(),
            avg_chars_per_token: default_avg_chars_per_token(),
            max_output_tokens: default_max_output_tokens(),
            num_beams: default_num_beams(),
            no_repeat_ngram_size: default_no_repeat_ngram_size(),
            early_stopping: true,
            prompt_instruction: default_prompt_instruction(),
            answer_sources: default_answer_sources(),
            answer_confidence: default_answer_confidence(),
            knowledge_source: KnowledgeSource::default(),
            documents_dir: default_documents_dir(),
            vector_store_dir: default_vector_store_dir(),
            cache_capacity: None,
            expose_error_details: true,
        }
    }
}

impl AppConfig {
    /// True when a backend that talks to the OpenAI-compatible endpoint is selected
    /// but no API key is configured.
    pub fn openai_key_missing(&self) -> bool {
        let uses_openai = self.generation_backend == GenerationBackend::OpenAI
            || self.embedding_backend == EmbeddingBackend::OpenAI;
        uses_openai && self.openai_api_key.trim().is_empty()
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
