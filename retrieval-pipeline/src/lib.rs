pub mod generation;
pub mod knowledge_base;
pub mod prompt;

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use common::{
    error::AppError,
    storage::types::answer_payload::AnswerPayload,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use tracing::{debug, instrument};

use generation::{generator_from_config, AnswerGenerator, GenerationRequest, GenerationSettings};
use knowledge_base::KnowledgeBase;
use prompt::{build_prompt, PromptBudget};

/// Fixed answer metadata and retrieval depth.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub instruction: String,
    pub sources: Vec<String>,
    /// Reported as-is; not derived from the model output.
    pub confidence: f64,
}

impl From<&AppConfig> for AnswerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.top_k,
            instruction: config.prompt_instruction.clone(),
            sources: config.answer_sources.clone(),
            confidence: config.answer_confidence,
        }
    }
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Embeds a question, retrieves the nearest chunks and generates an answer from them.
pub struct AnswerPipeline {
    embedding_provider: Arc<EmbeddingProvider>,
    knowledge: KnowledgeBase,
    generator: Arc<dyn AnswerGenerator>,
    budget: PromptBudget,
    answer_settings: AnswerSettings,
    generation_settings: GenerationSettings,
}

impl AnswerPipeline {
    pub fn new(
        embedding_provider: Arc<EmbeddingProvider>,
        knowledge: KnowledgeBase,
        generator: Arc<dyn AnswerGenerator>,
        budget: PromptBudget,
        answer_settings: AnswerSettings,
        generation_settings: GenerationSettings,
    ) -> Self {
        Self {
            embedding_provider,
            knowledge,
            generator,
            budget,
            answer_settings,
            generation_settings,
        }
    }

    /// Loads the knowledge base, prompt budget and generator described by `config`.
    pub async fn from_config(
        config: &AppConfig,
        embedding_provider: Arc<EmbeddingProvider>,
        openai_client: Arc<Client<OpenAIConfig>>,
    ) -> Result<Self, AppError> {
        let knowledge = KnowledgeBase::from_config(config, &embedding_provider).await?;
        let budget = PromptBudget::from_config(config).await?;
        let generator = generator_from_config(config, openai_client);

        Ok(Self::new(
            embedding_provider,
            knowledge,
            generator,
            budget,
            AnswerSettings::from(config),
            GenerationSettings::from(config),
        ))
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Chunk texts nearest to `question`, at most `top_k` of them.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>, AppError> {
        let embedding = self.embedding_provider.embed(question).await?;
        self.knowledge
            .nearest_chunks(&embedding, self.answer_settings.top_k)
    }

    #[instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Result<AnswerPayload, AppError> {
        let retrieved_chunks = self.retrieve(question).await?;
        debug!(retrieved = retrieved_chunks.len(), "chunks retrieved");

        let prompt = build_prompt(
            &self.answer_settings.instruction,
            &retrieved_chunks,
            question,
        );
        let prompt = self.budget.truncate(&prompt)?;

        let answer = self
            .generator
            .generate(GenerationRequest {
                prompt: &prompt,
                question,
                context: &retrieved_chunks,
                settings: &self.generation_settings,
            })
            .await?;

        Ok(AnswerPayload {
            answer,
            sources: self.answer_settings.sources.clone(),
            confidence: self.answer_settings.confidence,
            retrieved_chunks,
        })
    }
}
