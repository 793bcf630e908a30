use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use common::{
    error::AppError,
    utils::config::{AppConfig, GenerationBackend},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decoding parameters handed to the generator on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
    pub num_beams: u8,
    pub no_repeat_ngram_size: u8,
    pub early_stopping: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 200,
            num_beams: 5,
            no_repeat_ngram_size: 2,
            early_stopping: true,
        }
    }
}

impl From<&AppConfig> for GenerationSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_output_tokens: config.max_output_tokens,
            num_beams: config.num_beams,
            no_repeat_ngram_size: config.no_repeat_ngram_size,
            early_stopping: config.early_stopping,
        }
    }
}

pub struct GenerationRequest<'a> {
    /// The budgeted prompt.
    pub prompt: &'a str,
    pub question: &'a str,
    /// Retrieved chunks, nearest first.
    pub context: &'a [String],
    pub settings: &'a GenerationSettings,
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, AppError>;
}

/// Completions body carrying the seq2seq decoding controls that OpenAI-compatible
/// model servers accept on top of the OpenAI schema.
#[derive(Debug, Serialize)]
struct BeamSearchCompletion<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    n: u8,
    best_of: u8,
    use_beam_search: bool,
    temperature: f32,
    early_stopping: bool,
    no_repeat_ngram_size: u8,
    stream: bool,
}

impl<'a> BeamSearchCompletion<'a> {
    fn new(model: &'a str, prompt: &'a str, settings: &GenerationSettings) -> Self {
        let num_beams = settings.num_beams.max(1);
        Self {
            model,
            prompt,
            max_tokens: settings.max_output_tokens,
            n: 1,
            best_of: num_beams,
            use_beam_search: num_beams > 1,
            temperature: 0.0,
            early_stopping: settings.early_stopping,
            no_repeat_ngram_size: settings.no_repeat_ngram_size,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Sequence-to-sequence model behind an OpenAI-compatible completions endpoint.
pub struct OpenAiGenerator {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, AppError> {
        let body = BeamSearchCompletion::new(&self.model, request.prompt, request.settings);

        let response: CompletionResponse = self.client.completions().create_byot(body).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| AppError::Generation("no completion choices returned".into()))?;

        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text.trim().to_string())
    }
}

/// Answer used by the extractive generator when retrieval came back empty.
pub fn no_context_answer(question: &str) -> String {
    match question.trim() {
        "" => "I could not find information about that in the university knowledge base."
            .to_string(),
        subject => format!(
            "I could not find information about \"{subject}\" in the university knowledge base."
        ),
    }
}

/// Offline generator that answers with the most relevant retrieved chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, AppError> {
        let Some(best) = request.context.first() else {
            return Ok(no_context_answer(request.question));
        };

        let limit = request.settings.max_output_tokens as usize;
        Ok(best
            .split_whitespace()
            .take(limit)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Builds the generator selected by `generation_backend`.
pub fn generator_from_config(
    config: &AppConfig,
    openai_client: Arc<Client<OpenAIConfig>>,
) -> Arc<dyn AnswerGenerator> {
    match config.generation_backend {
        GenerationBackend::OpenAI => Arc::new(OpenAiGenerator::new(
            openai_client,
            config.generation_model.clone(),
        )),
        GenerationBackend::Extractive => Arc::new(ExtractiveGenerator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockCompletions {
        reply: Value,
        received: Arc<Mutex<Vec<Value>>>,
    }

    async fn completions(
        State(mock): State<MockCompletions>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        mock.received.lock().await.push(body);
        Json(mock.reply.clone())
    }

    /// Serves `reply` from a local `/v1/completions` and records every request body.
    async fn serve_completions(reply: Value) -> (Arc<Client<OpenAIConfig>>, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/completions", post(completions))
            .with_state(MockCompletions {
                reply,
                received: received.clone(),
            });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key("test-key")
                .with_api_base(format!("http://{addr}/v1")),
        );
        (Arc::new(client), received)
    }

    fn generator(client: Arc<Client<OpenAIConfig>>) -> OpenAiGenerator {
        OpenAiGenerator::new(client, "google/flan-t5-small".to_string())
    }

    fn request<'a>(
        context: &'a [String],
        settings: &'a GenerationSettings,
    ) -> GenerationRequest<'a> {
        GenerationRequest {
            prompt: "Instruction: x Context: y Question: z",
            question: "z",
            context,
            settings,
        }
    }

    #[tokio::test]
    async fn extractive_answers_with_nearest_chunk() {
        let context = vec![
            "Library Timings: open weekdays.".to_string(),
            "Hostel: available.".to_string(),
        ];
        let settings = GenerationSettings::default();
        let answer = ExtractiveGenerator
            .generate(request(&context, &settings))
            .await
            .expect("generate");
        assert_eq!(answer, "Library Timings: open weekdays.");
    }

    #[tokio::test]
    async fn extractive_respects_output_cap() {
        let context = vec!["one two three four five".to_string()];
        let settings = GenerationSettings {
            max_output_tokens: 3,
            ..GenerationSettings::default()
        };
        let answer = ExtractiveGenerator
            .generate(request(&context, &settings))
            .await
            .expect("generate");
        assert_eq!(answer, "one two three");
    }

    #[tokio::test]
    async fn extractive_without_context_names_the_question() {
        let settings = GenerationSettings::default();
        let answer = ExtractiveGenerator
            .generate(GenerationRequest {
                prompt: "",
                question: "  Is there a swimming pool? ",
                context: &[],
                settings: &settings,
            })
            .await
            .expect("generate");
        assert_eq!(
            answer,
            "I could not find information about \"Is there a swimming pool?\" in the university knowledge base."
        );

        let answer = ExtractiveGenerator
            .generate(request(&[], &settings))
            .await
            .expect("generate");
        assert!(answer.contains("\"z\""));
        assert_eq!(
            no_context_answer(""),
            "I could not find information about that in the university knowledge base."
        );
    }

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            max_output_tokens: 64,
            num_beams: 2,
            ..AppConfig::default()
        };
        let settings = GenerationSettings::from(&config);
        assert_eq!(settings.max_output_tokens, 64);
        assert_eq!(settings.num_beams, 2);
        assert_eq!(settings.no_repeat_ngram_size, 2);
        assert!(settings.early_stopping);
        assert_eq!(
            GenerationSettings::from(&AppConfig::default()),
            GenerationSettings::default()
        );
    }

    #[tokio::test]
    async fn openai_sends_beam_search_settings_and_trims_the_answer() {
        let (client, received) = serve_completions(json!({
            "choices": [{ "text": "  The library is open until 8 PM.\n", "index": 0 }]
        }))
        .await;
        let settings = GenerationSettings::default();

        let answer = generator(client)
            .generate(request(&[], &settings))
            .await
            .expect("generate");
        assert_eq!(answer, "The library is open until 8 PM.");

        let bodies = received.lock().await;
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0],
            json!({
                "model": "google/flan-t5-small",
                "prompt": "Instruction: x Context: y Question: z",
                "max_tokens": 200,
                "n": 1,
                "best_of": 5,
                "use_beam_search": true,
                "temperature": 0.0,
                "early_stopping": true,
                "no_repeat_ngram_size": 2,
                "stream": false
            })
        );
    }

    #[tokio::test]
    async fn openai_request_follows_each_decoding_setting() {
        let (client, received) =
            serve_completions(json!({ "choices": [{ "text": "ok" }] })).await;
        let settings = GenerationSettings {
            max_output_tokens: 32,
            num_beams: 1,
            no_repeat_ngram_size: 3,
            early_stopping: false,
        };

        generator(client)
            .generate(request(&[], &settings))
            .await
            .expect("generate");

        let bodies = received.lock().await;
        let body = &bodies[0];
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["best_of"], 1);
        assert_eq!(body["use_beam_search"], false);
        assert_eq!(body["early_stopping"], false);
        assert_eq!(body["no_repeat_ngram_size"], 3);
    }

    #[tokio::test]
    async fn openai_without_choices_is_a_generation_error() {
        let (client, _received) = serve_completions(json!({ "choices": [] })).await;
        let settings = GenerationSettings::default();

        let result = generator(client).generate(request(&[], &settings)).await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }
}
