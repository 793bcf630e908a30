use std::{path::Path, sync::Arc};

use common::{error::AppError, utils::config::AppConfig};
use tokenizers::Tokenizer;
use tracing::debug;

/// Joins retrieved chunks into one context string and wraps it in the instruction template.
pub fn build_prompt(instruction: &str, retrieved_chunks: &[String], question: &str) -> String {
    let context = retrieved_chunks.join(" ");
    format!("Instruction: {instruction} Context: {context} Question: {question}")
}

/// Limits prompts to the generator's input window.
///
/// Truncation keeps the head of the prompt, so an overlong context can push the
/// question out of the window.
#[derive(Clone)]
pub enum PromptBudget {
    Tokenizer {
        tokenizer: Arc<Tokenizer>,
        max_tokens: usize,
    },
    CharEstimate {
        max_tokens: usize,
        avg_chars_per_token: usize,
    },
}

impl std::fmt::Debug for PromptBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokenizer { max_tokens, .. } => f
                .debug_struct("Tokenizer")
                .field("max_tokens", max_tokens)
                .finish_non_exhaustive(),
            Self::CharEstimate {
                max_tokens,
                avg_chars_per_token,
            } => f
                .debug_struct("CharEstimate")
                .field("max_tokens", max_tokens)
                .field("avg_chars_per_token", avg_chars_per_token)
                .finish(),
        }
    }
}

impl PromptBudget {
    pub fn char_estimate(max_tokens: usize, avg_chars_per_token: usize) -> Self {
        Self::CharEstimate {
            max_tokens,
            avg_chars_per_token: avg_chars_per_token.max(1),
        }
    }

    /// Uses the configured tokenizer when one is set, otherwise the character estimate.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let Some(source) = config.tokenizer.clone() else {
            return Ok(Self::char_estimate(
                config.max_input_tokens,
                config.avg_chars_per_token,
            ));
        };

        let tokenizer = tokio::task::spawn_blocking(move || load_tokenizer(&source)).await??;
        Ok(Self::Tokenizer {
            tokenizer: Arc::new(tokenizer),
            max_tokens: config.max_input_tokens,
        })
    }

    pub fn truncate(&self, prompt: &str) -> Result<String, AppError> {
        match self {
            Self::Tokenizer {
                tokenizer,
                max_tokens,
            } => {
                let encoding = tokenizer
                    .encode(prompt, false)
                    .map_err(|e| AppError::Tokenizer(e.to_string()))?;
                let offsets = encoding.get_offsets();
                if offsets.len() <= *max_tokens {
                    return Ok(prompt.to_string());
                }
                let end = max_tokens
                    .checked_sub(1)
                    .and_then(|last| offsets.get(last))
                    .map_or(0, |(_, end)| *end);
                debug!(
                    tokens = offsets.len(),
                    max_tokens, "prompt truncated to token budget"
                );
                Ok(prompt.get(..end).unwrap_or(prompt).to_string())
            }
            Self::CharEstimate {
                max_tokens,
                avg_chars_per_token,
            } => {
                let max_chars = max_tokens.saturating_mul(*avg_chars_per_token);
                match prompt.char_indices().nth(max_chars) {
                    Some((byte_end, _)) => {
                        debug!(max_chars, "prompt truncated to character budget");
                        Ok(prompt.get(..byte_end).unwrap_or(prompt).to_string())
                    }
                    None => Ok(prompt.to_string()),
                }
            }
        }
    }
}

fn load_tokenizer(source: &str) -> Result<Tokenizer, AppError> {
    let result = if Path::new(source).is_file() {
        Tokenizer::from_file(source)
    } else {
        Tokenizer::from_pretrained(source, None)
    };
    result.map_err(|e| AppError::Tokenizer(format!("failed to load tokenizer '{source}': {e}")))
}
