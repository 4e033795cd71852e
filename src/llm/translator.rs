//! Core `Translator` trait and `ApiTranslator` implementation.
//!
//! `ApiTranslator` calls any OpenAI-compatible `/chat/completions` endpoint
//! (DeepSeek, OpenAI, Groq, vLLM, …).  Every call is a single-shot
//! system + user exchange; no history is kept between utterances.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::prompt::PromptBuilder;
use crate::metrics::{TokenUsage, UsageCollector};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// One unit of work for the translator, derived from a final utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_text: String,
    /// Fixed for the lifetime of the process (e.g. `"en"`).
    pub target_language: String,
}

/// The translator's answer to one [`TranslationRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
}

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the translation model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("LLM endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The response carried no message content at all.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async interface to the language-model collaborator.
///
/// Implementors must be `Send + Sync` so they can be shared by every session
/// behind an `Arc<dyn Translator>`.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one finalized utterance.
    async fn translate(&self, request: &TranslationRequest)
        -> Result<TranslationResult, LlmError>;

    /// Produce the short self-introduction spoken when a user joins.
    async fn greeting(&self) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// ApiTranslator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/chat/completions` endpoint.
///
/// Connection details come from [`LlmConfig`]; the bearer token comes from
/// [`Credentials`](crate::config::Credentials).
pub struct ApiTranslator {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
    prompt_builder: PromptBuilder,
    usage: Option<Arc<UsageCollector>>,
}

impl ApiTranslator {
    /// Build an `ApiTranslator` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>, prompt_builder: PromptBuilder) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
            prompt_builder,
            usage: None,
        }
    }

    /// Report token usage of every call to `usage`.
    pub fn with_usage(mut self, usage: Arc<UsageCollector>) -> Self {
        self.usage = Some(usage);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, system_msg: &str, user_msg: &str) -> Result<String, LlmError> {
        let body = chat_body(&self.config, system_msg, user_msg);

        let mut req = self.client.post(self.endpoint()).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let (text, usage) = parse_chat_completion(&json)?;
        if let Some(collector) = &self.usage {
            collector.record_llm(usage);
        }
        Ok(text)
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.build_translation(&request.source_text);
        let translated_text = self.complete(&system_msg, &user_msg).await?;
        Ok(TranslationResult { translated_text })
    }

    async fn greeting(&self) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.build_greeting();
        self.complete(&system_msg, &user_msg).await
    }
}

/// JSON body of a non-streaming chat-completions request.
pub(crate) fn chat_body(config: &LlmConfig, system_msg: &str, user_msg: &str) -> serde_json::Value {
    serde_json::json!({
        "model":       config.model,
        "messages": [
            { "role": "system", "content": system_msg },
            { "role": "user",   "content": user_msg   }
        ],
        "stream":      false,
        "temperature": config.temperature,
        "max_tokens":  config.max_tokens
    })
}

/// Extract the first choice's content (trimmed) and the reported usage.
///
/// Missing content is [`LlmError::EmptyResponse`].  Blank content is returned
/// as an empty string: the turn controller owns the empty-translation guard.
pub(crate) fn parse_chat_completion(
    json: &serde_json::Value,
) -> Result<(String, Option<TokenUsage>), LlmError> {
    if let Some(message) = json["error"]["message"].as_str() {
        return Err(LlmError::Parse(message.to_string()));
    }

    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyResponse)?
        .trim()
        .to_string();

    let usage = json.get("usage").and_then(|u| {
        Some(TokenUsage {
            prompt_tokens: u["prompt_tokens"].as_u64()?,
            completion_tokens: u["completion_tokens"].as_u64()?,
        })
    });

    Ok((text, usage))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_translator(base_url: &str) -> ApiTranslator {
        let config = LlmConfig {
            base_url: base_url.into(),
            ..LlmConfig::default()
        };
        ApiTranslator::new(&config, "sk-test", PromptBuilder::new("zh", "en"))
    }

    #[test]
    fn endpoint_appends_chat_completions() {
        assert_eq!(
            make_translator("https://api.deepseek.com").endpoint(),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            make_translator("http://localhost:8000/v1/").endpoint(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn body_carries_model_and_messages() {
        let config = LlmConfig::default();
        let body = chat_body(&config, "system", "你好");

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "你好");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn parses_content_and_usage() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Hello \n" } }],
            "usage": { "prompt_tokens": 31, "completion_tokens": 2, "total_tokens": 33 }
        });
        let (text, usage) = parse_chat_completion(&json).unwrap();
        assert_eq!(text, "Hello");
        assert_eq!(
            usage,
            Some(TokenUsage {
                prompt_tokens: 31,
                completion_tokens: 2
            })
        );
    }

    #[test]
    fn missing_usage_is_none() {
        let json = json!({ "choices": [{ "message": { "content": "Hi" } }] });
        let (_, usage) = parse_chat_completion(&json).unwrap();
        assert!(usage.is_none());
    }

    #[test]
    fn blank_content_is_returned_as_empty_text() {
        let json = json!({ "choices": [{ "message": { "content": "   " } }] });
        let (text, _) = parse_chat_completion(&json).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn no_choices_is_empty_response() {
        assert_eq!(
            parse_chat_completion(&json!({ "choices": [] })),
            Err(LlmError::EmptyResponse)
        );
    }

    #[test]
    fn error_object_is_reported() {
        let json = json!({ "error": { "message": "invalid api key" } });
        assert_eq!(
            parse_chat_completion(&json),
            Err(LlmError::Parse("invalid api key".into()))
        );
    }

    #[test]
    fn translator_is_object_safe() {
        let translator: Box<dyn Translator> = Box::new(make_translator("http://localhost"));
        drop(translator);
    }
}
