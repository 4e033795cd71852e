//! Language-model translation for the voice translator.
//!
//! This module provides:
//! * [`Translator`]: async trait implemented by every translation backend.
//! * [`ApiTranslator`]: OpenAI-compatible chat-completions client.
//! * [`PromptBuilder`]: fixed system instruction + per-utterance user message.
//! * [`TranslationRequest`] / [`TranslationResult`]: the unit of work.
//! * [`LlmError`]: error variants for model calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_translator::config::LlmConfig;
//! use voice_translator::llm::{ApiTranslator, PromptBuilder, TranslationRequest, Translator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let translator = ApiTranslator::new(
//!         &LlmConfig::default(),
//!         "sk-…",
//!         PromptBuilder::new("zh", "en"),
//!     );
//!
//!     let request = TranslationRequest {
//!         source_text: "你好".into(),
//!         target_language: "en".into(),
//!     };
//!     let result = translator.translate(&request).await.unwrap();
//!     println!("{}", result.translated_text);
//! }
//! ```

pub mod prompt;
pub mod translator;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use prompt::PromptBuilder;
pub use translator::{ApiTranslator, LlmError, TranslationRequest, TranslationResult, Translator};
