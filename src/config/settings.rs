//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! sessions.  Every section is `#[serde(default)]` so a partial
//! `settings.toml` only overrides the keys it names.
//!
//! Credentials are deliberately absent here; see
//! [`Credentials`](crate::config::Credentials).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the OpenAI-compatible translation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the API endpoint; `/chat/completions` is appended.
    ///
    /// - DeepSeek default: `https://api.deepseek.com`
    /// - OpenAI: `https://api.openai.com/v1`
    pub base_url: String,
    /// Model identifier sent to the API (e.g. `"deepseek-chat"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).  Lower = more literal translations.
    pub temperature: f32,
    /// Upper bound on generated tokens per translation.
    pub max_tokens: u32,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            model: "deepseek-chat".into(),
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted speech recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub base_url: String,
    /// Recognition model (e.g. `"ink-whisper"`).
    pub model: String,
    /// Source-language hint as an ISO-639-1 code.
    pub language: String,
    /// Value of the `Cartesia-Version` header.
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cartesia.ai".into(),
            model: "ink-whisper".into(),
            language: "zh".into(),
            api_version: "2025-04-16".into(),
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted speech synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    /// Synthesis model (e.g. `"sonic-2"`).
    pub model: String,
    /// Voice identifier used for every spoken translation.
    pub voice_id: String,
    /// Language of the text being spoken.
    pub language: String,
    /// Output sample rate of the raw PCM stream in Hz.
    pub sample_rate: u32,
    /// Value of the `Cartesia-Version` header.
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cartesia.ai".into(),
            model: "sonic-2".into(),
            voice_id: "6f84f4b8-58a2-430c-8c79-688dad597532".into(),
            language: "en".into(),
            sample_rate: 24_000,
            api_version: "2025-04-16".into(),
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Language pair of the translator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Language the user speaks.
    pub source_language: String,
    /// Fixed language tag put on every translation request.
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: "zh".into(),
            target_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Per-user session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Speak a short self-introduction when a user joins.
    pub greeting: bool,
    /// Capacity of each session's event queue.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: true,
            event_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Where room events come from and where synthesized audio goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP address the production mode listens on.
    pub listen_addr: String,
    /// Directory for synthesized audio.  `None` means
    /// [`AppPaths::output_dir`].
    pub output_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7880".into(),
            output_dir: None,
        }
    }
}

impl TransportConfig {
    /// The configured output directory, or the platform default.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().output_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_translator::config::AppConfig;
///
/// // Default when the file is missing
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.translation.target_language, "en");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Translation model settings.
    pub llm: LlmConfig,
    /// Speech recognizer settings.
    pub stt: SttConfig,
    /// Speech synthesizer settings.
    pub tts: TtsConfig,
    /// Source / target language pair.
    pub translation: TranslationConfig,
    /// Per-user session settings.
    pub session: SessionConfig,
    /// Room event source and audio output.
    pub transport: TransportConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Apply endpoint overrides from the environment (`LLM_BASE_URL`,
    /// `CARTESIA_BASE_URL`).  Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = non_empty("CARTESIA_BASE_URL") {
            self.stt.base_url = url.clone();
            self.tts.base_url = url;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn save_to(config: &AppConfig, path: &Path) {
        std::fs::write(path, toml::to_string_pretty(config).unwrap()).unwrap();
    }

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        save_to(&original, &path);

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.llm.base_url, loaded.llm.base_url);
        assert_eq!(original.llm.model, loaded.llm.model);
        assert_eq!(original.llm.max_tokens, loaded.llm.max_tokens);
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.tts.voice_id, loaded.tts.voice_id);
        assert_eq!(original.tts.sample_rate, loaded.tts.sample_rate);
        assert_eq!(
            original.translation.target_language,
            loaded.translation.target_language
        );
        assert_eq!(original.session.greeting, loaded.session.greeting);
        assert_eq!(original.transport.listen_addr, loaded.transport.listen_addr);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.stt.language, "zh");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.llm.base_url, "https://api.deepseek.com");
        assert_eq!(cfg.llm.model, "deepseek-chat");
        assert_eq!(cfg.stt.model, "ink-whisper");
        assert_eq!(cfg.tts.voice_id, "6f84f4b8-58a2-430c-8c79-688dad597532");
        assert_eq!(cfg.translation.source_language, "zh");
        assert_eq!(cfg.translation.target_language, "en");
        assert!(cfg.session.greeting);
        assert!(cfg.transport.output_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[llm]\nmodel = \"gpt-4o-mini\"\n\n[session]\ngreeting = false\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.base_url, "https://api.deepseek.com");
        assert!(!cfg.session.greeting);
        assert_eq!(cfg.session.event_buffer, 64);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[llm\nmodel = ").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_replace_endpoints() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|name| match name {
            "LLM_BASE_URL" => Some("http://localhost:8000/v1".into()),
            "CARTESIA_BASE_URL" => Some("http://localhost:9000".into()),
            _ => None,
        });

        assert_eq!(cfg.llm.base_url, "http://localhost:8000/v1");
        assert_eq!(cfg.stt.base_url, "http://localhost:9000");
        assert_eq!(cfg.tts.base_url, "http://localhost:9000");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|_| Some("   ".into()));
        assert_eq!(cfg.llm.base_url, "https://api.deepseek.com");
    }

    #[test]
    fn explicit_output_dir_wins() {
        let transport = TransportConfig {
            output_dir: Some(PathBuf::from("/tmp/speech")),
            ..TransportConfig::default()
        };
        assert_eq!(transport.resolved_output_dir(), PathBuf::from("/tmp/speech"));
    }
}
