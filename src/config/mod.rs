//! Configuration module for the voice translator.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each external
//! collaborator, `Credentials` read from the environment, `AppPaths` for
//! cross-platform directories, and TOML loading via `AppConfig::load`.

pub mod credentials;
pub mod paths;
pub mod settings;

pub use credentials::{ConfigError, Credentials};
pub use paths::AppPaths;
pub use settings::{
    AppConfig, LlmConfig, SessionConfig, SttConfig, TranslationConfig, TransportConfig,
    TtsConfig,
};
