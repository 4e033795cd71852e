//! API credentials for the hosted collaborators.
//!
//! Credentials are read once at startup from the process environment (after
//! `.env.local` has been loaded by `main`).  A missing or malformed key is a
//! [`ConfigError`], which the binary treats as fatal: no session is accepted
//! until every collaborator can authenticate.

use thiserror::Error;

/// Environment variables consulted for the translation model key, in order.
pub const LLM_KEY_VARS: &[&str] = &["LLM_API_KEY", "DEEPSEEK_API_KEY", "OPENAI_API_KEY"];

/// Environment variable holding the recognizer / synthesizer key.
pub const CARTESIA_KEY_VAR: &str = "CARTESIA_API_KEY";

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Fatal startup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// None of the listed variables is set to a non-empty value.
    #[error("missing credential: set one of {}", .0.join(", "))]
    MissingCredential(Vec<String>),

    /// The variable is set but cannot be sent as an HTTP header value.
    #[error("invalid credential in {0}: contains whitespace or control characters")]
    InvalidCredential(String),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Secrets for every external collaborator.
#[derive(Clone)]
pub struct Credentials {
    /// Bearer token for the OpenAI-compatible translation endpoint.
    pub llm_api_key: String,
    /// `X-API-Key` for the Cartesia recognizer and synthesizer.
    pub cartesia_api_key: String,
}

// Keys must never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"<redacted>")
            .field("cartesia_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_api_key = first_present(&lookup, LLM_KEY_VARS)?;
        let cartesia_api_key = first_present(&lookup, &[CARTESIA_KEY_VAR])?;
        Ok(Self {
            llm_api_key,
            cartesia_api_key,
        })
    }
}

fn first_present<F>(lookup: &F, names: &[&str]) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for name in names {
        let Some(value) = lookup(name) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::InvalidCredential((*name).to_string()));
        }
        return Ok(value.to_string());
    }
    Err(ConfigError::MissingCredential(
        names.iter().map(|n| n.to_string()).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_both_keys() {
        let creds = Credentials::from_lookup(lookup(&[
            ("LLM_API_KEY", "sk-llm"),
            ("CARTESIA_API_KEY", "sk-cartesia"),
        ]))
        .unwrap();
        assert_eq!(creds.llm_api_key, "sk-llm");
        assert_eq!(creds.cartesia_api_key, "sk-cartesia");
    }

    #[test]
    fn falls_back_to_provider_specific_llm_key() {
        let creds = Credentials::from_lookup(lookup(&[
            ("DEEPSEEK_API_KEY", "sk-deepseek"),
            ("CARTESIA_API_KEY", "sk-cartesia"),
        ]))
        .unwrap();
        assert_eq!(creds.llm_api_key, "sk-deepseek");
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let err = Credentials::from_lookup(lookup(&[
            ("LLM_API_KEY", "  "),
            ("CARTESIA_API_KEY", "sk-cartesia"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn missing_cartesia_key_is_fatal() {
        let err = Credentials::from_lookup(lookup(&[("LLM_API_KEY", "sk-llm")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingCredential(vec!["CARTESIA_API_KEY".into()])
        );
        assert!(err.to_string().contains("CARTESIA_API_KEY"));
    }

    #[test]
    fn embedded_whitespace_is_invalid() {
        let err = Credentials::from_lookup(lookup(&[
            ("LLM_API_KEY", "sk bad"),
            ("CARTESIA_API_KEY", "sk-cartesia"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidCredential("LLM_API_KEY".into()));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let creds = Credentials {
            llm_api_key: "sk-secret".into(),
            cartesia_api_key: "sk-other".into(),
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
