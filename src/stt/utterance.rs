//! Recognized speech as delivered to the turn controller.

use serde::{Deserialize, Serialize};

/// A bounded span of recognized source-language text.
///
/// Partial utterances (`is_final == false`) may still be revised by the
/// recognizer; a final utterance never changes after it is emitted.  Times are
/// seconds from the start of the user's audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub is_final: bool,
    /// ISO-639-1 tag of the recognized language (e.g. `"zh"`).
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
}

impl Utterance {
    /// A revisable hypothesis.
    pub fn partial(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            language: language.into(),
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    /// A committed transcript spanning `start_time..end_time`.
    pub fn committed(
        text: impl Into<String>,
        language: impl Into<String>,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            language: language.into(),
            start_time,
            end_time,
        }
    }

    /// `true` when the text holds nothing worth translating.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Checks the time span is usable: finite, non-negative and ordered.
    pub fn has_valid_span(&self) -> bool {
        self.start_time.is_finite()
            && self.end_time.is_finite()
            && self.start_time >= 0.0
            && self.end_time >= self.start_time
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_is_not_final() {
        let u = Utterance::partial("你", "zh");
        assert!(!u.is_final);
        assert_eq!(u.language, "zh");
    }

    #[test]
    fn committed_is_final_with_span() {
        let u = Utterance::committed("你好", "zh", 0.5, 1.25);
        assert!(u.is_final);
        assert!((u.duration_secs() - 0.75).abs() < 1e-9);
        assert!(u.has_valid_span());
    }

    #[test]
    fn whitespace_only_is_blank() {
        assert!(Utterance::committed(" \n\t", "zh", 0.0, 1.0).is_blank());
        assert!(Utterance::committed("", "zh", 0.0, 1.0).is_blank());
        assert!(!Utterance::committed("好", "zh", 0.0, 1.0).is_blank());
    }

    #[test]
    fn reversed_or_nan_span_is_invalid() {
        assert!(!Utterance::committed("a", "zh", 2.0, 1.0).has_valid_span());
        assert!(!Utterance::committed("a", "zh", f64::NAN, 1.0).has_valid_span());
        assert!(!Utterance::committed("a", "zh", -1.0, 1.0).has_valid_span());
    }

    #[test]
    fn deserializes_with_missing_times() {
        let u: Utterance = serde_json::from_str(r#"{"text":"你好","is_final":true}"#).unwrap();
        assert!(u.is_final);
        assert_eq!(u.start_time, 0.0);
        assert_eq!(u.language, "");
    }
}
