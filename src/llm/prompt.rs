//! Prompt builder for single-shot translation requests.
//!
//! [`PromptBuilder`] produces `(system_msg, user_msg)` pairs for any
//! OpenAI-compatible `/chat/completions` endpoint.  The system instruction is
//! fixed when the builder is created (once per process); the user message is
//! the utterance text and nothing else, so every request stands alone and no
//! conversation history accumulates.
//!
//! The Chinese → English pair has a dedicated instruction written in Chinese.
//! Any other pair gets a generic English instruction naming both languages.

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Chinese → English translation.
const TRANSLATE_ZH_EN: &str = "\
你现在是一个优秀的AI中译英翻译。
你的职责是：当用户说出中文内容时，将对应的中文内容翻译成自然、地道的英文。

规则：
1. 只输出英文译文，不要解释，不要添加引号或前缀。
2. 保留人名、品牌名和专业术语的原意。
3. 如果输入已经是英文，原样输出。";

/// Chinese self-introduction spoken when a user joins.
const GREETING_ZH_EN: &str = "\
你是一个优秀的AI中译英翻译，现在有一位新用户加入。
用中文的方式，简短地告诉用户你是优秀的中译英翻译，\
你可以帮助他将他说的中文内容翻译成英文。只输出要说的话。";

/// User turn that triggers the greeting.
const GREETING_TRIGGER_ZH: &str = "你好";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds translation and greeting prompts for a fixed language pair.
///
/// # Example
/// ```rust
/// use voice_translator::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new("zh", "en");
/// let (system, user) = builder.build_translation("你好");
/// assert!(system.contains("中译英"));
/// assert_eq!(user, "你好");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    source_language: String,
    target_language: String,
}

impl PromptBuilder {
    /// Create a builder for the given ISO-639-1 source and target codes.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }

    /// Build the `(system_msg, user_msg)` pair that translates `text`.
    pub fn build_translation(&self, text: &str) -> (String, String) {
        (self.translation_instruction(), text.trim().to_string())
    }

    /// Build the `(system_msg, user_msg)` pair that asks the model for its
    /// spoken self-introduction.
    ///
    /// The greeting carries its own system instruction: the translation
    /// rules would make the model translate the request instead of obeying it.
    pub fn build_greeting(&self) -> (String, String) {
        if self.is_zh_en() {
            return (GREETING_ZH_EN.to_string(), GREETING_TRIGGER_ZH.to_string());
        }
        let system_msg = format!(
            "You are a {src}-to-{tgt} interpreter greeting a new user.\n\
             In {src}, briefly tell the user that you will translate whatever \
             they say in {src} into {tgt}. Reply with only the words to speak.",
            src = language_name(&self.source_language),
            tgt = language_name(&self.target_language),
        );
        (system_msg, "Hello".to_string())
    }

    fn translation_instruction(&self) -> String {
        if self.is_zh_en() {
            return TRANSLATE_ZH_EN.to_string();
        }
        format!(
            "You are a professional interpreter.\n\
             Translate the user's {src} input into {tgt}.\n\n\
             Rules:\n\
             1. Reply with ONLY the {tgt} translation: no explanation, quotes or prefix.\n\
             2. Preserve names, brands and technical terms.\n\
             3. If the input is already {tgt}, return it unchanged.",
            src = language_name(&self.source_language),
            tgt = language_name(&self.target_language),
        )
    }

    fn is_zh_en(&self) -> bool {
        self.source_language.starts_with("zh") && self.target_language.starts_with("en")
    }
}

/// English display name for a language code; unknown codes are returned as-is.
fn language_name(code: &str) -> &str {
    match code.split(['-', '_']).next().unwrap_or(code) {
        "zh" => "Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "th" => "Thai",
        _ => code,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
