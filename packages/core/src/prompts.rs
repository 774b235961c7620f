//! LLM prompts the backend uses for content detection.

use serde::{Deserialize, Serialize};

/// Prompt text per model family, as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(default)]
    pub openai: String,
    #[serde(default)]
    pub gemini: String,
}

impl Prompts {
    pub fn new(openai: impl Into<String>, gemini: impl Into<String>) -> Self {
        Self {
            openai: openai.into(),
            gemini: gemini.into(),
        }
    }
}
