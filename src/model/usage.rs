//! Token usage and model information types.

use serde::Serialize;
use std::ops::AddAssign;

/// Reserved model name for turns no real model produced (compaction summaries,
/// interrupted requests). Excluded from model sets and badges.
pub const SYNTHETIC_MODEL: &str = "<synthetic>";

/// Model information from the assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModelInfo {
    model_id: String,
}

impl ModelInfo {
    /// Returns `None` for empty names and the synthetic sentinel.
    pub fn new(model_id: impl Into<String>) -> Option<Self> {
        let model_id = model_id.into();
        if model_id.is_empty() || model_id == SYNTHETIC_MODEL {
            return None;
        }
        Some(Self { model_id })
    }

    /// Get the model ID as a string slice.
    pub fn id(&self) -> &str {
        &self.model_id
    }

    /// Human-readable short name.
    pub fn display_name(&self) -> &str {
        let lower = self.model_id.to_ascii_lowercase();
        if lower.contains("opus") {
            "Opus"
        } else if lower.contains("sonnet") {
            "Sonnet"
        } else if lower.contains("haiku") {
            "Haiku"
        } else {
            &self.model_id
        }
    }
}

/// Token usage statistics from a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Uncached input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_input_tokens: u64,
    /// Tokens read from the prompt cache.
    pub cache_read_input_tokens: u64,
}

impl TokenUsage {
    /// Input including cache reads.
    pub fn total_input(&self) -> u64 {
        self.input_tokens + self.cache_read_input_tokens
    }

    /// Input plus output, excluding cache traffic.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// True when every counter is zero.
    pub fn is_empty(&self) -> bool {
        *self == TokenUsage::default()
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.cache_creation_input_tokens += rhs.cache_creation_input_tokens;
        self.cache_read_input_tokens += rhs.cache_read_input_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ModelInfo {
        ModelInfo::new(id).expect("non-synthetic model")
    }

    #[test]
    fn test_model_info_display_name_opus() {
        assert_eq!(model("claude-opus-4-5-20251101").display_name(), "Opus");
    }

    #[test]
    fn test_model_info_display_name_sonnet() {
        assert_eq!(model("claude-sonnet-4-5-20250929").display_name(), "Sonnet");
    }

    #[test]
    fn test_model_info_display_name_haiku() {
        assert_eq!(model("claude-haiku-3-5-20241022").display_name(), "Haiku");
    }

    #[test]
    fn test_model_info_display_name_unknown() {
        assert_eq!(model("gpt-4").display_name(), "gpt-4");
    }

    #[test]
    fn test_model_info_rejects_synthetic_and_empty() {
        assert!(ModelInfo::new(SYNTHETIC_MODEL).is_none());
        assert!(ModelInfo::new("").is_none());
    }

    #[test]
    fn test_token_usage_total_input() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            cache_creation_input_tokens: 20,
            cache_read_input_tokens: 30,
        };
        assert_eq!(usage.total_input(), 130);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            cache_creation_input_tokens: 20,
            cache_read_input_tokens: 30,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_token_usage_add_assign_sums_every_field() {
        let mut acc = TokenUsage::default();
        acc += TokenUsage {
            input_tokens: 1,
            output_tokens: 2,
            cache_creation_input_tokens: 3,
            cache_read_input_tokens: 4,
        };
        acc += TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
            cache_creation_input_tokens: 30,
            cache_read_input_tokens: 40,
        };
        assert_eq!(acc.input_tokens, 11);
        assert_eq!(acc.output_tokens, 22);
        assert_eq!(acc.cache_creation_input_tokens, 33);
        assert_eq!(acc.cache_read_input_tokens, 44);
    }

    #[test]
    fn test_token_usage_default_is_empty() {
        assert!(TokenUsage::default().is_empty());
    }
}
