use serde::{Deserialize, Serialize};

/// Token counts reported by the analysis provider for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Readout published to the host after each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageStats {
    pub last: Option<TokenUsage>,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
}

/// Running totals for the current mode; zeroed on every mode change.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    last_usage: Option<TokenUsage>,
    total_prompt: u64,
    total_completion: u64,
    total_tokens: u64,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, usage: TokenUsage) {
        self.last_usage = Some(usage);
        self.total_prompt = self.total_prompt.saturating_add(usage.prompt_tokens);
        self.total_completion = self
            .total_completion
            .saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total_tokens);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `None` until at least one token has been counted.
    pub fn stats(&self) -> Option<TokenUsageStats> {
        if self.total_tokens == 0 {
            return None;
        }
        Some(TokenUsageStats {
            last: self.last_usage,
            total_prompt_tokens: self.total_prompt,
            total_completion_tokens: self.total_completion,
            total_tokens: self.total_tokens,
        })
    }
}
