//! Model pricing table
//!
//! Static per-model USD rates used to estimate the cost of a completion
//! from its token usage. Rates are per million tokens, split into prompt
//! and completion sides. Models missing from the table estimate as 0.0 so
//! cost accounting degrades quietly instead of failing a request.

use crate::llm::types::Usage;

/// (model, prompt USD per 1M tokens, completion USD per 1M tokens)
const PRICING: &[(&str, f64, f64)] = &[
    // OpenAI
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4o-mini", 0.15, 0.60),
    ("o1", 15.00, 60.00),
    ("o1-mini", 1.10, 4.40),
    ("o3-mini", 1.10, 4.40),
    // Anthropic
    ("claude-3-5-sonnet-20241022", 3.00, 15.00),
    ("claude-3-5-haiku-20241022", 0.80, 4.00),
    ("claude-3-opus-20240229", 15.00, 75.00),
    // Google
    ("gemini-2.0-flash", 0.10, 0.40),
    ("gemini-1.5-pro", 1.25, 5.00),
    ("gemini-1.5-flash", 0.075, 0.30),
    // Common OpenRouter routes
    ("meta-llama/llama-3.3-70b-instruct", 0.12, 0.30),
    ("mistralai/mistral-large", 2.00, 6.00),
    ("deepseek/deepseek-chat", 0.14, 0.28),
];

/// Look up the per-1M-token rates for a model
pub fn rates_for(model: &str) -> Option<(f64, f64)> {
    PRICING
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, prompt, completion)| (*prompt, *completion))
}

/// Estimate the USD cost of a completion from its token usage
///
/// Unknown models estimate as 0.0.
pub fn estimate_cost(model: &str, usage: &Usage) -> f64 {
    let Some((prompt_rate, completion_rate)) = rates_for(model) else {
        return 0.0;
    };
    let prompt_cost = usage.prompt_tokens as f64 / 1_000_000.0 * prompt_rate;
    let completion_cost = usage.completion_tokens as f64 / 1_000_000.0 * completion_rate;
    prompt_cost + completion_cost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_cost() {
        let usage = Usage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            total_tokens: 2_000_000,
        };
        let cost = estimate_cost("gpt-4o-mini", &usage);
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_is_free() {
        let usage = Usage {
            prompt_tokens: 1000,
            completion_tokens: 1000,
            total_tokens: 2000,
        };
        assert_eq!(estimate_cost("totally-unknown-model", &usage), 0.0);
    }

    #[test]
    fn test_zero_usage() {
        let usage = Usage::default();
        assert_eq!(estimate_cost("gpt-4o", &usage), 0.0);
    }
}
