//! Response Scorer
//!
//! Heuristic quality scoring for ensemble responses. Each response gets
//! four sub-metrics in [0, 100] (coherence, relevance, specificity,
//! confidence), each starting from a base value and adjusted by rule hits,
//! plus a latency-derived speed credit. The overall score is a weighted
//! sum of the five terms.
//!
//! The rules live behind the `ResponseScorer` trait so each one is
//! independently testable and the whole table is replaceable.

use super::types::ResponseMetrics;

/// Words too common to count as content words for relevance matching
const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "because", "before", "being", "between", "could", "every", "might",
    "other", "should", "their", "there", "these", "thing", "think", "those", "under", "where",
    "which", "while", "would", "please", "write",
];

/// Markers that suggest concrete illustration
const EXAMPLE_MARKERS: &[&str] = &["for example", "such as", "like", "including"];

/// Markers that suggest procedural structure
const STEP_MARKERS: &[&str] = &["step", "first", "then", "next", "finally"];

/// Hedging words that cost specificity
const VAGUE_MARKERS: &[&str] = &["maybe", "perhaps", "possibly", "might", "could be"];

/// Phrases that signal the model is unsure of its own answer
const UNCERTAINTY_MARKERS: &[&str] = &[
    "i think",
    "i believe",
    "probably",
    "not sure",
    "it seems",
    "unclear",
];

/// Phrases that signal conviction
const CONFIDENCE_MARKERS: &[&str] = &["definitely", "certainly", "clearly", "precisely", "absolutely"];

/// Scoring weights; they sum to 1.0, so a score built from [0,100] terms
/// stays in [0,100]
const WEIGHT_COHERENCE: f64 = 0.25;
const WEIGHT_RELEVANCE: f64 = 0.35;
const WEIGHT_SPECIFICITY: f64 = 0.20;
const WEIGHT_CONFIDENCE: f64 = 0.15;
const WEIGHT_SPEED: f64 = 0.05;

/// Scores a response text against the question that produced it
pub trait ResponseScorer: Send + Sync {
    /// Compute sub-metrics and the overall score for one response
    fn evaluate(&self, question: &str, response: &str, response_time_ms: u64) -> ScoredResponse;
}

/// Output of a scoring pass
#[derive(Debug, Clone, Copy)]
pub struct ScoredResponse {
    pub metrics: ResponseMetrics,
    /// Weighted overall score in [0, 100]
    pub score: f64,
}

/// The default rule-table scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Structure and readability of the text
    fn coherence(text: &str) -> f64 {
        let mut score: f64 = 50.0;

        // At least one complete sentence
        if text.contains('.') || text.contains('!') || text.contains('?') {
            score += 10.0;
        }

        if text.chars().next().is_some_and(|c| c.is_uppercase()) {
            score += 10.0;
        }

        // Multiple paragraphs
        if text.split("\n\n").filter(|p| !p.trim().is_empty()).count() >= 2 {
            score += 10.0;
        }

        if has_list_markers(text) {
            score += 10.0;
        }

        // Shouty text reads as less coherent
        if text.matches('!').count() <= 2 {
            score += 10.0;
        }

        score.clamp(0.0, 100.0)
    }

    /// Overlap between the question's content words and the response
    fn relevance(question: &str, text: &str) -> f64 {
        let mut score = 50.0;
        let question_lower = question.to_lowercase();
        let text_lower = text.to_lowercase();

        let content_words: Vec<&str> = question_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 4 && !STOP_WORDS.contains(w))
            .collect();

        if !content_words.is_empty() {
            let hits = content_words
                .iter()
                .filter(|w| text_lower.contains(*w))
                .count();
            score += 30.0 * hits as f64 / content_words.len() as f64;
        }

        // Question-form / answer-form co-occurrence
        for (ask, answer) in [("how", "by"), ("why", "because"), ("what", "is")] {
            if question_lower.contains(ask) && text_lower.contains(answer) {
                score += 10.0;
            }
        }

        score.clamp(0.0, 100.0)
    }

    /// Concreteness: numbers, examples, steps; hedging costs points
    fn specificity(text: &str) -> f64 {
        let mut score = 50.0;
        let text_lower = text.to_lowercase();

        if text.chars().any(|c| c.is_ascii_digit()) {
            score += 15.0;
        }

        if EXAMPLE_MARKERS.iter().any(|m| text_lower.contains(m)) {
            score += 15.0;
        }

        if STEP_MARKERS.iter().any(|m| text_lower.contains(m)) {
            score += 10.0;
        }

        for marker in VAGUE_MARKERS {
            score -= 5.0 * text_lower.matches(marker).count() as f64;
        }

        score.clamp(0.0, 100.0)
    }

    /// How sure the model sounds, penalized per hedge, credited per assertion
    fn confidence(text: &str) -> f64 {
        let mut score = 70.0;
        let text_lower = text.to_lowercase();

        for marker in UNCERTAINTY_MARKERS {
            score -= 10.0 * text_lower.matches(marker).count() as f64;
        }

        for marker in CONFIDENCE_MARKERS {
            score += 5.0 * text_lower.matches(marker).count() as f64;
        }

        score.clamp(0.0, 100.0)
    }

    /// Latency credit: full at <= 1s, zero at >= 11s, linear in between
    fn speed(response_time_ms: u64) -> f64 {
        (100.0 - (response_time_ms as f64 - 1000.0) / 100.0).clamp(0.0, 100.0)
    }
}

/// Bullet or numbered-list markers at line starts
fn has_list_markers(text: &str) -> bool {
    text.lines().any(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
            || trimmed
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() && trimmed[c.len_utf8()..].starts_with('.'))
    })
}

impl ResponseScorer for HeuristicScorer {
    fn evaluate(&self, question: &str, response: &str, response_time_ms: u64) -> ScoredResponse {
        let metrics = ResponseMetrics {
            coherence: Self::coherence(response),
            relevance: Self::relevance(question, response),
            specificity: Self::specificity(response),
            confidence: Self::confidence(response),
        };

        let score = metrics.coherence * WEIGHT_COHERENCE
            + metrics.relevance * WEIGHT_RELEVANCE
            + metrics.specificity * WEIGHT_SPECIFICITY
            + metrics.confidence * WEIGHT_CONFIDENCE
            + Self::speed(response_time_ms) * WEIGHT_SPEED;

        ScoredResponse { metrics, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coherence_rewards_structure() {
        let structured = "First, do this.\n\nThen:\n- item one\n- item two";
        let flat = "yeah sure whatever !!! !!!";

        assert!(HeuristicScorer::coherence(structured) > HeuristicScorer::coherence(flat));
    }

    #[test]
    fn test_coherence_base_for_empty_text() {
        // Empty text hits only the exclamation rule
        assert_eq!(HeuristicScorer::coherence(""), 60.0);
    }

    #[test]
    fn test_relevance_content_word_overlap() {
        let question = "How does photosynthesis convert sunlight into energy?";
        let on_topic = "Photosynthesis converts sunlight into chemical energy by using chlorophyll.";
        let off_topic = "The stock market closed higher today.";

        let relevant = HeuristicScorer::relevance(question, on_topic);
        let irrelevant = HeuristicScorer::relevance(question, off_topic);
        assert!(relevant > irrelevant);
        // "how" + "by" co-occurrence plus full word overlap
        assert!(relevant > 80.0);
    }

    #[test]
    fn test_specificity_penalizes_each_vague_hit() {
        let base = HeuristicScorer::specificity("It is red.");
        let hedged = HeuristicScorer::specificity("It is maybe red, or perhaps maybe blue.");
        // Three hedge occurrences, two of them "maybe"
        assert_eq!(base - hedged, 15.0);
    }

    #[test]
    fn test_confidence_markers_count_per_occurrence() {
        assert_eq!(HeuristicScorer::confidence("The answer is 4."), 70.0);
        assert_eq!(
            HeuristicScorer::confidence("I think it is 4, but I think not."),
            50.0
        );
        assert_eq!(
            HeuristicScorer::confidence("It is definitely and certainly 4."),
            80.0
        );
    }

    #[test]
    fn test_speed_credit_boundaries() {
        assert_eq!(HeuristicScorer::speed(0), 100.0);
        assert_eq!(HeuristicScorer::speed(1000), 100.0);
        assert_eq!(HeuristicScorer::speed(3000), 80.0);
        assert_eq!(HeuristicScorer::speed(11_000), 0.0);
        assert_eq!(HeuristicScorer::speed(60_000), 0.0);
    }

    #[test]
    fn test_score_bounded_for_extreme_inputs() {
        let scorer = HeuristicScorer::new();

        let hostile = "!!!!! maybe perhaps possibly might could be i think not sure ".repeat(50);
        let glowing = format!(
            "Definitely certainly clearly.\n\n{}",
            "1. First step with 42 numbers, for example.\n".repeat(10)
        );

        for (text, ms) in [(hostile.as_str(), 0u64), (glowing.as_str(), u32::MAX as u64)] {
            let scored = scorer.evaluate("what is it?", text, ms);
            assert!(scored.score >= 0.0 && scored.score <= 100.0);
            for metric in [
                scored.metrics.coherence,
                scored.metrics.relevance,
                scored.metrics.specificity,
                scored.metrics.confidence,
            ] {
                assert!((0.0..=100.0).contains(&metric));
            }
        }
    }

    #[test]
    fn test_terse_confident_beats_slow_hedged() {
        let scorer = HeuristicScorer::new();
        let question = "What is 2+2?";

        let confident = scorer.evaluate(question, "4.", 500);
        let hedged = scorer.evaluate(question, "I think maybe around 4?", 3000);

        assert!(confident.score > hedged.score);
    }
}
