//! Importance scoring.
//!
//! The pipeline only depends on [`ImportanceScorer`]. Real deployments put a
//! language model behind it; [`KeywordScorer`] is a deterministic stand-in
//! driven by configurable weights.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::message::MessageContent;

/// Errors raised by a scorer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    /// The scorer could not produce a value.
    #[error("scorer failed: {0}")]
    Failed(String),

    /// The scorer produced something that is not an importance.
    #[error("scorer returned invalid importance {0}")]
    InvalidScore(f32),
}

/// Assigns an importance in `[0, 1]` to message content.
pub trait ImportanceScorer {
    fn evaluate(&mut self, content: &MessageContent) -> Result<f32, ScoringError>;
}

impl<F> ImportanceScorer for F
where
    F: FnMut(&MessageContent) -> Result<f32, ScoringError>,
{
    fn evaluate(&mut self, content: &MessageContent) -> Result<f32, ScoringError> {
        self(content)
    }
}

/// Accept only finite scores within `[0, 1]`.
pub fn validate_score(score: f32) -> Result<f32, ScoringError> {
    if (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(ScoringError::InvalidScore(score))
    }
}

/// Weights for keyword scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Score of content that matches no keyword.
    pub base_score: f32,
    /// Additive score per keyword, matched case-insensitively.
    pub keywords: BTreeMap<String, f32>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let mut keywords = BTreeMap::new();
        keywords.insert("betrayal".to_string(), 0.5);
        keywords.insert("death".to_string(), 0.45);
        keywords.insert("war".to_string(), 0.4);
        keywords.insert("alliance".to_string(), 0.35);
        keywords.insert("secret".to_string(), 0.3);
        keywords.insert("harvest".to_string(), 0.2);
        keywords.insert("festival".to_string(), 0.15);
        keywords.insert("weather".to_string(), 0.05);

        Self {
            base_score: 0.1,
            keywords,
        }
    }
}

/// Scores content by the keywords it mentions.
///
/// Keywords match whole words, case-insensitively; a multi-word keyword
/// matches the same words in sequence. Each keyword counts once no matter
/// how often it appears. The result is clamped to `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    weights: ScoreWeights,
}

impl KeywordScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score without going through the trait.
    pub fn score(&self, content: &MessageContent) -> f32 {
        let words: Vec<String> = content.text_fragments().flat_map(tokenize).collect();

        let bonus: f32 = self
            .weights
            .keywords
            .iter()
            .filter(|(keyword, _)| mentions(&words, keyword))
            .map(|(_, weight)| weight)
            .sum();

        (self.weights.base_score + bonus).clamp(0.0, 1.0)
    }
}

/// Lowercased alphanumeric words of `text`.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn mentions(words: &[String], keyword: &str) -> bool {
    let needle: Vec<String> = tokenize(keyword).collect();
    !needle.is_empty() && words.windows(needle.len()).any(|window| window == needle.as_slice())
}

impl ImportanceScorer for KeywordScorer {
    fn evaluate(&mut self, content: &MessageContent) -> Result<f32, ScoringError> {
        Ok(self.score(content))
    }
}
