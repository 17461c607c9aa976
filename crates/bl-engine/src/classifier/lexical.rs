use std::collections::BTreeSet;

use async_trait::async_trait;
use bl_core::Intent;
use strsim::jaro_winkler;
use tracing::debug;

use super::{Classification, ClassifyRequest, IntentClassifier};
use crate::error::ClassifierError;

/// Minimum overlap score for a match (0.0-1.0). Low enough that "look"
/// still finds "look around".
const MATCH_THRESHOLD: f64 = 0.10;

/// Two tokens of this length or more count as equal above this similarity.
const FUZZY_TOKEN_THRESHOLD: f64 = 0.92;
const FUZZY_MIN_LEN: usize = 4;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "for", "i", "in", "is", "it", "its", "me", "my", "of",
    "on", "or", "that", "the", "their", "they", "this", "to", "user", "want", "wants", "with",
    "you", "your",
];

/// Scores word overlap between the input and each intent's hint, label, and id.
///
/// Tokens are lowercased, lightly stemmed, and stripped of filler words.
/// The score is the Jaccard index of the two token sets, where long tokens
/// also match on close spelling.
#[derive(Debug, Clone, Default)]
pub struct LexicalClassifier;

impl LexicalClassifier {
    /// Create the classifier.
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, request: &ClassifyRequest<'_>) -> Classification {
        let input = tokenize(request.input);
        if input.is_empty() {
            return Classification::Unknown;
        }

        let mut best: Option<(&str, f64)> = None;
        for intent in request.candidates() {
            let score = similarity(&input, &intent_tokens(intent));
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((intent.id.as_str(), score));
            }
        }

        match best {
            Some((id, score)) if score >= MATCH_THRESHOLD => {
                debug!(input = request.input, intent = id, score, "lexical match");
                Classification::Matched(id.to_string())
            }
            _ => Classification::Unknown,
        }
    }
}

#[async_trait]
impl IntentClassifier for LexicalClassifier {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn classify(
        &self,
        request: &ClassifyRequest<'_>,
    ) -> Result<Classification, ClassifierError> {
        Ok(self.resolve(request))
    }
}

fn intent_tokens(intent: &Intent) -> BTreeSet<String> {
    let mut tokens = tokenize(&intent.ai_intent_helper);
    if let Some(description) = &intent.intent_description {
        tokens.extend(tokenize(description));
    }
    tokens.extend(tokenize(&intent.id.replace('_', " ")));
    tokens
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(stem)
        .collect()
}

fn stem(token: &str) -> String {
    let mut word = token;
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word = &word[..word.len() - 1];
    }
    for suffix in ["ing", "ed"] {
        if let Some(root) = word.strip_suffix(suffix)
            && root.len() >= 3
        {
            word = root;
            break;
        }
    }
    word.to_string()
}

fn tokens_match(a: &str, b: &str) -> bool {
    a == b
        || (a.len() >= FUZZY_MIN_LEN
            && b.len() >= FUZZY_MIN_LEN
            && jaro_winkler(a, b) >= FUZZY_TOKEN_THRESHOLD)
}

fn similarity(input: &BTreeSet<String>, intent: &BTreeSet<String>) -> f64 {
    if input.is_empty() || intent.is_empty() {
        return 0.0;
    }
    let shared = input
        .iter()
        .filter(|a| intent.iter().any(|b| tokens_match(a, b)))
        .count();
    let union = input.len() + intent.len() - shared;
    shared as f64 / union as f64
}
