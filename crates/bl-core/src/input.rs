use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalize player input for cache keys and correction checks.
///
/// Trims, lowercases, then drops every character outside `[a-z0-9 ]`.
/// Interior whitespace other than plain spaces is dropped too.
pub fn normalize_input(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// Key of an intent cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Story id.
    pub story: String,
    /// Node id.
    pub node: String,
    /// Normalized input, see [`normalize_input`].
    pub input: String,
}

impl CacheKey {
    /// Build a key from raw input, normalizing it.
    pub fn new(story: impl Into<String>, node: impl Into<String>, raw_input: &str) -> Self {
        Self {
            story: story.into(),
            node: node.into(),
            input: normalize_input(raw_input),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "intent_cache:{}:{}:{}", self.story, self.node, self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_case_and_punctuation() {
        assert_eq!(normalize_input("  Go to Room B!  "), "go to room b");
        assert_eq!(normalize_input("Look... around?"), "look around");
        assert_eq!(normalize_input("pick-up the KEY #2"), "pickup the key 2");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(normalize_input("öffne die Tür"), "ffne die tr");
        assert_eq!(normalize_input("tab\there"), "tabhere");
    }

    #[test]
    fn cache_key_renders_namespaced() {
        let key = CacheKey::new("protocol_01", "intro", "Look Around!");
        assert_eq!(key.to_string(), "intent_cache:protocol_01:intro:look around");
    }

    proptest! {
        #[test]
        fn surrounding_whitespace_is_ignored(input in ".{0,40}") {
            let padded = format!("  {input}\n\t");
            prop_assert_eq!(normalize_input(&padded), normalize_input(&input));
        }

        #[test]
        fn normalized_alphabet_is_restricted(input in ".{0,40}") {
            let out = normalize_input(&input);
            prop_assert!(out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        }
    }
}
