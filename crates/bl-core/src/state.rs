use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A session state value. Story files write these as bare JSON scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// A boolean flag.
    Boolean(bool),
    /// A whole number.
    Integer(i64),
    /// A text value.
    String(String),
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Key/value state, as stored on a session and as written in story conditions.
///
/// Ordered so that serialized sessions are stable.
pub type StateMap = BTreeMap<String, StateValue>;

/// True when every pair in `required` is present in `state` with an equal value.
///
/// Equality is strict: `true` never matches `"true"`. An empty requirement
/// always matches.
pub fn state_matches_all(state: &StateMap, required: &StateMap) -> bool {
    required
        .iter()
        .all(|(key, value)| state.get(key).is_some_and(|v| v == value))
}

/// True when at least one pair in `forbidden` is present in `state` with an equal value.
pub fn state_matches_any(state: &StateMap, forbidden: &StateMap) -> bool {
    forbidden
        .iter()
        .any(|(key, value)| state.get(key).is_some_and(|v| v == value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pairs: &[(&str, StateValue)]) -> StateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn untagged_json_round_trip() {
        let map: StateMap =
            serde_json::from_str(r#"{"power_on": true, "mood": "grim", "coins": 3}"#).unwrap();
        assert_eq!(map["power_on"], StateValue::Boolean(true));
        assert_eq!(map["mood"], StateValue::String("grim".into()));
        assert_eq!(map["coins"], StateValue::Integer(3));
    }

    #[test]
    fn match_all_requires_every_pair() {
        let s = state(&[("a", true.into()), ("b", "x".into())]);
        assert!(state_matches_all(&s, &state(&[("a", true.into())])));
        assert!(state_matches_all(
            &s,
            &state(&[("a", true.into()), ("b", "x".into())])
        ));
        assert!(!state_matches_all(&s, &state(&[("c", true.into())])));
        assert!(state_matches_all(&s, &StateMap::new()));
    }

    #[test]
    fn strict_equality_between_kinds() {
        let s = state(&[("flag", true.into())]);
        assert!(!state_matches_all(&s, &state(&[("flag", "true".into())])));
        assert!(!state_matches_any(&s, &state(&[("flag", "true".into())])));
    }

    #[test]
    fn match_any_needs_one_equal_pair() {
        let s = state(&[("door", "open".into())]);
        assert!(state_matches_any(
            &s,
            &state(&[("door", "open".into()), ("x", true.into())])
        ));
        assert!(!state_matches_any(&s, &state(&[("door", "closed".into())])));
        assert!(!state_matches_any(&s, &StateMap::new()));
    }

    #[test]
    fn display_is_bare_value() {
        assert_eq!(StateValue::from("OK").to_string(), "OK");
        assert_eq!(StateValue::from(7_i64).to_string(), "7");
        assert_eq!(StateValue::from(false).to_string(), "false");
    }
}
