use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::state::{StateMap, StateValue};

/// Identifier of a player session. Always a hyphenated UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a hyphenated UUID, case-insensitively. Other UUID spellings are rejected.
    pub fn parse(s: &str) -> CoreResult<Self> {
        if s.len() != 36 {
            return Err(CoreError::InvalidSessionId(s.to_string()));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidSessionId(s.to_string()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Reads `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A player's progress through one story.
///
/// Records written by older engine versions may lack the collections or
/// hold them as `null`; all of them read as empty. Use [`Session::from_json`]
/// to decode a stored record, which also applies [`Session::migrate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Story being played, if any.
    #[serde(default)]
    pub current_story: Option<String>,
    /// Node the player is at, if a story has started.
    #[serde(default)]
    pub current_node_id: Option<String>,
    /// Free-form turn history. Kept for record compatibility.
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<serde_json::Value>,
    /// Story state flags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: StateMap,
    /// Held item ids, in pickup order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory: Vec<String>,
    /// Visited node ids, in visit order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub visited_nodes: Vec<String>,
    /// Ids of hidden intents that have been revealed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub revealed_items: Vec<String>,
    /// Consecutive unresolved inputs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fail_count: u32,
    /// Normalized text of the last input.
    #[serde(default)]
    pub last_input: Option<String>,
    /// When the last input arrived, stored as epoch milliseconds.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_input_timestamp: Option<DateTime<Utc>>,
    /// Set once the story has ended.
    #[serde(default, deserialize_with = "null_as_default")]
    pub finished: bool,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create an empty session with no story.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            current_story: None,
            current_node_id: None,
            history: Vec::new(),
            state: StateMap::new(),
            inventory: Vec::new(),
            visited_nodes: Vec::new(),
            revealed_items: Vec::new(),
            fail_count: 0,
            last_input: None,
            last_input_timestamp: None,
            finished: false,
            created_at: Some(Utc::now()),
        }
    }

    /// Decode a stored session record and migrate it to the current shape.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let mut session: Session = serde_json::from_str(json)?;
        session.migrate();
        Ok(session)
    }

    /// Encode this session as a record.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Bring a legacy record up to the current invariants.
    ///
    /// Older records could hold duplicate ids in the set-like collections.
    pub fn migrate(&mut self) {
        dedup_in_place(&mut self.inventory);
        dedup_in_place(&mut self.visited_nodes);
        dedup_in_place(&mut self.revealed_items);
    }

    /// Reset all progress and place the player at the start of a story.
    pub fn begin_story(&mut self, story_id: impl Into<String>, start_node: impl Into<String>) {
        self.current_story = Some(story_id.into());
        self.current_node_id = Some(start_node.into());
        self.history.clear();
        self.state.clear();
        self.inventory.clear();
        self.visited_nodes.clear();
        self.revealed_items.clear();
        self.fail_count = 0;
        self.finished = false;
    }

    /// The story and node the player is at, when a story is in progress.
    pub fn position(&self) -> Option<(&str, &str)> {
        match (&self.current_story, &self.current_node_id) {
            (Some(story), Some(node)) => Some((story.as_str(), node.as_str())),
            _ => None,
        }
    }

    /// Check if an item is held.
    pub fn has_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|i| i == item_id)
    }

    /// Add an item. Returns false if it was already held.
    pub fn add_item(&mut self, item_id: impl Into<String>) -> bool {
        let item_id = item_id.into();
        if self.has_item(&item_id) {
            return false;
        }
        self.inventory.push(item_id);
        true
    }

    /// Check if a node has been visited.
    pub fn has_visited(&self, node_id: &str) -> bool {
        self.visited_nodes.iter().any(|n| n == node_id)
    }

    /// Mark a node visited. Returns false if it already was.
    pub fn mark_visited(&mut self, node_id: impl Into<String>) -> bool {
        let node_id = node_id.into();
        if self.has_visited(&node_id) {
            return false;
        }
        self.visited_nodes.push(node_id);
        true
    }

    /// Check if a hidden intent has been revealed.
    pub fn is_revealed(&self, intent_id: &str) -> bool {
        self.revealed_items.iter().any(|r| r == intent_id)
    }

    /// Reveal a hidden intent. Returns false if it already was.
    pub fn reveal(&mut self, intent_id: impl Into<String>) -> bool {
        let intent_id = intent_id.into();
        if self.is_revealed(&intent_id) {
            return false;
        }
        self.revealed_items.push(intent_id);
        true
    }

    /// Merge state pairs, overwriting existing keys.
    pub fn apply_state(&mut self, changes: &StateMap) {
        for (key, value) in changes {
            self.state.insert(key.clone(), value.clone());
        }
    }

    /// Get a state value.
    pub fn state_value(&self, key: &str) -> Option<&StateValue> {
        self.state.get(key)
    }

    /// Record the last normalized input for the correction feature.
    pub fn record_input(&mut self, normalized: impl Into<String>, at: DateTime<Utc>) {
        self.last_input = Some(normalized.into());
        self.last_input_timestamp = Some(at);
    }
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ID: &str = "a3f2b1c8-1234-5678-9abc-def012345678";

    #[test]
    fn session_id_accepts_hyphenated_any_case() {
        assert!(SessionId::parse(ID).is_ok());
        assert!(SessionId::parse(&ID.to_uppercase()).is_ok());
        assert_eq!(SessionId::parse(ID).unwrap().to_string(), ID);
    }

    #[test]
    fn session_id_rejects_other_spellings() {
        assert!(SessionId::parse("legacy").is_err());
        assert!(SessionId::parse("a3f2b1c812345678 9abcdef012345678").is_err());
        assert!(SessionId::parse("a3f2b1c8123456789abcdef012345678").is_err());
        assert!(SessionId::parse("../../etc/passwd").is_err());
    }

    #[test]
    fn legacy_record_reads_missing_collections_as_empty() {
        let json = format!(
            r#"{{"id": "{ID}", "currentStory": "test", "currentNodeId": "start", "inventory": []}}"#
        );
        let session = Session::from_json(&json).unwrap();
        assert!(session.visited_nodes.is_empty());
        assert!(session.revealed_items.is_empty());
        assert!(session.state.is_empty());
        assert_eq!(session.fail_count, 0);
        assert!(!session.finished);
        assert_eq!(session.position(), Some(("test", "start")));
    }

    #[test]
    fn legacy_record_reads_null_collections_as_empty() {
        let json = format!(r#"{{"id": "{ID}", "inventory": null, "state": null, "failCount": null}}"#);
        let session = Session::from_json(&json).unwrap();
        assert!(session.inventory.is_empty());
        assert!(session.state.is_empty());
        assert!(session.position().is_none());
    }

    #[test]
    fn migrate_removes_duplicate_ids() {
        let json = format!(
            r#"{{"id": "{ID}", "inventory": ["key", "lamp", "key"], "visitedNodes": ["a", "a"]}}"#
        );
        let session = Session::from_json(&json).unwrap();
        assert_eq!(session.inventory, vec!["key", "lamp"]);
        assert_eq!(session.visited_nodes, vec!["a"]);
    }

    #[test]
    fn timestamp_is_stored_as_epoch_millis() {
        let mut session = Session::new(SessionId::parse(ID).unwrap());
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        session.record_input("look around", at);
        let json = session.to_json().unwrap();
        assert!(json.contains("\"lastInputTimestamp\":1700000000123"));
        let back = Session::from_json(&json).unwrap();
        assert_eq!(back.last_input_timestamp, Some(at));
        assert_eq!(back.last_input.as_deref(), Some("look around"));
    }

    #[test]
    fn begin_story_discards_progress() {
        let mut session = Session::new(SessionId::new());
        session.add_item("key");
        session.mark_visited("hall");
        session.reveal("secret");
        session.fail_count = 2;
        session.finished = true;
        let mut changes = StateMap::new();
        changes.insert("power_on".to_string(), StateValue::Boolean(true));
        session.apply_state(&changes);

        session.begin_story("protocol_01", "intro");

        assert_eq!(session.position(), Some(("protocol_01", "intro")));
        assert!(session.inventory.is_empty());
        assert!(session.visited_nodes.is_empty());
        assert!(session.revealed_items.is_empty());
        assert!(session.state.is_empty());
        assert_eq!(session.fail_count, 0);
        assert!(!session.finished);
    }

    #[test]
    fn set_like_collections_ignore_repeats() {
        let mut session = Session::new(SessionId::new());
        assert!(session.add_item("key"));
        assert!(!session.add_item("key"));
        assert!(session.mark_visited("a"));
        assert!(!session.mark_visited("a"));
        assert!(session.reveal("x"));
        assert!(!session.reveal("x"));
        assert_eq!(session.inventory.len(), 1);
        assert_eq!(session.visited_nodes.len(), 1);
        assert_eq!(session.revealed_items.len(), 1);
    }

    proptest! {
        #[test]
        fn inventory_never_holds_duplicates(items in proptest::collection::vec("[a-c]{1,2}", 0..40)) {
            let mut session = Session::new(SessionId::new());
            for item in &items {
                session.add_item(item.as_str());
            }
            let mut unique = session.inventory.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), session.inventory.len());
            for item in &items {
                prop_assert!(session.has_item(item));
            }
        }
    }
}
