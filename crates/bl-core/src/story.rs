use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{StateMap, StateValue};

/// Story metadata. Identifies the entry node of the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryManifest {
    /// Story identifier, also the directory name on disk.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Id of the node a new playthrough starts at.
    pub start_node: String,
    /// Language tag, e.g. `en`.
    #[serde(default)]
    pub language: String,
    /// Short blurb shown in story listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    /// Author display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Publication date as written by the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl StoryManifest {
    /// Create a manifest with the required fields set.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_node: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_node: start_node.into(),
            language: "en".to_string(),
            description: None,
            author_id: None,
            author_name: None,
            date: None,
        }
    }

    /// Set the author id and display name.
    pub fn with_author(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.author_id = Some(id.into());
        self.author_name = Some(name.into());
        self
    }
}

/// Alternative node text shown when the session state matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConditional {
    /// Every pair must equal the session state for this text to apply.
    #[serde(default)]
    pub if_state: StateMap,
    /// Text shown when the condition holds.
    pub text: String,
}

/// A scene in the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id, unique within its story.
    pub id: String,
    /// Default text.
    #[serde(default)]
    pub text: String,
    /// Text shown on later visits when no conditional matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_revisit: Option<String>,
    /// State-dependent texts, checked in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_conditionals: Vec<TextConditional>,
    /// Actions available in this scene.
    #[serde(default)]
    pub intents: Vec<Intent>,
}

impl Node {
    /// Create a node with the given id and default text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            text_revisit: None,
            text_conditionals: Vec::new(),
            intents: Vec::new(),
        }
    }

    /// Set the revisit text.
    pub fn with_revisit(mut self, text: impl Into<String>) -> Self {
        self.text_revisit = Some(text.into());
        self
    }

    /// Append a conditional text.
    pub fn with_conditional(mut self, if_state: StateMap, text: impl Into<String>) -> Self {
        self.text_conditionals.push(TextConditional {
            if_state,
            text: text.into(),
        });
        self
    }

    /// Append an intent.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intents.push(intent);
        self
    }

    /// Find an intent defined on this node by id.
    pub fn intent(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == id)
    }
}

/// What happens when an intent resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    /// Reply with the intent's response text.
    Text,
    /// Move to the target node.
    Transition,
    /// Add an item to the inventory.
    Pickup,
    /// Finish the story.
    EndGame,
}

impl fmt::Display for IntentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Transition => write!(f, "transition"),
            Self::Pickup => write!(f, "pickup"),
            Self::EndGame => write!(f, "end_game"),
        }
    }
}

/// Prefix shared by the engine-wide intents.
pub const GLOBAL_INTENT_PREFIX: &str = "global_";

/// A player action: an edge or effect in the story graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// Intent id, unique within its node.
    pub id: String,
    /// Hint for the classifier describing what the player is trying to do.
    #[serde(default)]
    pub ai_intent_helper: String,
    /// Human-readable label, used in correction menus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_description: Option<String>,
    /// What "look around" shows for this intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_description: Option<String>,
    /// Effect kind. Global intents carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<IntentAction>,
    /// Reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Destination node for transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Item granted by pickups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Items that must all be held.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Items that must not be held.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_not: Vec<String>,
    /// State pairs that must all hold.
    #[serde(default, skip_serializing_if = "StateMap::is_empty")]
    pub requires_state: StateMap,
    /// State pairs none of which may hold.
    #[serde(default, skip_serializing_if = "StateMap::is_empty")]
    pub requires_not_state: StateMap,
    /// State pairs merged into the session on resolution.
    #[serde(default, skip_serializing_if = "StateMap::is_empty")]
    pub set_state: StateMap,
    /// Ids of hidden intents this one reveals.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reveals: Vec<String>,
    /// `Some(false)` hides the intent from "look around" until revealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl Intent {
    /// Create an intent with an id and action.
    pub fn new(id: impl Into<String>, action: IntentAction) -> Self {
        Self {
            id: id.into(),
            action: Some(action),
            ..Self::default()
        }
    }

    /// Create an action-less intent, as used for the engine-wide intents.
    pub fn described(
        id: impl Into<String>,
        helper: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ai_intent_helper: helper.into(),
            intent_description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Set the classifier hint.
    pub fn with_helper(mut self, helper: impl Into<String>) -> Self {
        self.ai_intent_helper = helper.into();
        self
    }

    /// Set the human-readable label.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.intent_description = Some(description.into());
        self
    }

    /// Set the "look around" text.
    pub fn with_text_description(mut self, text: impl Into<String>) -> Self {
        self.text_description = Some(text.into());
        self
    }

    /// Set the reply text.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Set the transition target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the item granted by a pickup.
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Require an item to be held.
    pub fn requiring(mut self, item_id: impl Into<String>) -> Self {
        self.requires.push(item_id.into());
        self
    }

    /// Require an item not to be held.
    pub fn requiring_not(mut self, item_id: impl Into<String>) -> Self {
        self.requires_not.push(item_id.into());
        self
    }

    /// Require a state pair.
    pub fn requiring_state(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.requires_state.insert(key.into(), value.into());
        self
    }

    /// Forbid a state pair.
    pub fn requiring_not_state(
        mut self,
        key: impl Into<String>,
        value: impl Into<StateValue>,
    ) -> Self {
        self.requires_not_state.insert(key.into(), value.into());
        self
    }

    /// Set a state pair on resolution.
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.set_state.insert(key.into(), value.into());
        self
    }

    /// Reveal another intent on resolution.
    pub fn revealing(mut self, intent_id: impl Into<String>) -> Self {
        self.reveals.push(intent_id.into());
        self
    }

    /// Hide this intent from "look around" until revealed.
    pub fn hidden(mut self) -> Self {
        self.visible = Some(false);
        self
    }

    /// Whether this is one of the engine-wide intents.
    pub fn is_global(&self) -> bool {
        self.id.starts_with(GLOBAL_INTENT_PREFIX)
    }

    /// Whether "look around" may show this intent given the revealed ids.
    pub fn is_visible(&self, revealed: &[String]) -> bool {
        match self.visible {
            Some(false) => revealed.iter().any(|r| r == &self.id),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_uses_camel_case() {
        let json = r#"{
            "id": "protocol_01",
            "title": "Protocol",
            "startNode": "intro",
            "language": "en",
            "authorName": "Ada",
            "authorId": "ada-1"
        }"#;
        let manifest: StoryManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.start_node, "intro");
        assert_eq!(manifest.author_name.as_deref(), Some("Ada"));
        assert!(manifest.description.is_none());
    }

    #[test]
    fn node_parses_full_intent_shape() {
        let json = r#"{
            "id": "intro",
            "text": "The elevator hums.",
            "text_revisit": "Back in the elevator.",
            "text_conditionals": [{"if_state": {"power_on": true}, "text": "Lights flicker."}],
            "intents": [
                {
                    "id": "exit_elevator",
                    "ai_intent_helper": "The user wants to leave the elevator",
                    "intent_description": "Leave the elevator",
                    "action": "transition",
                    "target": "hall",
                    "requires": ["keycard"],
                    "requires_not_state": {"locked": true}
                },
                {
                    "id": "get_keycard",
                    "action": "pickup",
                    "item_id": "keycard",
                    "visible": false,
                    "text_description": "A keycard lies on the floor."
                }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.text_conditionals.len(), 1);
        let exit = node.intent("exit_elevator").unwrap();
        assert_eq!(exit.action, Some(IntentAction::Transition));
        assert_eq!(exit.requires, vec!["keycard".to_string()]);
        assert_eq!(
            exit.requires_not_state.get("locked"),
            Some(&StateValue::Boolean(true))
        );
        let card = node.intent("get_keycard").unwrap();
        assert_eq!(card.action, Some(IntentAction::Pickup));
        assert_eq!(card.visible, Some(false));
    }

    #[test]
    fn end_game_action_is_snake_case() {
        let intent: Intent = serde_json::from_str(r#"{"id": "finish", "action": "end_game"}"#).unwrap();
        assert_eq!(intent.action, Some(IntentAction::EndGame));
        assert_eq!(IntentAction::EndGame.to_string(), "end_game");
    }

    #[test]
    fn hidden_intent_visible_only_when_revealed() {
        let intent = Intent::new("secret_door", IntentAction::Text).hidden();
        assert!(!intent.is_visible(&[]));
        assert!(intent.is_visible(&["secret_door".to_string()]));
        assert!(Intent::new("door", IntentAction::Text).is_visible(&[]));
    }

    #[test]
    fn global_prefix() {
        assert!(Intent::described("global_status", "", "Check status").is_global());
        assert!(!Intent::new("status_panel", IntentAction::Text).is_global());
    }
}
