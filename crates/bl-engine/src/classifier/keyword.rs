use async_trait::async_trait;

use super::{Classification, ClassifyRequest, IntentClassifier};
use crate::error::ClassifierError;
use crate::globals::{INVENTORY, LOOK_AROUND, STATUS};

/// Rule-based classifier: the first rule whose keyword occurs in the input wins.
///
/// Rules naming an intent that is not a candidate this turn are skipped.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    rules: Vec<(String, String)>,
    id_phrases: bool,
}

impl KeywordClassifier {
    /// A classifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the global intents.
    pub fn standard() -> Self {
        Self::new()
            .with_rule("look around", LOOK_AROUND)
            .with_rule("look", LOOK_AROUND)
            .with_rule("inventory", INVENTORY)
            .with_rule("carrying", INVENTORY)
            .with_rule("status", STATUS)
            .with_rule("health", STATUS)
    }

    /// Build from `(keyword, intent id)` pairs.
    pub fn from_rules(rules: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(k, id)| (k.to_lowercase(), id))
                .collect(),
            id_phrases: false,
        }
    }

    /// Append a rule.
    pub fn with_rule(mut self, keyword: impl Into<String>, intent_id: impl Into<String>) -> Self {
        self.rules
            .push((keyword.into().to_lowercase(), intent_id.into()));
        self
    }

    /// Also match a candidate when the input contains its id with
    /// underscores read as spaces (`go_north` matches "go north").
    pub fn matching_id_phrases(mut self) -> Self {
        self.id_phrases = true;
        self
    }

    fn resolve(&self, request: &ClassifyRequest<'_>) -> Classification {
        let input = request.input.to_lowercase();

        for (keyword, id) in &self.rules {
            if input.contains(keyword.as_str()) && request.is_candidate(id) {
                return Classification::Matched(id.clone());
            }
        }

        if self.id_phrases {
            for intent in request.candidates() {
                let phrase = intent.id.to_lowercase().replace('_', " ");
                if input.contains(phrase.as_str()) {
                    return Classification::Matched(intent.id.clone());
                }
            }
        }

        Classification::Unknown
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(
        &self,
        request: &ClassifyRequest<'_>,
    ) -> Result<Classification, ClassifierError> {
        Ok(self.resolve(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::GlobalIntents;
    use bl_core::{Intent, IntentAction, Node};

    fn classify(classifier: &KeywordClassifier, node: &Node, input: &str) -> Classification {
        let globals = GlobalIntents::standard();
        let local: Vec<&Intent> = node.intents.iter().collect();
        let global: Vec<&Intent> = globals.iter().collect();
        let request = ClassifyRequest {
            input,
            local: &local,
            global: &global,
            scene_text: &node.text,
            node,
        };
        classifier.resolve(&request)
    }

    fn room() -> Node {
        Node::new("a", "Room A")
            .with_intent(Intent::new("go_b", IntentAction::Transition).with_target("b"))
    }

    #[test]
    fn first_matching_rule_wins() {
        let classifier = KeywordClassifier::new()
            .with_rule("door", "go_b")
            .with_rule("Look", LOOK_AROUND);
        assert_eq!(
            classify(&classifier, &room(), "LOOK at the door"),
            Classification::Matched("go_b".into())
        );
        assert_eq!(
            classify(&classifier, &room(), "look up"),
            Classification::Matched(LOOK_AROUND.into())
        );
    }

    #[test]
    fn rules_for_absent_intents_are_skipped() {
        let classifier = KeywordClassifier::new()
            .with_rule("key", "get_key")
            .with_rule("key", "go_b");
        assert_eq!(
            classify(&classifier, &room(), "key"),
            Classification::Matched("go_b".into())
        );
        assert_eq!(classify(&classifier, &room(), "dance"), Classification::Unknown);
    }

    #[test]
    fn id_phrases() {
        let classifier = KeywordClassifier::standard().matching_id_phrases();
        assert_eq!(
            classify(&classifier, &room(), "I go b now"),
            Classification::Matched("go_b".into())
        );
        assert_eq!(
            classify(&classifier, &room(), "what am I carrying?"),
            Classification::Matched(INVENTORY.into())
        );
        assert_eq!(
            classify(&KeywordClassifier::standard(), &room(), "go b"),
            Classification::Unknown
        );
    }
}
