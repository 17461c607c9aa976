//! Node text selection.

use bl_core::state::state_matches_all;
use bl_core::{Node, Session};

/// Pick the text to show for `node` and mark it visited.
///
/// The first conditional whose `if_state` matches wins. Otherwise a node
/// seen before shows its revisit text when it has one, else its plain text.
/// The visit is recorded after the revisit check, so a first visit never
/// shows revisit text.
pub fn resolve_node_text(node: &Node, session: &mut Session) -> String {
    let seen_before = !session.mark_visited(node.id.as_str());

    if let Some(conditional) = node
        .text_conditionals
        .iter()
        .find(|c| state_matches_all(&session.state, &c.if_state))
    {
        return conditional.text.clone();
    }

    match &node.text_revisit {
        Some(revisit) if seen_before => revisit.clone(),
        _ => node.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_core::{SessionId, StateMap, StateValue};

    fn flag(key: &str, value: bool) -> StateMap {
        let mut map = StateMap::new();
        map.insert(key.to_string(), StateValue::Boolean(value));
        map
    }

    #[test]
    fn revisit_text_from_second_visit() {
        let node = Node::new("hall", "A long hall.").with_revisit("The hall again.");
        let mut session = Session::new(SessionId::new());
        assert_eq!(resolve_node_text(&node, &mut session), "A long hall.");
        assert_eq!(resolve_node_text(&node, &mut session), "The hall again.");
        assert_eq!(session.visited_nodes, vec!["hall"]);
    }

    #[test]
    fn first_matching_conditional_wins() {
        let node = Node::new("lab", "It is silent.")
            .with_revisit("Still silent.")
            .with_conditional(flag("power_on", true), "It hums.")
            .with_conditional(flag("power_on", true), "Never shown.");
        let mut session = Session::new(SessionId::new());
        assert_eq!(resolve_node_text(&node, &mut session), "It is silent.");

        session.apply_state(&flag("power_on", true));
        assert_eq!(resolve_node_text(&node, &mut session), "It hums.");
    }

    #[test]
    fn conditional_beats_revisit_and_still_marks_visit() {
        let node = Node::new("lab", "It is silent.")
            .with_revisit("Still silent.")
            .with_conditional(flag("power_on", true), "It hums.");
        let mut session = Session::new(SessionId::new());
        session.apply_state(&flag("power_on", true));
        assert_eq!(resolve_node_text(&node, &mut session), "It hums.");
        assert!(session.has_visited("lab"));

        session.apply_state(&flag("power_on", false));
        assert_eq!(resolve_node_text(&node, &mut session), "Still silent.");
    }

    #[test]
    fn no_revisit_text_repeats_plain_text() {
        let node = Node::new("cell", "Four walls.");
        let mut session = Session::new(SessionId::new());
        resolve_node_text(&node, &mut session);
        assert_eq!(resolve_node_text(&node, &mut session), "Four walls.");
    }
}
