//! Which intents a player may trigger right now.

use bl_core::state::{state_matches_all, state_matches_any};
use bl_core::{Intent, IntentAction, Node, Session};

use crate::globals::GlobalIntents;

/// Eligible intents at a node, split into node-local and engine-wide.
#[derive(Debug, Clone)]
pub struct EligibleIntents<'a> {
    /// Node intents that pass every gate, in node order.
    pub local: Vec<&'a Intent>,
    /// The global intents, always present.
    pub global: Vec<&'a Intent>,
}

impl<'a> EligibleIntents<'a> {
    /// All eligible intents, local first.
    pub fn all(&self) -> impl Iterator<Item = &'a Intent> + '_ {
        self.local.iter().chain(self.global.iter()).copied()
    }

    /// Find an eligible intent by id.
    pub fn find(&self, id: &str) -> Option<&'a Intent> {
        self.all().find(|i| i.id == id)
    }

    /// True when `id` names an eligible intent.
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

/// True when `intent` passes its item and state gates for `session`.
///
/// Pickups of items already held are never eligible.
pub fn is_eligible(intent: &Intent, session: &Session) -> bool {
    if !intent.requires.iter().all(|item| session.has_item(item)) {
        return false;
    }
    if intent.requires_not.iter().any(|item| session.has_item(item)) {
        return false;
    }
    if !state_matches_all(&session.state, &intent.requires_state) {
        return false;
    }
    if state_matches_any(&session.state, &intent.requires_not_state) {
        return false;
    }
    if intent.action == Some(IntentAction::Pickup)
        && let Some(item) = &intent.item_id
        && session.has_item(item)
    {
        return false;
    }
    true
}

/// Compute the eligible intents of `node` for `session`.
pub fn eligible_intents<'a>(
    node: &'a Node,
    session: &Session,
    globals: &'a GlobalIntents,
) -> EligibleIntents<'a> {
    EligibleIntents {
        local: node
            .intents
            .iter()
            .filter(|intent| is_eligible(intent, session))
            .collect(),
        global: globals.iter().collect(),
    }
}
