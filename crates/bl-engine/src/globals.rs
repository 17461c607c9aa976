//! Intents every node offers, and the texts they produce.

use bl_core::{Intent, Session, StateValue};

/// Id of the look-around intent.
pub const LOOK_AROUND: &str = "global_look_around";
/// Id of the inventory intent.
pub const INVENTORY: &str = "global_inventory";
/// Id of the status intent.
pub const STATUS: &str = "global_status";

/// Which engine-wide intent an id names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    /// List what can be seen here.
    LookAround,
    /// List held items.
    Inventory,
    /// Summarize progress.
    Status,
}

impl GlobalKind {
    /// Map an intent id to a global kind.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            LOOK_AROUND => Some(Self::LookAround),
            INVENTORY => Some(Self::Inventory),
            STATUS => Some(Self::Status),
            _ => None,
        }
    }
}

/// The fixed set of engine-wide intents, always eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalIntents {
    intents: Vec<Intent>,
}

impl Default for GlobalIntents {
    fn default() -> Self {
        Self::standard()
    }
}

impl GlobalIntents {
    /// The standard look-around, inventory, and status intents.
    pub fn standard() -> Self {
        Self {
            intents: vec![
                Intent::described(
                    LOOK_AROUND,
                    "The user wants to look around, inspect the surroundings, or see what is visible.",
                    "Look around",
                ),
                Intent::described(
                    INVENTORY,
                    "The user wants to check their inventory or see what they are carrying.",
                    "Check inventory",
                ),
                Intent::described(
                    STATUS,
                    "The user wants to check their overall status, health, or active effects.",
                    "Check status",
                ),
            ],
        }
    }

    /// Iterate over the intents.
    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    /// Find a global intent by id.
    pub fn get(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == id)
    }
}

/// Text for look-around: descriptions of visible local intents, one per line.
pub fn look_around_text(local: &[&Intent], session: &Session) -> String {
    let lines: Vec<&str> = local
        .iter()
        .filter(|intent| intent.is_visible(&session.revealed_items))
        .filter_map(|intent| intent.text_description.as_deref())
        .collect();
    if lines.is_empty() {
        "You see nothing of interest.".to_string()
    } else {
        lines.join("\n")
    }
}

/// Text for the inventory intent.
pub fn inventory_text(session: &Session) -> String {
    if session.inventory.is_empty() {
        "You are not carrying anything.".to_string()
    } else {
        format!("You are carrying: {}", session.inventory.join(", "))
    }
}

/// Text for the status intent.
pub fn status_text(session: &Session) -> String {
    // Falsy values read as unset.
    let health = session
        .state_value("health")
        .filter(|v| {
            !matches!(
                v,
                StateValue::Boolean(false) | StateValue::Integer(0)
            ) && !matches!(v, StateValue::String(s) if s.is_empty())
        })
        .map(|v| v.to_string())
        .unwrap_or_else(|| "OK".to_string());
    format!(
        "Status Report:\n- Health: {health}\n- Inventory: {} items\n- Visited Locations: {}",
        session.inventory.len(),
        session.visited_nodes.len()
    )
}
