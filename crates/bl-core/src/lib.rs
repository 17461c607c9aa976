//! Core types for Baseline: stories, intents, sessions, and session state.
//!
//! This crate is the data model the engine runs on. It does no I/O apart
//! from [`StoryLibrary`], which reads story directories from disk.

/// Error types used throughout the crate.
pub mod error;
/// Input normalization and intent cache keys.
pub mod input;
/// Loading and validating story directories.
pub mod library;
/// Player sessions and their identifiers.
pub mod session;
/// Session state values and state conditions.
pub mod state;
/// Story manifests, nodes, and intents.
pub mod story;

/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export input helpers.
pub use input::{CacheKey, normalize_input};
/// Re-export library types.
pub use library::{IssueKind, StoryBundle, StoryIssue, StoryLibrary};
/// Re-export session types.
pub use session::{Session, SessionId};
/// Re-export state types.
pub use state::{StateMap, StateValue};
/// Re-export story types.
pub use story::{Intent, IntentAction, Node, StoryManifest, TextConditional};
