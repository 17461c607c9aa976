//! Interactive fiction engine for Baseline.
//!
//! Turns free-form player input into story progress: intents are matched
//! by a pluggable classifier, cached per scene, and resolved against the
//! session's inventory, flags, and visited nodes. Hooks let plugins observe
//! or replace results at fixed points of every turn.

/// Intent classifiers and their configuration.
pub mod classifier;
/// Injectable time and randomness.
pub mod clock;
/// Engine configuration.
pub mod config;
/// Which intents a session may trigger.
pub mod eligibility;
/// The turn state machine.
pub mod engine;
/// Error types for the engine.
pub mod error;
/// Built-in global intents.
pub mod globals;
/// Extension hooks and plugins.
pub mod hooks;
/// Per-session turn serialization.
pub mod locks;
/// Responses returned to players.
pub mod response;
/// Story, session, and cache stores.
pub mod store;
/// Scene text selection.
pub mod text;

pub use classifier::{Classification, ClassifierConfig, ClassifyRequest, IntentClassifier};
pub use clock::{ClockPort, ManualClock, RandomPort, SeededRandom, SystemClock, SystemRandom};
pub use config::EngineConfig;
pub use engine::{CorrectionOutcome, GameEngine, IntentSummary};
pub use error::{ClassifierError, CorrectionError, EngineError, EngineResult, HookError, StoreError};
pub use globals::GlobalIntents;
pub use hooks::{FnHook, Hook, HookBus, HookContext, HookPoint, Plugin, PluginRegistrar};
pub use response::{Ending, GameResponse, ResponseKind, TurnOutcome};
pub use store::{
    IntentCache, MemoryIntentCache, MemorySessionStore, MemoryStoryStore, SessionStore, StoryStore,
};
