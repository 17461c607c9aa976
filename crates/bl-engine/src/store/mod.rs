//! Storage ports the engine reads and writes through.

mod memory;

use async_trait::async_trait;
use bl_core::{CacheKey, Node, Session, SessionId, StoryManifest};

use crate::error::StoreError;

pub use memory::{MemoryIntentCache, MemorySessionStore, MemoryStoryStore};

/// Read-only access to published stories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Get a story manifest.
    async fn manifest(&self, story_id: &str) -> Result<Option<StoryManifest>, StoreError>;

    /// Get a node of a story.
    async fn node(&self, story_id: &str, node_id: &str) -> Result<Option<Node>, StoreError>;
}

/// Player sessions, active and archived.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get an active session.
    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Create or overwrite an active session.
    async fn put(&self, session: &Session) -> Result<(), StoreError>;

    /// Move an active session to the archive. [`StoreError::Missing`] if it is not active.
    async fn archive(&self, id: SessionId) -> Result<(), StoreError>;

    /// Remove an active session.
    async fn delete(&self, id: SessionId) -> Result<(), StoreError>;
}

/// Remembered classifications, keyed by story, node, and normalized input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntentCache: Send + Sync {
    /// Look up a cached intent id.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError>;

    /// Store an intent id, replacing any previous entry.
    async fn set(&self, key: &CacheKey, intent_id: &str) -> Result<(), StoreError>;
}
