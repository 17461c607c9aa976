use std::collections::HashMap;

use async_trait::async_trait;
use bl_core::{CacheKey, Node, Session, SessionId, StoryBundle, StoryLibrary, StoryManifest};
use dashmap::DashMap;
use tokio::sync::RwLock;

use super::{IntentCache, SessionStore, StoryStore};
use crate::error::StoreError;

/// Stories held in memory.
#[derive(Debug, Default)]
pub struct MemoryStoryStore {
    stories: HashMap<String, StoryBundle>,
}

impl MemoryStoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve every story of a loaded library.
    pub fn from_library(library: &StoryLibrary) -> Self {
        let mut store = Self::new();
        for bundle in library.stories() {
            store.insert(bundle.clone());
        }
        store
    }

    /// Add or replace a story.
    pub fn insert(&mut self, bundle: StoryBundle) {
        self.stories.insert(bundle.manifest.id.clone(), bundle);
    }

    /// Builder form of [`MemoryStoryStore::insert`].
    pub fn with_story(mut self, bundle: StoryBundle) -> Self {
        self.insert(bundle);
        self
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn manifest(&self, story_id: &str) -> Result<Option<StoryManifest>, StoreError> {
        Ok(self.stories.get(story_id).map(|s| s.manifest.clone()))
    }

    async fn node(&self, story_id: &str, node_id: &str) -> Result<Option<Node>, StoreError> {
        Ok(self
            .stories
            .get(story_id)
            .and_then(|s| s.nodes.get(node_id))
            .cloned())
    }
}

const ACTIVE_PREFIX: &str = "session";
const ARCHIVE_PREFIX: &str = "disabled_session";

fn key(prefix: &str, id: SessionId) -> String {
    format!("{prefix}:{id}")
}

/// Sessions held in memory as JSON records.
///
/// Active and archived records live under separate key prefixes.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw JSON record as an active session, e.g. one written by an older version.
    pub async fn insert_raw(&self, id: SessionId, json: impl Into<String>) {
        self.records
            .write()
            .await
            .insert(key(ACTIVE_PREFIX, id), json.into());
    }

    /// Get an archived session.
    pub async fn archived(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.read(&key(ARCHIVE_PREFIX, id)).await
    }

    /// Number of active sessions.
    pub async fn active_count(&self) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(&format!("{ACTIVE_PREFIX}:")))
            .count()
    }

    async fn read(&self, key: &str) -> Result<Option<Session>, StoreError> {
        let records = self.records.read().await;
        let Some(json) = records.get(key) else {
            return Ok(None);
        };
        Session::from_json(json)
            .map(Some)
            .map_err(|source| StoreError::Record {
                key: key.to_string(),
                source,
            })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        self.read(&key(ACTIVE_PREFIX, id)).await
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        let key = key(ACTIVE_PREFIX, session.id);
        let json = session.to_json().map_err(|source| StoreError::Record {
            key: key.clone(),
            source,
        })?;
        self.records.write().await.insert(key, json);
        Ok(())
    }

    async fn archive(&self, id: SessionId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let active = key(ACTIVE_PREFIX, id);
        let json = records
            .remove(&active)
            .ok_or(StoreError::Missing(active))?;
        records.insert(key(ARCHIVE_PREFIX, id), json);
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        self.records.write().await.remove(&key(ACTIVE_PREFIX, id));
        Ok(())
    }
}

/// Intent cache backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryIntentCache {
    entries: DashMap<String, String>,
}

impl MemoryIntentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl IntentCache for MemoryIntentCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(&key.to_string()).map(|e| e.value().clone()))
    }

    async fn set(&self, key: &CacheKey, intent_id: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), intent_id.to_string());
        Ok(())
    }
}
