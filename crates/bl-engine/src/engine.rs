//! The game engine: story start, turn handling, and intent correction.

use std::sync::Arc;

use bl_core::{
    CacheKey, Intent, IntentAction, Node, Session, SessionId, normalize_input,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{Classification, ClassifyRequest, IntentClassifier};
use crate::clock::{ClockPort, RandomPort, SystemClock, SystemRandom};
use crate::config::EngineConfig;
use crate::eligibility::{EligibleIntents, eligible_intents};
use crate::error::{CorrectionError, EngineError, EngineResult};
use crate::globals::{GlobalIntents, GlobalKind, inventory_text, look_around_text, status_text};
use crate::hooks::{HookBus, HookContext, HookPoint};
use crate::locks::SessionLocks;
use crate::response::{Ending, GameResponse, TurnOutcome};
use crate::store::{IntentCache, SessionStore, StoryStore};
use crate::text::resolve_node_text;

const NO_RESPONSE: &str = "There is no response.";
const INVALID_INTENT: &str = "System Error: AI returned invalid intent ID.";
const ACTION_UNDEFINED: &str = "System Error: Action undefined.";
const RECALIBRATED: &str = "Intent recalibrated.";

/// An intent offered to the player, as listed for corrections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentSummary {
    /// Intent id.
    pub id: String,
    /// Human-readable label.
    pub intent_description: String,
}

/// Result of a successful correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    /// Confirmation for the player.
    pub message: String,
    /// The replayed turn.
    pub response: TurnOutcome,
}

/// Runs stories for many sessions at once.
///
/// Turns on one session are serialized; turns on different sessions run
/// concurrently. A turn either persists the session or returns an error
/// with nothing written.
pub struct GameEngine {
    stories: Arc<dyn StoryStore>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn IntentCache>,
    classifier: Arc<dyn IntentClassifier>,
    hooks: Arc<HookBus>,
    globals: GlobalIntents,
    config: EngineConfig,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    locks: SessionLocks,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("classifier", &self.classifier.name())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Create an engine with default configuration, no hooks, and system time.
    pub fn new(
        stories: Arc<dyn StoryStore>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn IntentCache>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            stories,
            sessions,
            cache,
            classifier,
            hooks: Arc::new(HookBus::new()),
            globals: GlobalIntents::standard(),
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            random: Arc::new(SystemRandom),
            locks: SessionLocks::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the hook bus.
    pub fn with_hooks(mut self, hooks: Arc<HookBus>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the global intents.
    pub fn with_globals(mut self, globals: GlobalIntents) -> Self {
        self.globals = globals;
        self
    }

    /// Set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the random source.
    pub fn with_random(mut self, random: Arc<dyn RandomPort>) -> Self {
        self.random = random;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `server:init` hooks.
    pub async fn init(&self) {
        self.hooks
            .broadcast(&HookContext::new(HookPoint::ServerInit))
            .await;
        info!(classifier = self.classifier.name(), "engine ready");
    }

    /// Create and store an empty session.
    pub async fn create_session(&self) -> EngineResult<Session> {
        let mut session = Session::new(SessionId::new());
        session.created_at = Some(self.clock.now());
        self.sessions.put(&session).await?;
        info!(session = %session.id, "session created");
        self.hooks
            .broadcast(&HookContext::new(HookPoint::SessionCreate).with_session(&session))
            .await;
        Ok(session)
    }

    /// Read a session. Malformed ids read as missing.
    pub async fn session(&self, session_id: &str) -> EngineResult<Option<Session>> {
        match SessionId::parse(session_id) {
            Ok(id) => Ok(self.sessions.get(id).await?),
            Err(_) => Ok(None),
        }
    }

    /// Start (or restart) a story on a session, creating the session if needed.
    pub async fn start_story(&self, session_id: &str, story_id: &str) -> EngineResult<GameResponse> {
        let id = SessionId::parse(session_id)?;
        let _turn = self.locks.acquire(id).await;

        let mut session = match self.sessions.get(id).await? {
            Some(session) => session,
            None => {
                warn!(session = %id, "session not found, creating a fresh one");
                let mut session = Session::new(id);
                session.created_at = Some(self.clock.now());
                session
            }
        };

        let manifest = self
            .stories
            .manifest(story_id)
            .await?
            .ok_or_else(|| EngineError::StoryNotFound(story_id.to_string()))?;

        session.begin_story(&manifest.id, &manifest.start_node);
        let node = self.load_node(&manifest.id, &manifest.start_node).await?;
        let text = resolve_node_text(&node, &mut session);
        self.sessions.put(&session).await?;

        info!(session = %id, story = %manifest.id, node = %node.id, "story started");
        Ok(GameResponse::intro(text))
    }

    /// Eligible intents that carry a label. Empty for missing sessions or
    /// sessions without a story.
    pub async fn available_intents(&self, session_id: &str) -> EngineResult<Vec<IntentSummary>> {
        let Some(session) = self.session(session_id).await? else {
            return Ok(Vec::new());
        };
        let Some((story, node_id)) = session.position() else {
            return Ok(Vec::new());
        };
        let node = self.load_node(story, node_id).await?;
        let eligible = eligible_intents(&node, &session, &self.globals);
        Ok(eligible
            .all()
            .filter_map(|intent| {
                intent
                    .intent_description
                    .as_ref()
                    .filter(|d| !d.is_empty())
                    .map(|d| IntentSummary {
                        id: intent.id.clone(),
                        intent_description: d.clone(),
                    })
            })
            .collect())
    }

    /// Handle one line of player input.
    pub async fn handle_input(&self, session_id: &str, input: &str) -> EngineResult<TurnOutcome> {
        let Ok(id) = SessionId::parse(session_id) else {
            warn!(session = session_id, "malformed session id");
            return Ok(TurnOutcome::expired());
        };
        let _turn = self.locks.acquire(id).await;
        self.handle_input_locked(id, input).await
    }

    /// Overwrite the cached classification of the last input and replay it.
    pub async fn correct_intent(
        &self,
        session_id: &str,
        input: &str,
        intent_id: &str,
    ) -> Result<CorrectionOutcome, CorrectionError> {
        let id = SessionId::parse(session_id).map_err(|_| CorrectionError::SessionNotFound)?;
        let _turn = self.locks.acquire(id).await;

        let session = self
            .sessions
            .get(id)
            .await
            .map_err(EngineError::from)?
            .ok_or(CorrectionError::SessionNotFound)?;

        let last_at = session
            .last_input_timestamp
            .ok_or(CorrectionError::WindowExpired)?;
        let elapsed = self.clock.now().signed_duration_since(last_at);
        let window = chrono::Duration::from_std(self.config.correction_window)
            .unwrap_or(chrono::Duration::MAX);
        if elapsed > window {
            return Err(CorrectionError::WindowExpired);
        }

        if session.last_input.as_deref() != Some(normalize_input(input).as_str()) {
            return Err(CorrectionError::InputMismatch);
        }

        if intent_id.is_empty()
            || !intent_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CorrectionError::InvalidIntentId);
        }

        let (story, node) = session
            .position()
            .ok_or_else(|| EngineError::NotStarted(id.to_string()))?;
        let key = CacheKey::new(story, node, input);
        self.cache
            .set(&key, intent_id)
            .await
            .map_err(EngineError::from)?;
        info!(session = %id, key = %key, intent = intent_id, "intent corrected");

        let response = self.handle_input_locked(id, input).await?;
        Ok(CorrectionOutcome {
            message: RECALIBRATED.to_string(),
            response,
        })
    }

    async fn load_node(&self, story: &str, node: &str) -> EngineResult<Node> {
        self.stories
            .node(story, node)
            .await?
            .ok_or_else(|| EngineError::NodeNotFound {
                story: story.to_string(),
                node: node.to_string(),
            })
    }

    async fn classify(&self, request: &ClassifyRequest<'_>) -> Classification {
        let call = self.classifier.classify(request);
        match tokio::time::timeout(self.config.classifier_timeout, call).await {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => {
                warn!(classifier = self.classifier.name(), error = %e, "classification failed");
                Classification::Unknown
            }
            Err(_) => {
                warn!(
                    classifier = self.classifier.name(),
                    timeout_ms = self.config.classifier_timeout.as_millis() as u64,
                    "classification timed out"
                );
                Classification::Unknown
            }
        }
    }

    async fn after_input(
        &self,
        session: &Session,
        node: &Node,
        input: &str,
        response: GameResponse,
    ) -> TurnOutcome {
        let ctx = HookContext::new(HookPoint::AfterInput)
            .with_session(session)
            .with_node(node)
            .with_input(input);
        self.hooks.waterfall(&ctx, response).await.into()
    }

    /// Persist, then run after-input hooks.
    async fn finish(
        &self,
        session: &Session,
        node: &Node,
        input: &str,
        response: GameResponse,
    ) -> EngineResult<TurnOutcome> {
        self.sessions.put(session).await?;
        Ok(self.after_input(session, node, input, response).await)
    }

    async fn handle_input_locked(&self, id: SessionId, input: &str) -> EngineResult<TurnOutcome> {
        let Some(mut session) = self.sessions.get(id).await? else {
            warn!(session = %id, "session not found (expired or archived)");
            return Ok(TurnOutcome::expired());
        };
        debug!(session = %id, input, "handling input");

        let before = HookContext::new(HookPoint::BeforeInput)
            .with_session(&session)
            .with_input(input);
        if let Some(response) = self.hooks.first_result(&before).await {
            self.sessions.put(&session).await?;
            return Ok(response.into());
        }

        let (story_id, node_id) = session
            .position()
            .map(|(s, n)| (s.to_string(), n.to_string()))
            .ok_or_else(|| EngineError::NotStarted(id.to_string()))?;
        let node = self.load_node(&story_id, &node_id).await?;

        if self.config.debug_commands && input.trim() == "debug" {
            let dump = serde_json::to_string_pretty(&node).unwrap_or_default();
            self.sessions.put(&session).await?;
            return Ok(GameResponse::info(dump).into());
        }

        let eligible = eligible_intents(&node, &session, &self.globals);
        let key = CacheKey::new(&story_id, &node_id, input);

        let (classification, optimized) = match self.cache.get(&key).await? {
            Some(cached) => {
                debug!(key = %key, intent = %cached, "intent cache hit");
                let classification = match Classification::from_id(&cached) {
                    Classification::Matched(intent_id) if !eligible.contains(&intent_id) => {
                        debug!(key = %key, intent = %intent_id, "cached intent no longer eligible");
                        Classification::Unknown
                    }
                    other => other,
                };
                (classification, false)
            }
            None => {
                debug!(key = %key, "intent cache miss");
                let scene_text = resolve_node_text(&node, &mut session);
                let request = ClassifyRequest {
                    input,
                    local: &eligible.local,
                    global: &eligible.global,
                    scene_text: &scene_text,
                    node: &node,
                };
                let classification = self.classify(&request).await;
                info!(
                    session = %id,
                    classifier = self.classifier.name(),
                    intent = %classification,
                    "input classified"
                );
                if let Classification::Matched(intent_id) = &classification
                    && eligible.contains(intent_id)
                {
                    self.cache.set(&key, intent_id).await?;
                    debug!(key = %key, intent = %intent_id, "intent cached");
                }
                (classification, true)
            }
        };

        session.record_input(key.input.clone(), self.clock.now());

        let intent_id = match classification {
            Classification::Unknown => {
                let text = self.unknown_text(&mut session, &eligible.local);
                let response = GameResponse::info(text).classified(optimized);
                return self.finish(&session, &node, input, response).await;
            }
            Classification::Matched(intent_id) => intent_id,
        };

        if let Some(kind) = GlobalKind::from_id(&intent_id).filter(|_| eligible.contains(&intent_id)) {
            session.fail_count = 0;
            let text = match kind {
                GlobalKind::LookAround => look_around_text(&eligible.local, &session),
                GlobalKind::Inventory => inventory_text(&session),
                GlobalKind::Status => status_text(&session),
            };
            let response = GameResponse::info(text).classified(optimized);
            return self.finish(&session, &node, input, response).await;
        }

        session.fail_count = 0;
        let Some(intent) = eligible.find(&intent_id) else {
            warn!(session = %id, intent = %intent_id, "classified intent is not eligible");
            let response = GameResponse::error(INVALID_INTENT).classified(optimized);
            return self.finish(&session, &node, input, response).await;
        };

        let will_resolve = HookContext::new(HookPoint::WillResolveIntent)
            .with_session(&session)
            .with_input(input)
            .with_intent(intent)
            .with_node(&node);
        if let Some(response) = self.hooks.first_result(&will_resolve).await {
            return self.finish(&session, &node, input, response).await;
        }

        session.apply_state(&intent.set_state);
        let revealed_text = apply_reveals(intent, &eligible, &mut session);

        let response = match (intent.action, &intent.target, &intent.item_id) {
            (Some(IntentAction::Pickup), _, Some(item)) => {
                session.add_item(item.as_str());
                let text = intent
                    .response
                    .clone()
                    .unwrap_or_else(|| format!("You picked up {item}."));
                GameResponse::info(text)
            }
            (Some(IntentAction::Transition), Some(target), _) => {
                let next = self.load_node(&story_id, target).await?;
                session.current_node_id = Some(next.id.clone());
                let text = resolve_node_text(&next, &mut session);
                info!(session = %id, from = %node_id, to = %next.id, "transition");
                GameResponse::story(text)
            }
            (Some(IntentAction::Text), _, _) => GameResponse::info(format!(
                "{}{}",
                intent.response.as_deref().unwrap_or_default(),
                revealed_text
            )),
            (Some(IntentAction::EndGame), _, _) => {
                let response = self.end_game(&mut session, &story_id, intent).await?;
                return Ok(self
                    .after_input(&session, &node, input, response.classified(optimized))
                    .await);
            }
            _ => {
                warn!(session = %id, intent = %intent.id, "intent has no usable action");
                GameResponse::error(ACTION_UNDEFINED)
            }
        };

        self.finish(&session, &node, input, response.classified(optimized))
            .await
    }

    /// Count an unresolved turn and pick its reply.
    fn unknown_text(&self, session: &mut Session, local: &[&Intent]) -> String {
        session.fail_count += 1;
        if session.fail_count < self.config.fail_hint_threshold {
            return NO_RESPONSE.to_string();
        }
        session.fail_count = 0;
        if local.is_empty() {
            return NO_RESPONSE.to_string();
        }
        let pick = local[self.random.gen_index(local.len())];
        format!(
            "Nothing happens.\n\n[TIP: Try something like \"{}\"]",
            hint_phrase(&pick.ai_intent_helper)
        )
    }

    async fn end_game(
        &self,
        session: &mut Session,
        story_id: &str,
        intent: &Intent,
    ) -> EngineResult<GameResponse> {
        session.finished = true;
        self.sessions.put(session).await?;
        if let Err(e) = self.sessions.archive(session.id).await {
            warn!(session = %session.id, error = %e, "could not archive finished session");
        }

        let manifest = match self.stories.manifest(story_id).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(story = story_id, error = %e, "could not load manifest for credits");
                None
            }
        };
        let (author_name, author_id) = manifest
            .map(|m| (m.author_name, m.author_id))
            .unwrap_or_default();
        info!(session = %session.id, story = story_id, "story finished");

        Ok(GameResponse::end(
            intent.response.clone().unwrap_or_default(),
            Ending {
                author_name: author_name.unwrap_or_else(|| "Unknown".to_string()),
                author_id: author_id.unwrap_or_else(|| "unknown".to_string()),
                redirect: self.config.end_redirect.clone(),
            },
        ))
    }
}

/// Record revealed ids and collect the descriptions they uncover.
fn apply_reveals(intent: &Intent, eligible: &EligibleIntents<'_>, session: &mut Session) -> String {
    if intent.reveals.is_empty() {
        return String::new();
    }
    for revealed in &intent.reveals {
        session.reveal(revealed.as_str());
    }
    eligible
        .local
        .iter()
        .filter(|i| intent.reveals.contains(&i.id))
        .filter(|i| i.item_id.as_deref().is_none_or(|item| !session.has_item(item)))
        .filter_map(|i| i.text_description.as_deref())
        .map(|text| format!("\n{text}"))
        .collect()
}

/// Turn a classifier hint into something the player could type.
fn hint_phrase(helper: &str) -> String {
    let lower = helper.to_lowercase();
    let phrase = lower.strip_prefix("the user wants to ").unwrap_or(&lower);
    let phrase = phrase.strip_prefix("the user ").unwrap_or(phrase);
    phrase.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::error::StoreError;
    use crate::store::{
        MemoryIntentCache, MemorySessionStore, MemoryStoryStore, MockSessionStore,
    };
    use bl_core::{StoryBundle, StoryManifest};

    fn story() -> StoryBundle {
        StoryBundle::new(
            StoryManifest::new("demo", "Demo", "a").with_author("ada-1", "Ada"),
            [
                Node::new("a", "Room A")
                    .with_intent(
                        Intent::new("go_b", IntentAction::Transition)
                            .with_helper("The user wants to go to room B")
                            .with_description("Go to room B")
                            .with_target("b"),
                    )
                    .with_intent(Intent::new("broken", IntentAction::Transition)),
                Node::new("b", "Room B"),
            ],
        )
    }

    fn engine() -> GameEngine {
        GameEngine::new(
            Arc::new(MemoryStoryStore::new().with_story(story())),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryIntentCache::new()),
            Arc::new(
                KeywordClassifier::standard()
                    .with_rule("room b", "go_b")
                    .with_rule("break", "broken"),
            ),
        )
    }

    #[test]
    fn hint_phrase_strips_lead_in() {
        assert_eq!(hint_phrase("The user wants to open the hatch"), "open the hatch");
        assert_eq!(hint_phrase("The user looks up"), "looks up");
        assert_eq!(hint_phrase("Pull the lever"), "pull the lever");
    }

    #[tokio::test]
    async fn start_creates_missing_session() {
        let engine = engine();
        let id = SessionId::new().to_string();
        let response = engine.start_story(&id, "demo").await.unwrap();
        assert_eq!(response.text, "Room A");
        let session = engine.session(&id).await.unwrap().unwrap();
        assert_eq!(session.visited_nodes, vec!["a"]);
    }

    #[tokio::test]
    async fn start_rejects_malformed_id() {
        let err = engine().start_story("not-a-uuid", "demo").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(_)));
    }

    #[tokio::test]
    async fn malformed_id_is_expired() {
        let outcome = engine().handle_input("../etc", "look").await.unwrap();
        assert!(outcome.is_expired());
        assert!(engine().available_intents("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_sessions_leave_no_locks_behind() {
        let engine = engine();
        for _ in 0..50 {
            let outcome = engine
                .handle_input(&SessionId::new().to_string(), "look")
                .await
                .unwrap();
            assert!(outcome.is_expired());
        }
        assert!(engine.locks.is_empty());

        let session = engine.create_session().await.unwrap();
        let id = session.id.to_string();
        engine.start_story(&id, "demo").await.unwrap();
        engine.handle_input(&id, "look").await.unwrap();
        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn action_without_target_is_undefined() {
        let engine = engine();
        let session = engine.create_session().await.unwrap();
        let id = session.id.to_string();
        engine.start_story(&id, "demo").await.unwrap();
        let outcome = engine.handle_input(&id, "break it").await.unwrap();
        let response = outcome.response().unwrap();
        assert_eq!(response.text, ACTION_UNDEFINED);
    }

    #[tokio::test]
    async fn store_failure_aborts_turn() {
        let mut sessions = MockSessionStore::new();
        sessions.expect_get().returning(|id| {
            let mut session = Session::new(id);
            session.begin_story("demo", "a");
            Ok(Some(session))
        });
        sessions
            .expect_put()
            .returning(|_| Err(StoreError::Backend("disk full".into())));

        let engine = GameEngine::new(
            Arc::new(MemoryStoryStore::new().with_story(story())),
            Arc::new(sessions),
            Arc::new(MemoryIntentCache::new()),
            Arc::new(KeywordClassifier::standard()),
        );
        let err = engine
            .handle_input(&SessionId::new().to_string(), "look")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn session_without_story_is_an_error() {
        let engine = engine();
        let session = engine.create_session().await.unwrap();
        let err = engine
            .handle_input(&session.id.to_string(), "look")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotStarted(_)));
    }
}
