//! Extension hooks: ordered callbacks that can observe or replace turn results.
//!
//! Each [`HookPoint`] has a fixed [`Dispatch`] discipline. Subscribers run in
//! priority order, highest first; equal priorities keep registration order.
//! A failing subscriber is logged and skipped, never fatal to the turn.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bl_core::{Intent, Node, Session};
use tracing::{debug, info, warn};

use crate::error::HookError;
use crate::response::GameResponse;

/// Where in the engine a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Host startup.
    ServerInit,
    /// A new session was created.
    SessionCreate,
    /// Before input is interpreted. May answer the turn outright.
    BeforeInput,
    /// After an intent is matched, before its effects apply. May answer the turn.
    WillResolveIntent,
    /// On every response produced by intent resolution. May rewrite it.
    AfterInput,
}

impl HookPoint {
    /// Every hook point.
    pub const ALL: [HookPoint; 5] = [
        HookPoint::ServerInit,
        HookPoint::SessionCreate,
        HookPoint::BeforeInput,
        HookPoint::WillResolveIntent,
        HookPoint::AfterInput,
    ];

    /// Wire name, e.g. `game:beforeInput`.
    pub fn name(self) -> &'static str {
        match self {
            Self::ServerInit => "server:init",
            Self::SessionCreate => "session:create",
            Self::BeforeInput => "game:beforeInput",
            Self::WillResolveIntent => "game:willResolveIntent",
            Self::AfterInput => "game:afterInput",
        }
    }

    /// Look up a hook point by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// How subscribers at this point are run.
    pub fn dispatch(self) -> Dispatch {
        match self {
            Self::ServerInit | Self::SessionCreate => Dispatch::Broadcast,
            Self::BeforeInput | Self::WillResolveIntent => Dispatch::FirstResult,
            Self::AfterInput => Dispatch::Waterfall,
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the subscribers of a hook point are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Run all, ignore results.
    Broadcast,
    /// Stop at the first subscriber that returns a response.
    FirstResult,
    /// Thread a response through every subscriber.
    Waterfall,
}

/// What a hook gets to see.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The point being run.
    pub point: HookPoint,
    /// The session of the turn, if any.
    pub session: Option<&'a Session>,
    /// Raw player input.
    pub input: Option<&'a str>,
    /// Matched intent, at [`HookPoint::WillResolveIntent`].
    pub intent: Option<&'a Intent>,
    /// Current node.
    pub node: Option<&'a Node>,
}

impl<'a> HookContext<'a> {
    /// An empty context for `point`.
    pub fn new(point: HookPoint) -> Self {
        Self {
            point,
            session: None,
            input: None,
            intent: None,
            node: None,
        }
    }

    /// Attach the session.
    pub fn with_session(mut self, session: &'a Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Attach the raw input.
    pub fn with_input(mut self, input: &'a str) -> Self {
        self.input = Some(input);
        self
    }

    /// Attach the matched intent.
    pub fn with_intent(mut self, intent: &'a Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Attach the current node.
    pub fn with_node(mut self, node: &'a Node) -> Self {
        self.node = Some(node);
        self
    }
}

/// A hook subscriber.
///
/// `value` is the response being threaded at waterfall points and `None`
/// elsewhere. Returning `Some` answers a first-result point or replaces the
/// value at a waterfall point; `None` passes.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run the hook.
    async fn call(
        &self,
        ctx: &HookContext<'_>,
        value: Option<&GameResponse>,
    ) -> Result<Option<GameResponse>, HookError>;
}

type HookFn = dyn Fn(&HookContext<'_>, Option<&GameResponse>) -> Result<Option<GameResponse>, HookError>
    + Send
    + Sync;

/// A hook backed by a plain closure.
pub struct FnHook {
    name: String,
    f: Box<HookFn>,
}

impl FnHook {
    /// Wrap a closure.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HookContext<'_>, Option<&GameResponse>) -> Result<Option<GameResponse>, HookError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl Hook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        ctx: &HookContext<'_>,
        value: Option<&GameResponse>,
    ) -> Result<Option<GameResponse>, HookError> {
        (self.f)(ctx, value)
    }
}

struct Subscriber {
    priority: i32,
    hook: Arc<dyn Hook>,
}

/// Registry of hook subscribers.
#[derive(Default)]
pub struct HookBus {
    subscribers: HashMap<HookPoint, Vec<Subscriber>>,
    plugins: Vec<String>,
}

impl fmt::Debug for HookBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .subscribers
            .iter()
            .map(|(p, subs)| (p.name(), subs.len()))
            .collect();
        f.debug_struct("HookBus")
            .field("subscribers", &counts)
            .field("plugins", &self.plugins)
            .finish()
    }
}

impl HookBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `hook` at `point`.
    pub fn register(&mut self, point: HookPoint, priority: i32, hook: Arc<dyn Hook>) {
        debug!(hook = point.name(), name = hook.name(), priority, "hook registered");
        let subs = self.subscribers.entry(point).or_default();
        let at = subs
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(subs.len());
        subs.insert(at, Subscriber { priority, hook });
    }

    /// Subscribe a closure at `point`.
    pub fn register_fn<F>(&mut self, point: HookPoint, priority: i32, name: impl Into<String>, f: F)
    where
        F: Fn(&HookContext<'_>, Option<&GameResponse>) -> Result<Option<GameResponse>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.register(point, priority, Arc::new(FnHook::new(name, f)));
    }

    /// Install a plugin: its hooks are registered at the plugin's priority.
    ///
    /// A plugin id that is already installed is skipped.
    pub fn install(&mut self, plugin: &dyn Plugin) {
        let id = plugin.id().to_string();
        if self.plugins.contains(&id) {
            warn!(plugin = %id, "plugin already installed, skipping");
            return;
        }
        let priority = plugin.priority();
        plugin.init(&mut PluginRegistrar {
            bus: self,
            priority,
        });
        info!(plugin = %id, priority, "plugin installed");
        self.plugins.push(id);
    }

    /// Ids of installed plugins, in install order.
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Number of subscribers at `point`.
    pub fn len(&self, point: HookPoint) -> usize {
        self.subscribers.get(&point).map_or(0, Vec::len)
    }

    /// True when nothing is subscribed anywhere.
    pub fn is_empty(&self) -> bool {
        self.subscribers.values().all(Vec::is_empty)
    }

    fn subscribers(&self, point: HookPoint) -> &[Subscriber] {
        self.subscribers
            .get(&point)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Run every subscriber, ignoring results.
    pub async fn broadcast(&self, ctx: &HookContext<'_>) {
        for sub in self.subscribers(ctx.point) {
            if let Err(e) = sub.hook.call(ctx, None).await {
                warn!(hook = ctx.point.name(), error = %e, "hook failed");
            }
        }
    }

    /// Run subscribers until one returns a response.
    pub async fn first_result(&self, ctx: &HookContext<'_>) -> Option<GameResponse> {
        for sub in self.subscribers(ctx.point) {
            match sub.hook.call(ctx, None).await {
                Ok(Some(response)) => {
                    debug!(hook = ctx.point.name(), name = sub.hook.name(), "hook answered");
                    return Some(response);
                }
                Ok(None) => {}
                Err(e) => warn!(hook = ctx.point.name(), error = %e, "hook failed"),
            }
        }
        None
    }

    /// Thread `value` through every subscriber.
    pub async fn waterfall(&self, ctx: &HookContext<'_>, mut value: GameResponse) -> GameResponse {
        for sub in self.subscribers(ctx.point) {
            match sub.hook.call(ctx, Some(&value)).await {
                Ok(Some(next)) => value = next,
                Ok(None) => {}
                Err(e) => warn!(hook = ctx.point.name(), error = %e, "hook failed"),
            }
        }
        value
    }
}

/// Handle a plugin registers its hooks through.
pub struct PluginRegistrar<'a> {
    bus: &'a mut HookBus,
    priority: i32,
}

impl PluginRegistrar<'_> {
    /// Subscribe `hook` at the plugin's priority.
    pub fn on(&mut self, point: HookPoint, hook: Arc<dyn Hook>) {
        self.bus.register(point, self.priority, hook);
    }

    /// Subscribe a closure at the plugin's priority.
    pub fn on_fn<F>(&mut self, point: HookPoint, name: impl Into<String>, f: F)
    where
        F: Fn(&HookContext<'_>, Option<&GameResponse>) -> Result<Option<GameResponse>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.bus.register_fn(point, self.priority, name, f);
    }
}

/// A bundle of hooks installed together.
pub trait Plugin: Send + Sync {
    /// Unique plugin id.
    fn id(&self) -> &str;

    /// Priority for all of this plugin's hooks. Higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Register hooks.
    fn init(&self, hooks: &mut PluginRegistrar<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tag(label: &'static str) -> impl Fn(&HookContext<'_>, Option<&GameResponse>) -> Result<Option<GameResponse>, HookError>
    + Send
    + Sync
    + 'static {
        move |_, value| {
            let text = value.map(|v| v.text.clone()).unwrap_or_default();
            Ok(Some(GameResponse::info(format!("{text}{label}"))))
        }
    }

    #[test]
    fn names_round_trip() {
        for point in HookPoint::ALL {
            assert_eq!(HookPoint::from_name(point.name()), Some(point));
        }
        assert_eq!(HookPoint::from_name("game:onTick"), None);
        assert_eq!(HookPoint::AfterInput.dispatch(), Dispatch::Waterfall);
        assert_eq!(HookPoint::BeforeInput.dispatch(), Dispatch::FirstResult);
        assert_eq!(HookPoint::SessionCreate.dispatch(), Dispatch::Broadcast);
    }

    #[tokio::test]
    async fn waterfall_runs_by_priority_then_registration() {
        let mut bus = HookBus::new();
        bus.register_fn(HookPoint::AfterInput, 0, "b", tag("b"));
        bus.register_fn(HookPoint::AfterInput, 5, "a", tag("a"));
        bus.register_fn(HookPoint::AfterInput, 0, "c", tag("c"));
        bus.register_fn(HookPoint::AfterInput, 0, "pass", |_, _| Ok(None));

        let ctx = HookContext::new(HookPoint::AfterInput);
        let out = bus.waterfall(&ctx, GameResponse::info(">")).await;
        assert_eq!(out.text, ">abc");
    }

    #[tokio::test]
    async fn waterfall_keeps_value_on_error() {
        let mut bus = HookBus::new();
        bus.register_fn(HookPoint::AfterInput, 0, "boom", |_, _| {
            Err(HookError::new("boom", "exploded"))
        });
        bus.register_fn(HookPoint::AfterInput, 0, "x", tag("x"));
        let ctx = HookContext::new(HookPoint::AfterInput);
        let out = bus.waterfall(&ctx, GameResponse::info("v")).await;
        assert_eq!(out.text, "vx");
    }

    #[tokio::test]
    async fn first_result_skips_errors_and_passes() {
        let mut bus = HookBus::new();
        bus.register_fn(HookPoint::BeforeInput, 9, "boom", |_, _| {
            Err(HookError::new("boom", "exploded"))
        });
        bus.register_fn(HookPoint::BeforeInput, 5, "pass", |_, _| Ok(None));
        bus.register_fn(HookPoint::BeforeInput, 1, "answer", |ctx, _| {
            Ok(ctx.input.map(|i| GameResponse::info(format!("heard {i}"))))
        });
        bus.register_fn(HookPoint::BeforeInput, 0, "late", tag("late"));

        let ctx = HookContext::new(HookPoint::BeforeInput).with_input("hello");
        let out = bus.first_result(&ctx).await.unwrap();
        assert_eq!(out.text, "heard hello");

        let empty = HookBus::new();
        assert!(empty.first_result(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = HookBus::new();
        for name in ["one", "two"] {
            let seen = Arc::clone(&seen);
            bus.register_fn(HookPoint::SessionCreate, 0, name, move |_, _| {
                seen.lock().unwrap().push(name);
                Err(HookError::new(name, "ignored"))
            });
        }
        bus.broadcast(&HookContext::new(HookPoint::SessionCreate)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    struct Shouty;

    impl Plugin for Shouty {
        fn id(&self) -> &str {
            "shouty"
        }

        fn priority(&self) -> i32 {
            10
        }

        fn init(&self, hooks: &mut PluginRegistrar<'_>) {
            hooks.on_fn(HookPoint::AfterInput, "upper", |_, value| {
                Ok(value.map(|v| GameResponse {
                    text: v.text.to_uppercase(),
                    ..v.clone()
                }))
            });
        }
    }

    #[tokio::test]
    async fn plugin_hooks_use_plugin_priority() {
        let mut bus = HookBus::new();
        bus.register_fn(HookPoint::AfterInput, 0, "suffix", tag("!"));
        bus.install(&Shouty);
        bus.install(&Shouty);

        assert_eq!(bus.plugins(), ["shouty".to_string()]);
        assert_eq!(bus.len(HookPoint::AfterInput), 2);

        let ctx = HookContext::new(HookPoint::AfterInput);
        let out = bus.waterfall(&ctx, GameResponse::info("hi")).await;
        assert_eq!(out.text, "HI!");
    }
}
