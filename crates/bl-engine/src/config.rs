//! Engine configuration.

use std::time::Duration;

/// Where players are sent after a story ends.
pub const DEFAULT_END_REDIRECT: &str = "http://baseline-engine.com";

/// Tunables for [`GameEngine`](crate::GameEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Answer the literal input `debug` with the current node as JSON.
    pub debug_commands: bool,
    /// Unknown turns in a row before a hint is given.
    pub fail_hint_threshold: u32,
    /// How long after a turn its classification may be corrected.
    pub correction_window: Duration,
    /// Upper bound on a single classifier call.
    pub classifier_timeout: Duration,
    /// Redirect URL attached to end-of-story responses.
    pub end_redirect: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_commands: false,
            fail_hint_threshold: 3,
            correction_window: Duration::from_secs(60),
            classifier_timeout: Duration::from_secs(10),
            end_redirect: DEFAULT_END_REDIRECT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`.
    ///
    /// Recognized keys: `BASELINE_DEBUG` (`1`/`true`/`yes`),
    /// `BASELINE_CLASSIFIER_TIMEOUT_SECS`, `BASELINE_END_REDIRECT`.
    /// Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(flag) = lookup("BASELINE_DEBUG") {
            config.debug_commands = matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(secs) = lookup("BASELINE_CLASSIFIER_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            config.classifier_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("BASELINE_END_REDIRECT").filter(|s| !s.trim().is_empty()) {
            config.end_redirect = url;
        }
        config
    }

    /// Enable or disable the `debug` input.
    pub fn with_debug_commands(mut self, enabled: bool) -> Self {
        self.debug_commands = enabled;
        self
    }

    /// Set how many unknown turns trigger a hint.
    pub fn with_fail_hint_threshold(mut self, threshold: u32) -> Self {
        self.fail_hint_threshold = threshold.max(1);
        self
    }

    /// Set the correction window.
    pub fn with_correction_window(mut self, window: Duration) -> Self {
        self.correction_window = window;
        self
    }

    /// Set the classifier timeout.
    pub fn with_classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    /// Set the end-of-story redirect.
    pub fn with_end_redirect(mut self, url: impl Into<String>) -> Self {
        self.end_redirect = url.into();
        self
    }
}
