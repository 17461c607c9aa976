//! Turn results returned to callers.

use serde::Serialize;

/// What kind of text a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Opening text of a story.
    Intro,
    /// Text of a newly entered node.
    Story,
    /// Feedback that does not move the player.
    Info,
    /// Final text of a story.
    End,
    /// Something went wrong with the story content or the classifier.
    Error,
}

/// Author credits and follow-up link attached to an end-of-story response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ending {
    /// Story author display name.
    pub author_name: String,
    /// Story author id.
    pub author_id: String,
    /// Where to send the player next.
    pub redirect: String,
}

/// A narrative reply to a player turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    /// Text shown to the player.
    pub text: String,
    /// Response kind.
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// `Some(true)` when the classifier ran this turn, `Some(false)` on a cache hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized: Option<bool>,
    /// Whether the intent came from classification, cached or fresh.
    pub is_ai_generated: bool,
    /// Present on `end` responses.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub ending: Option<Ending>,
}

impl GameResponse {
    /// Create a response of the given kind.
    pub fn new(kind: ResponseKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            optimized: None,
            is_ai_generated: false,
            ending: None,
        }
    }

    /// An intro response.
    pub fn intro(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Intro, text)
    }

    /// A story response.
    pub fn story(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Story, text)
    }

    /// An info response.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Info, text)
    }

    /// An error response.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ResponseKind::Error, text)
    }

    /// An end-of-story response.
    pub fn end(text: impl Into<String>, ending: Ending) -> Self {
        let mut response = Self::new(ResponseKind::End, text);
        response.ending = Some(ending);
        response
    }

    /// Mark the response as produced from a classified intent.
    pub fn classified(mut self, optimized: bool) -> Self {
        self.optimized = Some(optimized);
        self.is_ai_generated = true;
        self
    }

    /// True for `end` responses.
    pub fn is_end(&self) -> bool {
        self.kind == ResponseKind::End
    }
}

/// Marker sent instead of a response when the session no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiredNotice {
    /// Always `SESSION_EXPIRED`.
    pub error: &'static str,
    /// Message for the player.
    pub text: &'static str,
    /// Always [`ResponseKind::Error`].
    #[serde(rename = "type")]
    pub kind: ResponseKind,
}

impl Default for ExpiredNotice {
    fn default() -> Self {
        Self {
            error: "SESSION_EXPIRED",
            text: "Connection lost. Session expired.",
            kind: ResponseKind::Error,
        }
    }
}

/// Result of a turn: a response, or notice that the session is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TurnOutcome {
    /// The turn produced a response.
    Response(GameResponse),
    /// The session does not exist (expired, archived, or malformed id).
    SessionExpired(ExpiredNotice),
}

impl TurnOutcome {
    /// The session-expired outcome.
    pub fn expired() -> Self {
        Self::SessionExpired(ExpiredNotice::default())
    }

    /// The response, if there is one.
    pub fn response(&self) -> Option<&GameResponse> {
        match self {
            Self::Response(r) => Some(r),
            Self::SessionExpired(_) => None,
        }
    }

    /// Consume into the response, if there is one.
    pub fn into_response(self) -> Option<GameResponse> {
        match self {
            Self::Response(r) => Some(r),
            Self::SessionExpired(_) => None,
        }
    }

    /// Text shown to the player either way.
    pub fn text(&self) -> &str {
        match self {
            Self::Response(r) => &r.text,
            Self::SessionExpired(n) => n.text,
        }
    }

    /// True when the session was missing.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

impl From<GameResponse> for TurnOutcome {
    fn from(response: GameResponse) -> Self {
        Self::Response(response)
    }
}
