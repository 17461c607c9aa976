//! Intent classification: mapping free text to one of the eligible intent ids.
//!
//! Three families of classifier are provided. [`KeywordClassifier`] follows
//! fixed rules and is fully deterministic. [`LexicalClassifier`] scores word
//! overlap with each intent's hint text. [`RemoteClassifier`] asks a language
//! model over HTTP. [`ClassifierConfig`] picks one at startup.

mod keyword;
mod lexical;
mod output;
mod remote;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bl_core::{Intent, Node};
use tracing::{info, warn};

use crate::error::ClassifierError;

pub use keyword::KeywordClassifier;
pub use lexical::LexicalClassifier;
pub use output::parse_classifier_output;
pub use remote::{GEMINI_ENDPOINT, RemoteClassifier, RemoteProtocol};

/// Id returned when no intent fits.
pub const UNKNOWN_INTENT: &str = "unknown";

/// Outcome of a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// An eligible intent id.
    Matched(String),
    /// Nothing fits.
    Unknown,
}

impl Classification {
    /// Build from a raw id; `unknown` and empty ids map to [`Classification::Unknown`].
    pub fn from_id(id: &str) -> Self {
        let id = id.trim();
        if id.is_empty() || id == UNKNOWN_INTENT {
            Self::Unknown
        } else {
            Self::Matched(id.to_string())
        }
    }

    /// The intent id, or `unknown`.
    pub fn id(&self) -> &str {
        match self {
            Self::Matched(id) => id,
            Self::Unknown => UNKNOWN_INTENT,
        }
    }

    /// True for [`Classification::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Everything a classifier may look at for one turn.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    /// Raw player input.
    pub input: &'a str,
    /// Eligible node intents.
    pub local: &'a [&'a Intent],
    /// Global intents.
    pub global: &'a [&'a Intent],
    /// Text of the current scene.
    pub scene_text: &'a str,
    /// The current node.
    pub node: &'a Node,
}

impl<'a> ClassifyRequest<'a> {
    /// Candidate intents, local first.
    pub fn candidates(&self) -> impl Iterator<Item = &'a Intent> + 'a {
        let (local, global) = (self.local, self.global);
        local.iter().chain(global.iter()).copied()
    }

    /// Candidate ids, local first.
    pub fn candidate_ids(&self) -> Vec<&'a str> {
        self.candidates().map(|i| i.id.as_str()).collect()
    }

    /// True when `id` is one of the candidates.
    pub fn is_candidate(&self, id: &str) -> bool {
        self.candidates().any(|i| i.id == id)
    }
}

/// Maps player input to an intent.
///
/// Implementations return only candidate ids or [`Classification::Unknown`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Classify one input.
    async fn classify(
        &self,
        request: &ClassifyRequest<'_>,
    ) -> Result<Classification, ClassifierError>;
}

/// Which classifier to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassifierConfig {
    /// Ordered keyword rules. Empty rules mean the standard global rules.
    Keyword(Vec<(String, String)>),
    /// Word-overlap scoring.
    #[default]
    Lexical,
    /// Ollama `/api/generate`.
    Ollama {
        /// Base URL of the Ollama server.
        host: String,
        /// Model tag.
        model: String,
    },
    /// OpenAI-compatible chat completions.
    OpenAi {
        /// API base URL.
        base_url: String,
        /// Model name.
        model: String,
        /// Bearer token. Without one every input is unknown.
        api_key: Option<String>,
    },
    /// Gemini `generateContent` with a JSON response.
    Gemini {
        /// Model name.
        model: String,
        /// API key. Without one every input is unknown.
        api_key: Option<String>,
    },
    /// A `{prompt, model, params}` to `{text}` endpoint.
    Custom {
        /// Endpoint URL.
        url: String,
        /// Optional model name passed through.
        model: Option<String>,
    },
}

impl ClassifierConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// `AI_PROVIDER` picks the classifier (`keyword`, `lexical` or `nlp`,
    /// `ollama`, `openai`, `gemini`, `custom`); the provider's own keys fill in
    /// the rest.
    /// Unknown providers fall back to lexical.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let provider = get("AI_PROVIDER").unwrap_or_else(|| "lexical".to_string());
        match provider.trim().to_lowercase().as_str() {
            "keyword" => Self::Keyword(Vec::new()),
            "ollama" => Self::Ollama {
                host: get("OLLAMA_HOST").unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: get("OLLAMA_MODEL").unwrap_or_else(|| "phi3:mini".to_string()),
            },
            "openai" => Self::OpenAi {
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
                api_key: get("OPENAI_API_KEY"),
            },
            "gemini" => Self::Gemini {
                model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
                api_key: get("GEMINI_API_KEY"),
            },
            "custom" | "custom_ai" => Self::Custom {
                url: get("CUSTOM_AI_URL")
                    .unwrap_or_else(|| "http://localhost:3005/generate".to_string()),
                model: get("CUSTOM_AI_MODEL"),
            },
            "lexical" | "nlp" => Self::Lexical,
            other => {
                warn!(provider = other, "unknown AI_PROVIDER, using lexical");
                Self::Lexical
            }
        }
    }

    /// Replace the provider, keeping everything else from `lookup`.
    pub fn with_provider(provider: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let provider = provider.to_string();
        Self::from_lookup(move |key| {
            if key == "AI_PROVIDER" {
                Some(provider.clone())
            } else {
                lookup(key)
            }
        })
    }

    /// Build the classifier.
    pub fn build(&self) -> Arc<dyn IntentClassifier> {
        let classifier: Arc<dyn IntentClassifier> = match self {
            Self::Keyword(rules) if rules.is_empty() => {
                Arc::new(KeywordClassifier::standard().matching_id_phrases())
            }
            Self::Keyword(rules) => Arc::new(KeywordClassifier::from_rules(rules.clone())),
            Self::Lexical => Arc::new(LexicalClassifier::new()),
            Self::Ollama { host, model } => Arc::new(RemoteClassifier::new(
                RemoteProtocol::OllamaGenerate,
                host.clone(),
                model.clone(),
            )),
            Self::OpenAi {
                base_url,
                model,
                api_key,
            } => {
                if api_key.is_none() {
                    warn!("no OPENAI_API_KEY set, every input will be unknown");
                }
                Arc::new(
                    RemoteClassifier::new(
                        RemoteProtocol::OpenAiChat,
                        base_url.clone(),
                        model.clone(),
                    )
                    .with_api_key(api_key.clone()),
                )
            }
            Self::Gemini { model, api_key } => {
                if api_key.is_none() {
                    warn!("no GEMINI_API_KEY set, every input will be unknown");
                }
                Arc::new(
                    RemoteClassifier::new(RemoteProtocol::GeminiGenerate, GEMINI_ENDPOINT, model.clone())
                        .with_api_key(api_key.clone()),
                )
            }
            Self::Custom { url, model } => Arc::new(RemoteClassifier::new(
                RemoteProtocol::CustomGenerate,
                url.clone(),
                model.clone().unwrap_or_default(),
            )),
        };
        info!(classifier = classifier.name(), "classifier ready");
        classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn classification_from_id() {
        assert_eq!(Classification::from_id("unknown"), Classification::Unknown);
        assert_eq!(Classification::from_id("  "), Classification::Unknown);
        assert_eq!(
            Classification::from_id(" go_b "),
            Classification::Matched("go_b".into())
        );
        assert_eq!(Classification::Unknown.id(), "unknown");
    }

    #[test]
    fn default_provider_is_lexical() {
        assert_eq!(ClassifierConfig::from_lookup(lookup(&[])), ClassifierConfig::Lexical);
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[("AI_PROVIDER", "NLP")])),
            ClassifierConfig::Lexical
        );
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[("AI_PROVIDER", "palm")])),
            ClassifierConfig::Lexical
        );
    }

    #[test]
    fn remote_providers_read_their_keys() {
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[("AI_PROVIDER", "ollama")])),
            ClassifierConfig::Ollama {
                host: "http://localhost:11434".into(),
                model: "phi3:mini".into()
            }
        );
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[
                ("AI_PROVIDER", "openai"),
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4o-mini"),
            ])),
            ClassifierConfig::OpenAi {
                base_url: "https://api.openai.com".into(),
                model: "gpt-4o-mini".into(),
                api_key: Some("sk-test".into()),
            }
        );
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[
                ("AI_PROVIDER", "gemini"),
                ("GEMINI_API_KEY", "g-test"),
            ])),
            ClassifierConfig::Gemini {
                model: "gemini-1.5-flash".into(),
                api_key: Some("g-test".into()),
            }
        );
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[("AI_PROVIDER", "Gemini")])),
            ClassifierConfig::Gemini {
                model: "gemini-1.5-flash".into(),
                api_key: None,
            }
        );
        assert_eq!(
            ClassifierConfig::from_lookup(lookup(&[("AI_PROVIDER", "custom")])),
            ClassifierConfig::Custom {
                url: "http://localhost:3005/generate".into(),
                model: None
            }
        );
    }

    #[test]
    fn provider_override() {
        let config = ClassifierConfig::with_provider(
            "ollama",
            lookup(&[("AI_PROVIDER", "openai"), ("OLLAMA_MODEL", "llama3")]),
        );
        assert_eq!(
            config,
            ClassifierConfig::Ollama {
                host: "http://localhost:11434".into(),
                model: "llama3".into()
            }
        );
    }

    #[test]
    fn build_names() {
        assert_eq!(ClassifierConfig::Lexical.build().name(), "lexical");
        assert_eq!(ClassifierConfig::Keyword(Vec::new()).build().name(), "keyword");
        assert_eq!(
            ClassifierConfig::Custom {
                url: "http://localhost:3005/generate".into(),
                model: None
            }
            .build()
            .name(),
            "custom"
        );
        let gemini = ClassifierConfig::Gemini {
            model: "gemini-1.5-flash".into(),
            api_key: None,
        };
        assert_eq!(gemini.build().name(), "gemini");
    }
}
