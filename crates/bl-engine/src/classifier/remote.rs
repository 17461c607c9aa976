use async_trait::async_trait;
use bl_core::Intent;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Classification, ClassifyRequest, IntentClassifier, parse_classifier_output};
use crate::error::ClassifierError;

/// Wire protocol spoken by a [`RemoteClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteProtocol {
    /// Ollama `POST {host}/api/generate`.
    OllamaGenerate,
    /// OpenAI-compatible `POST {base}/v1/chat/completions` with a JSON response format.
    OpenAiChat,
    /// `POST {url}` with `{prompt, model, params}`, answered by `{text}`.
    CustomGenerate,
    /// Gemini `POST {base}/v1beta/models/{model}:generateContent` with a JSON mime type.
    GeminiGenerate,
}

/// Public Gemini API host.
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Classifier backed by a language model over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    protocol: RemoteProtocol,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CustomResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

impl RemoteClassifier {
    /// Create a classifier. `endpoint` is the host or base URL for Ollama and
    /// OpenAI, and the full URL for custom endpoints.
    pub fn new(
        protocol: RemoteProtocol,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key (bearer token for OpenAI, `x-goog-api-key` for Gemini).
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// The URL requests are sent to.
    pub fn url(&self) -> String {
        match self.protocol {
            RemoteProtocol::OllamaGenerate => format!("{}/api/generate", self.endpoint),
            RemoteProtocol::OpenAiChat => format!("{}/v1/chat/completions", self.endpoint),
            RemoteProtocol::CustomGenerate => self.endpoint.clone(),
            RemoteProtocol::GeminiGenerate => format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint, self.model
            ),
        }
    }

    async fn ollama(&self, request: &ClassifyRequest<'_>) -> Result<String, ClassifierError> {
        let prompt = format!(
            "{}\n\nPlayer Input: \"{}\"\nIntent ID:",
            summary_prompt(request),
            request.input
        );
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0.1, "num_predict": 10 },
        });
        let response: OllamaResponse = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.response)
    }

    async fn openai(&self, request: &ClassifyRequest<'_>) -> Result<Option<String>, ClassifierError> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };
        let system = format!(
            "You are an advanced Game Engine Intent Classifier.\n\
             Analyze the PLAYER INPUT and determine the correct INTENT ID from the Allowed IDs list based on the JSON Context.\n\n\
             {}\n\n\
             Output ONLY valid JSON in this format: {{\"id\": \"intent_id\"}}.\n\
             If no match, use \"unknown\".",
            context_block(request)?
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": request.input },
            ],
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
        });
        let response: ChatResponse = self
            .client
            .post(self.url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| Some(c.message.content))
            .ok_or_else(|| ClassifierError::BadResponse("no choices".to_string()))
    }

    async fn custom(&self, request: &ClassifyRequest<'_>) -> Result<String, ClassifierError> {
        let prompt = format!(
            "### Instruction:\n\
             You are an advanced Game Engine Intent Classifier.\n\
             Your task is to analyze the PLAYER INPUT and determine the correct INTENT ID from the provided JSON CONTEXT.\n\n\
             {}\n\n\
             ### Task:\n\
             1. Match the PLAYER INPUT to the most appropriate id from Allowed IDs.\n\
             2. If the input implies movement, prefer intents with \"action\": \"transition\" whose description matches the target.\n\
             3. If no intent matches, return \"unknown\".\n\
             4. Output ONLY valid JSON in this exact format: {{\"id\":\"<one of the Allowed IDs or unknown>\"}}\n\
             5. Do not output any explanation. Do not use Markdown.\n\n\
             ### Player Input:\n\"{}\"\n\n### Response:\n",
            context_block(request)?,
            request.input
        );
        let model = (!self.model.is_empty()).then_some(&self.model);
        let body = json!({
            "prompt": prompt,
            "model": model,
            "params": { "max_length": 32, "temperature": 0.1 },
        });
        let response: CustomResponse = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .text
            .ok_or_else(|| ClassifierError::BadResponse("missing 'text' field".to_string()))
    }

    async fn gemini(&self, request: &ClassifyRequest<'_>) -> Result<Option<String>, ClassifierError> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };
        let prompt = format!(
            "You are a Game Engine Intent Classifier.\n\
             Analyze the PLAYER INPUT and determine the correct INTENT ID from the Allowed IDs list.\n\n\
             {}\n\n\
             Output ONLY valid JSON in this format: {{\"id\": \"intent_id\"}}.\n\
             If no match, use \"unknown\".\n\n\
             Player Input: \"{}\"",
            context_block(request)?,
            request.input
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.1,
            },
        });
        let response: GeminiResponse = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| Some(p.text))
            .ok_or_else(|| ClassifierError::BadResponse("no candidates".to_string()))
    }
}

#[async_trait]
impl IntentClassifier for RemoteClassifier {
    fn name(&self) -> &str {
        match self.protocol {
            RemoteProtocol::OllamaGenerate => "ollama",
            RemoteProtocol::OpenAiChat => "openai",
            RemoteProtocol::CustomGenerate => "custom",
            RemoteProtocol::GeminiGenerate => "gemini",
        }
    }

    async fn classify(
        &self,
        request: &ClassifyRequest<'_>,
    ) -> Result<Classification, ClassifierError> {
        let raw = match self.protocol {
            RemoteProtocol::OllamaGenerate => self.ollama(request).await?,
            RemoteProtocol::OpenAiChat => match self.openai(request).await? {
                Some(raw) => raw,
                None => return Ok(Classification::Unknown),
            },
            RemoteProtocol::CustomGenerate => self.custom(request).await?,
            RemoteProtocol::GeminiGenerate => match self.gemini(request).await? {
                Some(raw) => raw,
                None => return Ok(Classification::Unknown),
            },
        };
        debug!(classifier = self.name(), raw = %raw.trim(), "model output");
        Ok(parse_classifier_output(&raw, &request.candidate_ids()))
    }
}

/// Best available description of an intent for a prompt.
fn hint(intent: &Intent) -> &str {
    [
        Some(intent.ai_intent_helper.as_str()),
        intent.intent_description.as_deref(),
        intent.text_description.as_deref(),
        intent.response.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.is_empty())
    .unwrap_or_default()
}

fn summary_prompt(request: &ClassifyRequest<'_>) -> String {
    let list = |intents: &[&Intent]| {
        intents
            .iter()
            .map(|i| format!("- ID: \"{}\" | Description: {}", i.id, hint(i)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "You are a strict Game Engine Intent Classifier.\n\
         Your job is to map the Player's Input to one of the valid Intents based on the Current Context.\n\n\
         Current Context: \"{}\"\n\n\
         PRIMARY INTENTS (Story Actions) - Prioritize these if the user is attempting a specific action described here:\n\
         {}\n\n\
         GLOBAL INTENTS (General Actions) - specific actions usually override these:\n\
         {}\n\n\
         Instructions:\n\
         1. Analyze the Player's Input.\n\
         2. If the input matches a PRIMARY INTENT, return that ID.\n\
         3. If the input is generic (like \"look around\", \"help\"), check GLOBAL INTENTS.\n\
         4. If the input is ambiguous or does not match any intent, return \"unknown\".\n\
         5. Do NOT output any explanation, just the ID.",
        request.scene_text,
        list(request.local),
        list(request.global)
    )
}

fn context_block(request: &ClassifyRequest<'_>) -> Result<String, ClassifierError> {
    let context = json!({
        "current_node": request.node,
        "global_intents": request.global,
    });
    let context = serde_json::to_string_pretty(&context)
        .map_err(|e| ClassifierError::BadResponse(e.to_string()))?;
    let ids = request.candidate_ids().join(", ");
    let intents = request
        .candidates()
        .map(|i| format!("- {}: {}", i.id, hint(i)))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!(
        "### Context (JSON):\n{context}\n\n### Allowed IDs (choose exactly one):\n{ids}\n\n### Intents:\n{intents}"
    ))
}
