//! Narrator backed by Google Gemini.
//!
//! Gemini is stateless, so the conversation lives here: a context holding
//! the system instruction and every turn sent so far. The context is keyed
//! by the API key and the settings fingerprint and is rebuilt from the
//! request history whenever either changes or the session is reset.

use super::prompt::{context_message, history_contents, response_schema, system_instruction};
use super::{NarrationRequest, Narrator, NarratorError, NarratorResponse};
use async_trait::async_trait;
use gemini::{Content, Gemini, Request};

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Identifies the configuration a context was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey {
    api_key: String,
    settings: String,
}

/// The live conversation with the model.
struct ConversationContext {
    key: SessionKey,
    system_instruction: String,
    contents: Vec<Content>,
}

/// A [`Narrator`] that calls Gemini's `generateContent` with a JSON schema.
pub struct GeminiNarrator {
    api_key: Option<String>,
    model: String,
    base_url: Option<String>,
    temperature: Option<f32>,
    context: Option<ConversationContext>,
}

impl GeminiNarrator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: None,
            context: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests somewhere other than the public API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a conversational context is currently alive.
    pub fn has_session(&self) -> bool {
        self.context.is_some()
    }

    fn client(&self, api_key: &str) -> Gemini {
        let client = Gemini::new(api_key).with_model(self.model.clone());
        match &self.base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        }
    }

    /// Return the context for `key`, building it from history if the
    /// current one is missing or was built for something else.
    fn ensure_context(
        &mut self,
        key: SessionKey,
        request: &NarrationRequest,
    ) -> &mut ConversationContext {
        if self.context.as_ref().is_some_and(|c| c.key != key) {
            self.context = None;
        }
        self.context.get_or_insert_with(|| {
            tracing::info!(history = request.history.len(), "initializing narrator session");
            ConversationContext {
                key,
                system_instruction: system_instruction(&request.settings),
                contents: history_contents(&request.history),
            }
        })
    }
}

#[async_trait]
impl Narrator for GeminiNarrator {
    async fn narrate(&mut self, request: &NarrationRequest) -> Result<NarratorResponse, NarratorError> {
        let api_key = self.api_key.clone().ok_or(NarratorError::MissingCredential)?;
        let client = self.client(&api_key);
        let temperature = self.temperature;

        let key = SessionKey {
            api_key,
            settings: request.settings.fingerprint(),
        };
        let context = self.ensure_context(key, request);

        let user_turn = Content::user(context_message(&request.summary, &request.action));
        let mut contents = context.contents.clone();
        contents.push(user_turn.clone());

        let mut gemini_request = Request::new(contents)
            .with_system_instruction(context.system_instruction.clone())
            .with_json_schema(response_schema());
        if let Some(temperature) = temperature {
            gemini_request = gemini_request.with_temperature(temperature);
        }

        let response = client.generate(gemini_request).await?;
        let text = response.text();
        let parsed: NarratorResponse = serde_json::from_str(&text)
            .map_err(|e| NarratorError::InvalidResponse(e.to_string()))?;

        // Only a successful turn becomes part of the conversation.
        context.contents.push(user_turn);
        context.contents.push(Content::model(text));

        tracing::debug!(
            prompt_tokens = response.usage.prompt_tokens,
            output_tokens = response.usage.output_tokens,
            "narrator turn complete"
        );
        Ok(parsed)
    }

    fn reset_session(&mut self) {
        if self.context.take().is_some() {
            tracing::info!("narrator session reset");
        }
    }

    fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::default_character;
    use crate::narrator::{ChatSettings, ResponseLength};
    use crate::world::ChatMessage;

    fn request(history: Vec<ChatMessage>, settings: ChatSettings) -> NarrationRequest {
        NarrationRequest {
            action: "I look around".to_string(),
            summary: (&default_character()).into(),
            history,
            settings,
        }
    }

    fn key(api_key: &str, settings: &ChatSettings) -> SessionKey {
        SessionKey {
            api_key: api_key.to_string(),
            settings: settings.fingerprint(),
        }
    }

    #[test]
    fn test_blank_key_is_no_credential() {
        assert!(!GeminiNarrator::new(None).has_credential());
        assert!(!GeminiNarrator::new(Some("  ".to_string())).has_credential());

        let mut narrator = GeminiNarrator::new(Some("key".to_string()));
        assert!(narrator.has_credential());
        narrator.set_api_key(Some(String::new()));
        assert!(!narrator.has_credential());
    }

    #[test]
    fn test_context_is_built_from_history() {
        let mut narrator = GeminiNarrator::new(Some("key".to_string()));
        let settings = ChatSettings::default();
        let history = vec![ChatMessage::model("Welcome."), ChatMessage::user("Hi")];
        let req = request(history, settings);

        let context = narrator.ensure_context(key("key", &settings), &req);
        assert_eq!(context.contents.len(), 3);
        assert!(narrator.has_session());
    }

    #[test]
    fn test_context_survives_same_key_and_rebuilds_on_change() {
        let mut narrator = GeminiNarrator::new(Some("key".to_string()));
        let settings = ChatSettings::default();
        let req = request(vec![ChatMessage::user("first")], settings);

        narrator
            .ensure_context(key("key", &settings), &req)
            .contents
            .push(Content::model("remembered"));

        let same = narrator.ensure_context(key("key", &settings), &req);
        assert_eq!(same.contents.len(), 2);

        let long = ChatSettings {
            response_length: ResponseLength::Long,
        };
        let long_req = request(vec![ChatMessage::user("first")], long);
        let rebuilt = narrator.ensure_context(key("key", &long), &long_req);
        assert_eq!(rebuilt.contents.len(), 1);
        assert!(rebuilt
            .system_instruction
            .ends_with(ResponseLength::Long.instruction()));

        let other_key = narrator.ensure_context(key("other", &long), &long_req);
        assert_eq!(other_key.contents.len(), 1);
    }

    #[test]
    fn test_reset_drops_context() {
        let mut narrator = GeminiNarrator::new(Some("key".to_string()));
        let settings = ChatSettings::default();
        narrator.ensure_context(key("key", &settings), &request(Vec::new(), settings));
        assert!(narrator.has_session());
        narrator.reset_session();
        assert!(!narrator.has_session());
    }

    #[tokio::test]
    async fn test_narrate_without_key_fails_fast() {
        let mut narrator = GeminiNarrator::new(None);
        let result = narrator
            .narrate(&request(Vec::new(), ChatSettings::default()))
            .await;
        assert!(matches!(result, Err(NarratorError::MissingCredential)));
    }
}
