// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP client for OpenAI-compatible chat APIs.
//!
//! Handles request construction, bearer authentication, transient error
//! retry, and audio transcription uploads. The provider types in this crate
//! are thin wrappers that pick base URLs and defaults.

use std::time::Duration;

use base64::Engine as _;
use convoy_core::{ContextTurn, ConvoyError, ParticipantRole};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatMessage, ChatRequest, ChatResponse, TranscriptionResponse};

/// OpenAI-compatible chat client bound to one base URL, model, and key.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    max_retries: u32,
}

impl ChatClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Self, ConvoyError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&bearer)
                .map_err(|e| ConvoyError::Config(format!("invalid API key header value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ConvoyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model,
            temperature,
            max_tokens,
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a chat completion over the given thread and return the assistant
    /// text of the first choice.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second delay.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ConvoyError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat completion after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ConvoyError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "chat completion response received");

            if status.is_success() {
                let parsed: ChatResponse =
                    response.json().await.map_err(|e| ConvoyError::Provider {
                        message: format!("malformed chat completion response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| ConvoyError::provider("chat completion returned no choices"));
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ConvoyError::provider(format!(
                    "API returned {status}: {body}"
                )));
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!("API error ({}): {}", api_err.error.type_, api_err.error.message)
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(ConvoyError::provider(message));
        }

        Err(last_error
            .unwrap_or_else(|| ConvoyError::provider("chat completion failed after retries")))
    }

    /// Upload base64-encoded audio to the transcription endpoint.
    ///
    /// Accepts either a bare base64 payload or a data URL
    /// (`data:audio/ogg;base64,...`); the prefix is stripped before decoding.
    pub async fn transcribe(
        &self,
        audio_base64: &str,
        language: Option<&str>,
        model: &str,
    ) -> Result<String, ConvoyError> {
        let payload = strip_data_url_prefix(audio_base64);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ConvoyError::Provider {
                message: format!("invalid base64 audio payload: {e}"),
                source: Some(Box::new(e)),
            })?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| ConvoyError::Provider {
                message: format!("failed to build multipart audio part: {e}"),
                source: Some(Box::new(e)),
            })?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "json");
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConvoyError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConvoyError::provider(format!(
                "transcription failed with {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse =
            response.json().await.map_err(|e| ConvoyError::Provider {
                message: format!("malformed transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.text)
    }
}

/// Assemble the chat thread for a dispatch: system prompt first, then the
/// recent conversation turns oldest first, then the user's combined message.
pub fn build_thread(
    message: &str,
    system_prompt: Option<&str>,
    context: &[ContextTurn],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.len() + 2);
    if let Some(prompt) = system_prompt
        && !prompt.trim().is_empty()
    {
        messages.push(ChatMessage::system(prompt));
    }
    for turn in context {
        match turn.role {
            ParticipantRole::User => messages.push(ChatMessage::user(&turn.text)),
            ParticipantRole::Ai => messages.push(ChatMessage::assistant(&turn.text)),
        }
    }
    messages.push(ChatMessage::user(message));
    messages
}

/// Drop a `data:<mime>;base64,` prefix if present.
fn strip_data_url_prefix(audio: &str) -> &str {
    match audio.find(";base64,") {
        Some(idx) => &audio[idx + ";base64,".len()..],
        None => audio,
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> ChatClient {
        ChatClient::new("sk-test", "https://unused.invalid", "test-model".to_string(), 0.5, 1024)
            .unwrap()
            .with_base_url(base_url)
    }

    #[test]
    fn thread_orders_system_context_then_message() {
        let context = vec![
            ContextTurn {
                role: ParticipantRole::User,
                text: "earlier question".to_string(),
            },
            ContextTurn {
                role: ParticipantRole::Ai,
                text: "earlier answer".to_string(),
            },
        ];
        let thread = build_thread("new question", Some("be brief"), &context);
        let roles: Vec<&str> = thread.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(thread.last().unwrap().content, "new question");
    }

    #[test]
    fn blank_system_prompt_is_omitted() {
        let thread = build_thread("hi", Some("   "), &[]);
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].role, "user");
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(
            strip_data_url_prefix("data:audio/ogg;base64,AAAA"),
            "AAAA"
        );
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
    }

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string_contains("test-model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "pong"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let reply = client.chat(vec![ChatMessage::user("ping")]).await.unwrap();
        assert_eq!(reply, "pong");
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "recovered"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let reply = client.chat(vec![ChatMessage::user("ping")]).await.unwrap();
        assert_eq!(reply, "recovered");
    }

    #[tokio::test]
    async fn non_transient_error_surfaces_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.chat(vec![ChatMessage::user("ping")]).await.unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn transcription_uploads_multipart_and_parses_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hello from audio"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fake-ogg-bytes");
        let data_url = format!("data:audio/ogg;base64,{encoded}");
        let text = client
            .transcribe(&data_url, Some("en"), "whisper-large-v3")
            .await
            .unwrap();
        assert_eq!(text, "hello from audio");
    }
}
