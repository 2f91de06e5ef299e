use crate::error::BackendError;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_CHAT_API_BASE: &str = "https://api.x.ai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "grok-beta";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message of a chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Capability that generates the next assistant message
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, BackendError>;
}

/// Configuration for an OpenAI-compatible chat-completion API
#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl ChatConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROK_API_KEY").context("GROK_API_KEY not set")?;
        let api_base = lookup("CHAT_API_BASE").unwrap_or_else(|| DEFAULT_CHAT_API_BASE.to_string());
        let model = lookup("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        let temperature = crate::config::parse_or(&lookup, "CHAT_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        let timeout_secs = crate::config::parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)?;

        Ok(ChatConfig {
            api_key,
            api_base,
            model,
            temperature,
            timeout_secs,
        })
    }
}

/// Client for a chat-completion endpoint speaking the OpenAI wire format
#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a new chat client with a request timeout
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build chat HTTP client")?;
        Ok(ChatClient { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

impl ChatModel for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, BackendError> {
        let timeout = self.config.timeout_secs;
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        debug!(
            "Sending {} messages to {}",
            messages.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Status { status, body });
        }

        let response_data: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        response_data.into_text()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

impl CompletionResponse {
    /// Extract the generated text from the first choice
    fn into_text(self) -> std::result::Result<String, BackendError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("No response generated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{http_response, serve_nothing, serve_once};
    use std::collections::HashMap;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![
            ChatMessage::system("You are grok"),
            ChatMessage::user("How does X algorithm work?"),
        ];
        let request = CompletionRequest {
            model: "grok-beta",
            messages: &messages,
            temperature: 0.5,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "grok-beta",
                "messages": [
                    {"role": "system", "content": "You are grok"},
                    {"role": "user", "content": "How does X algorithm work?"}
                ],
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn test_response_takes_first_choice() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "First"}},
                {"index": 1, "message": {"role": "assistant", "content": "Second"}}
            ],
            "usage": {"total_tokens": 12}
        }"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text().unwrap(), "First");
    }

    #[test]
    fn test_response_without_content_is_malformed() {
        let response: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(BackendError::Malformed(_))
        ));

        let response: CompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GROK_API_KEY", "xai-test"),
            ("CHAT_TEMPERATURE", "0.2"),
            ("REQUEST_TIMEOUT_SECS", "15"),
        ]
        .into();
        let config = ChatConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.api_key, "xai-test");
        assert_eq!(config.api_base, DEFAULT_CHAT_API_BASE);
        assert_eq!(config.model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn test_config_rejects_bad_temperature() {
        let vars: HashMap<&str, &str> =
            [("GROK_API_KEY", "xai-test"), ("CHAT_TEMPERATURE", "warm")].into();
        assert!(ChatConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn test_completions_url() {
        let client = ChatClient::new(ChatConfig {
            api_key: "xai-test".into(),
            api_base: "https://api.x.ai/v1/".into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.completions_url(), "https://api.x.ai/v1/chat/completions");
    }

    fn local_client(api_base: String, timeout_secs: u64) -> ChatClient {
        ChatClient::new(ChatConfig {
            api_key: "xai-test".into(),
            api_base,
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_answer() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Income is taxed."}}]}"#;
        let base = serve_once(http_response("200 OK", "application/json", body)).await;

        let answer = local_client(base, 5)
            .complete(&[ChatMessage::user("What is taxed?")])
            .await
            .unwrap();
        assert_eq!(answer, "Income is taxed.");
    }

    #[tokio::test]
    async fn test_unauthorized_is_status_error() {
        let base = serve_once(http_response(
            "401 Unauthorized",
            "text/plain",
            "invalid api key",
        ))
        .await;

        let err = local_client(base, 5)
            .complete(&[ChatMessage::user("What is taxed?")])
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let base = serve_nothing().await;

        let err = local_client(base, 1)
            .complete(&[ChatMessage::user("What is taxed?")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout(1)));
        assert!(err.is_timeout());
    }
}
