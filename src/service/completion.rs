use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CompletionConfig;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that writes professional emails.";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion service responded with status {status}")]
    Rejected { status: u16, payload: Value },

    #[error("No email content returned from completion service")]
    EmptyCompletion,
}

impl GenerationError {
    /// Upstream payload when the service answered, the message otherwise.
    pub fn details(&self) -> Value {
        match self {
            Self::Rejected { payload, .. } => payload.clone(),
            _ => Value::String(self.to_string()),
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .filter_map(|choice| choice.message.and_then(|message| message.content))
            .find(|content| !content.is_empty())
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn build_request<'a>(&'a self, prompt: &str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::info!(
            "Requesting completion from {} with model '{}'",
            self.endpoint,
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Completion service response status: {}", status);

        if !status.is_success() {
            let body = response.text().await?;
            let payload = serde_json::from_str(&body).unwrap_or(Value::String(body));
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                payload,
            });
        }

        response
            .json::<ChatCompletionResponse>()
            .await?
            .first_content()
            .ok_or(GenerationError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::json;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> ChatCompletionClient {
        ChatCompletionClient::new(&CompletionConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
        })
    }

    #[test]
    fn test_first_content_skips_empty_choices() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"content": ""}},
                {"message": {}},
                {"message": {"content": "Dear team"}},
                {"message": {"content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(response.first_content().as_deref(), Some("Dear team"));

        let empty: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_content(), None);
    }

    #[tokio::test]
    async fn test_complete_sends_fixed_parameters() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer test-key"
                );
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["max_tokens"], 500);
                assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][0]["content"], SYSTEM_INSTRUCTION);
                assert_eq!(body["messages"][1]["role"], "user");

                let prompt = body["messages"][1]["content"].as_str().unwrap().to_string();
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": format!("Re: {prompt}")}}]
                }))
            }),
        );

        let client = client_for(spawn_stub(router).await);
        let email = client.complete("leave request").await.unwrap();
        assert_eq!(email, "Re: leave request");
    }

    #[tokio::test]
    async fn test_complete_without_choices_fails() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );

        let client = client_for(spawn_stub(router).await);
        let err = client.complete("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyCompletion));
        assert_eq!(
            err.details(),
            Value::String("No email content returned from completion service".to_string())
        );
    }

    #[tokio::test]
    async fn test_complete_echoes_upstream_error_payload() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"message": "Invalid API Key"}})),
                )
            }),
        );

        let client = client_for(format!("{}/", spawn_stub(router).await));
        let err = client.complete("anything").await.unwrap_err();
        match &err {
            GenerationError::Rejected { status, .. } => assert_eq!(*status, 401),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.details(), json!({"error": {"message": "Invalid API Key"}}));
    }
}
