use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerationRequest {
    /// Instructions for the email to draft
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerationResult {
    /// Drafted email text
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SendRequest {
    /// One or more addresses, comma-separated as in an RFC 2822 address list
    pub recipients: String,
    /// Defaults to a placeholder subject when absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Plain-text body
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SendResult {
    pub success: bool,
    pub message: String,
}

/// Error envelope returned on every failure path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    /// Either a message or the upstream JSON payload
    #[schema(value_type = Object)]
    pub details: Value,
}

impl ApiError {
    pub fn new(error: impl Into<String>, details: impl Into<Value>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'prompt' must be a non-empty string")]
    Prompt,

    #[error("'{0}' must be a non-empty string")]
    MissingField(&'static str),

    #[error("'subject' must be a string when provided")]
    Subject,
}

impl ValidationError {
    /// Short error title used in the response envelope.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Prompt => "Missing or invalid 'prompt'",
            Self::MissingField(_) => "Recipients and content are required",
            Self::Subject => "Invalid 'subject'",
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        ApiError::new(self.title(), self.to_string()).with_status(StatusCode::BAD_REQUEST)
    }
}

fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

impl GenerationRequest {
    /// Accepts only a body whose `prompt` is a non-empty string.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        non_empty_str(body, "prompt")
            .map(|prompt| Self {
                prompt: prompt.to_string(),
            })
            .ok_or(ValidationError::Prompt)
    }
}

impl SendRequest {
    /// Requires non-empty `recipients` and `content`; an empty or null
    /// `subject` is treated as absent.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let recipients =
            non_empty_str(body, "recipients").ok_or(ValidationError::MissingField("recipients"))?;
        let content =
            non_empty_str(body, "content").ok_or(ValidationError::MissingField("content"))?;

        let subject = match body.get("subject") {
            None | Some(Value::Null) => None,
            Some(Value::String(subject)) if subject.is_empty() => None,
            Some(Value::String(subject)) => Some(subject.clone()),
            Some(_) => return Err(ValidationError::Subject),
        };

        Ok(Self {
            recipients: recipients.to_string(),
            subject,
            content: content.to_string(),
        })
    }
}
