//! Client-side model of the two-step email form: draft with the backend's
//! generate endpoint, then send the (possibly edited) draft.

use serde::de::DeserializeOwned;

use std::fmt;

use crate::dto::{ApiError, GenerationRequest, GenerationResult, SendRequest, SendResult};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5001";

pub const GENERATE_FAILED: &str = "Failed to generate email";
pub const SEND_FAILED: &str = "Failed to send email";
pub const SEND_SUCCEEDED: &str = "Email sent successfully!";

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend responded with status {status}: {error}")]
    Api { status: u16, error: String },
}

/// Thin HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reads `API_BASE_URL`, falling back to the local backend.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R, FormError>
    where
        T: serde::Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response
                .json::<ApiError>()
                .await
                .map_or_else(|_| status.to_string(), |e| e.error);
            return Err(FormError::Api {
                status: status.as_u16(),
                error,
            });
        }

        Ok(response.json::<R>().await?)
    }

    pub async fn generate(&self, prompt: &str) -> Result<GenerationResult, FormError> {
        self.post(
            "/api/generate",
            &GenerationRequest {
                prompt: prompt.to_string(),
            },
        )
        .await
    }

    pub async fn send(&self, request: &SendRequest) -> Result<SendResult, FormError> {
        self.post("/api/send", request).await
    }
}

/// Outcome line shown under the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Empty,
    Success(String),
    Failure(String),
}

impl Status {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Success(message) => write!(f, "✅ {message}"),
            Self::Failure(message) => write!(f, "❌ {message}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailForm {
    pub prompt: String,
    pub generated_email: String,
    pub recipients: String,
    pub subject: String,
    pub sending: bool,
    pub status: Status,
}

impl EmailForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// The send section only exists once a draft is available.
    pub fn has_draft(&self) -> bool {
        !self.generated_email.is_empty()
    }

    pub async fn generate(&mut self, api: &ApiClient) {
        self.status = Status::Empty;
        match api.generate(&self.prompt).await {
            Ok(result) => self.generated_email = result.email,
            Err(e) => {
                tracing::error!("Error generating email: {e}");
                self.status = Status::Failure(GENERATE_FAILED.to_string());
            }
        }
    }

    pub async fn send(&mut self, api: &ApiClient) {
        self.sending = true;
        self.status = Status::Empty;

        let request = SendRequest {
            recipients: self.recipients.clone(),
            subject: Some(self.subject.clone()),
            content: self.generated_email.clone(),
        };

        self.status = match api.send(&request).await {
            Ok(_) => Status::Success(SEND_SUCCEEDED.to_string()),
            Err(e) => {
                tracing::error!("Error sending email: {e}");
                Status::Failure(SEND_FAILED.to_string())
            }
        };
        self.sending = false;
    }

    /// Text rendition of the visible controls.
    pub fn render(&self) -> String {
        let mut out = String::from("✉️ AI Email Generator\n\n");

        out.push_str(&format!("🧠 Prompt:\n{}\n", self.prompt));
        out.push_str("[Generate Email]\n");

        if self.has_draft() {
            out.push_str(&format!("\n📝 Generated Email:\n{}\n\n", self.generated_email));
            out.push_str(&format!("Recipient email: {}\n", self.recipients));
            out.push_str(&format!("Subject (optional): {}\n", self.subject));
            out.push_str(if self.sending {
                "[Sending...]\n"
            } else {
                "[📤 Send Email]\n"
            });
        }

        if !self.status.is_empty() {
            out.push_str(&format!("\n{}\n", self.status));
        }

        out
    }
}
