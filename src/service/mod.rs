pub mod completion;
pub mod mailer;

use crate::dto::{GenerationRequest, GenerationResult, SendRequest, SendResult};

use completion::{CompletionClient, GenerationError};
use mailer::{DeliveryError, MailRelay, OutgoingMail};

use std::sync::Arc;

pub const SEND_SUCCESS_MESSAGE: &str = "Email sent successfully!";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Clone)]
pub struct EmailService {
    completion: Arc<dyn CompletionClient>,
    relay: Arc<dyn MailRelay>,
    default_subject: String,
}

impl EmailService {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        relay: Arc<dyn MailRelay>,
        default_subject: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            relay,
            default_subject: default_subject.into(),
        }
    }

    pub async fn generate_email(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ServiceError> {
        let email = self.completion.complete(&request.prompt).await?;
        if email.is_empty() {
            return Err(GenerationError::EmptyCompletion.into());
        }
        Ok(GenerationResult { email })
    }

    pub async fn send_email(&self, request: SendRequest) -> Result<SendResult, ServiceError> {
        let subject = request
            .subject
            .filter(|subject| !subject.is_empty())
            .unwrap_or_else(|| self.default_subject.clone());

        self.relay
            .deliver(OutgoingMail {
                recipients: request.recipients,
                subject,
                text: request.content,
            })
            .await?;

        Ok(SendResult {
            success: true,
            message: SEND_SUCCESS_MESSAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedCompletion(&'static str);

    #[async_trait]
    impl CompletionClient for FixedCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingRelay {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailRelay for RecordingRelay {
        async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_completion_is_an_error() {
        let service = EmailService::new(
            Arc::new(FixedCompletion("")),
            Arc::new(RecordingRelay::default()),
            "Default",
        );
        let err = service
            .generate_email(GenerationRequest {
                prompt: "hi".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Generation(GenerationError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn test_send_uses_default_subject() {
        let relay = Arc::new(RecordingRelay::default());
        let service = EmailService::new(Arc::new(FixedCompletion("x")), relay.clone(), "Default");

        let result = service
            .send_email(SendRequest {
                recipients: "a@example.com".to_string(),
                subject: Some(String::new()),
                content: "Hello".to_string(),
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.message, SEND_SUCCESS_MESSAGE);
        let sent = relay.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Default");
        assert_eq!(sent[0].text, "Hello");
    }
}
