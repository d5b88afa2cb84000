#![allow(dead_code)]

use ai_email::{
    EmailService, OriginAllowList, create_app,
    service::{
        completion::{CompletionClient, GenerationError},
        mailer::{DeliveryError, MailRelay, OutgoingMail, parse_recipients},
    },
};
use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_SUBJECT: &str = "AI Generated Email";

pub enum Reply {
    Text(&'static str),
    Echo,
    NoChoices,
    Unauthorized,
    Panic,
}

pub struct StubCompletion {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubCompletion {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Echo => Ok(format!("Draft for: {prompt}")),
            Reply::NoChoices => Err(GenerationError::EmptyCompletion),
            Reply::Unauthorized => Err(GenerationError::Rejected {
                status: 401,
                payload: json!({"error": {"message": "Invalid API Key"}}),
            }),
            Reply::Panic => panic!("completion stub exploded"),
        }
    }
}

/// Records accepted mail; rejects malformed recipients like a real relay would.
#[derive(Default)]
pub struct RecordingRelay {
    pub sent: Mutex<Vec<OutgoingMail>>,
    attempts: AtomicUsize,
}

impl RecordingRelay {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailRelay for RecordingRelay {
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        parse_recipients(&mail.recipients)?;
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

pub fn app(completion: Arc<StubCompletion>, relay: Arc<RecordingRelay>) -> Router {
    let service = EmailService::new(completion, relay, DEFAULT_SUBJECT);
    let allow_list = OriginAllowList::new([ALLOWED_ORIGIN]).unwrap();
    create_app(Arc::new(service), allow_list)
}

/// Serves the app on an ephemeral local port and returns its base URL.
pub async fn spawn_app(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
