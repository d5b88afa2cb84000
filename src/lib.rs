pub mod config;
pub mod cors;
pub mod dto;
pub mod form;
pub mod handlers;
pub mod service;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use std::{any::Any, sync::Arc};

pub use config::Config;
pub use cors::OriginAllowList;
pub use service::EmailService;

use dto::ApiError;
use handlers::rest;
use service::{
    completion::ChatCompletionClient,
    mailer::{DeliveryError, SmtpRelay},
};

/// Wires the production clients from configuration.
pub fn build_service(config: &Config) -> Result<EmailService, DeliveryError> {
    let completion = Arc::new(ChatCompletionClient::new(&config.completion));
    let relay = Arc::new(SmtpRelay::new(&config.mail)?);
    Ok(EmailService::new(
        completion,
        relay,
        config.mail.default_subject.clone(),
    ))
}

/// Message carried by a panic payload, if it is a string.
fn panic_details(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Routes panics from any thread or task into the tracing subscriber
/// instead of raw stderr.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let details = panic_details(info.payload());
        match info.location() {
            Some(location) => tracing::error!(
                "Panic at {}:{}: {}",
                location.file(),
                location.line(),
                details
            ),
            None => tracing::error!("Panic: {}", details),
        }
    }));
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_details(&*panic);
    tracing::error!("Request handler panicked: {}", details);

    ApiError::new("Internal server error", details)
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn create_app(service: Arc<EmailService>, allow_list: OriginAllowList) -> Router {
    let allow_list = Arc::new(allow_list);

    Router::new()
        .route("/", get(rest::root))
        .route(
            "/api/generate",
            get(rest::generate_hint).post(rest::generate_email),
        )
        .route("/api/send", post(rest::send_email))
        .route("/api-doc/openapi.json", get(rest::openapi_json))
        .with_state(service)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(allow_list.cors_layer())
        .layer(middleware::from_fn_with_state(
            allow_list,
            cors::origin_guard,
        ))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_details_from_payloads() {
        let literal: &(dyn Any + Send) = &"static message";
        assert_eq!(panic_details(literal), "static message");

        let formatted: &(dyn Any + Send) = &format!("task {} failed", 3);
        assert_eq!(panic_details(formatted), "task 3 failed");

        let other: &(dyn Any + Send) = &42_u8;
        assert_eq!(panic_details(other), "unknown panic");
    }

    #[test]
    fn test_panic_hook_keeps_process_running() {
        install_panic_hook();
        let result = std::thread::spawn(|| panic!("worker exploded")).join();
        let _ = std::panic::take_hook();

        let payload = result.unwrap_err();
        assert_eq!(panic_details(&*payload), "worker exploded");
    }
}
