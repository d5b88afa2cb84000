use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use serde_json::Value;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{ApiError, GenerationRequest, GenerationResult, SendRequest, SendResult},
    service::{EmailService, ServiceError},
};

pub const ROOT_MESSAGE: &str = "Backend is running";
pub const GENERATE_HINT: &str = "This endpoint expects a POST request with a 'prompt' field.";

#[derive(OpenApi)]
#[openapi(
    paths(generate_email, send_email),
    components(schemas(GenerationRequest, GenerationResult, SendRequest, SendResult, ApiError)),
    tags(
        (name = "email", description = "Draft and send emails")
    )
)]
pub struct ApiDoc;

fn invalid_json(rejection: &JsonRejection) -> Response {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    ApiError::new("Invalid JSON body", rejection.body_text()).with_status(StatusCode::BAD_REQUEST)
}

fn service_failure(error: &ServiceError) -> Response {
    let (title, details) = match error {
        ServiceError::Generation(e) => ("Failed to generate email", e.details()),
        ServiceError::Delivery(e) => ("Failed to send email", Value::String(e.to_string())),
    };
    ApiError::new(title, details).with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

#[debug_handler]
pub async fn root() -> Response {
    (StatusCode::OK, ROOT_MESSAGE).into_response()
}

#[debug_handler]
pub async fn generate_hint() -> Response {
    (StatusCode::OK, GENERATE_HINT).into_response()
}

#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Email drafted", body = GenerationResult),
        (status = 400, description = "Missing or invalid prompt", body = ApiError),
        (status = 500, description = "Completion service failure", body = ApiError)
    ),
    tag = "email"
)]
#[debug_handler]
pub async fn generate_email(
    State(service): State<Arc<EmailService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return invalid_json(&rejection),
    };

    let request = match GenerationRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match service.generate_email(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!("Failed to generate email: {e}");
            service_failure(&e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/send",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Email sent", body = SendResult),
        (status = 400, description = "Missing recipients or content", body = ApiError),
        (status = 500, description = "Mail relay failure", body = ApiError)
    ),
    tag = "email"
)]
#[debug_handler]
pub async fn send_email(
    State(service): State<Arc<EmailService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return invalid_json(&rejection),
    };

    let request = match SendRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match service.send_email(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!("Failed to send email: {e}");
            service_failure(&e)
        }
    }
}

#[debug_handler]
pub async fn openapi_json() -> Response {
    Json(ApiDoc::openapi()).into_response()
}
