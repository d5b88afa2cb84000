use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use std::sync::Arc;

use crate::dto::ApiError;

pub const ORIGIN_REJECTED: &str = "CORS not allowed for this origin";

#[derive(Debug, thiserror::Error)]
#[error("Configured origin '{0}' is not a valid header value")]
pub struct InvalidOrigin(String);

/// Origins permitted to call the API from a browser.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Vec<HeaderValue>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Result<Self, InvalidOrigin>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|origin| {
                let origin = origin.as_ref().trim().trim_end_matches('/');
                HeaderValue::from_str(origin).map_err(|_| InvalidOrigin(origin.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { origins })
    }

    pub fn contains(&self, origin: &HeaderValue) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    /// Accepts no origin, a listed origin, or the request's own host.
    pub fn permits(&self, origin: Option<&HeaderValue>, host: Option<&HeaderValue>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        self.contains(origin) || is_same_origin(origin, host)
    }

    /// CORS response headers for listed origins.
    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.clone()))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
    }
}

/// Compares the Origin authority with `Host`. The scheme is not compared:
/// behind a TLS-terminating proxy the server only ever sees plain HTTP.
fn is_same_origin(origin: &HeaderValue, host: Option<&HeaderValue>) -> bool {
    let (Some(host), Ok(origin)) = (host.and_then(|h| h.to_str().ok()), origin.to_str()) else {
        return false;
    };
    let Ok(url) = url::Url::parse(origin) else {
        return false;
    };
    let Some(origin_host) = url.host_str() else {
        return false;
    };

    let authority = match url.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host)
}

/// Rejects cross-origin requests from origins outside the allow-list.
pub async fn origin_guard(
    State(allow_list): State<Arc<OriginAllowList>>,
    request: Request,
    next: Next,
) -> Response {
    let rejected = {
        let headers = request.headers();
        let origin = headers.get(header::ORIGIN);
        (!allow_list.permits(origin, headers.get(header::HOST))).then(|| {
            origin
                .and_then(|o| o.to_str().ok())
                .unwrap_or("<non-ascii origin>")
                .to_string()
        })
    };

    let Some(origin) = rejected else {
        return next.run(request).await;
    };
    tracing::warn!("Rejected request from origin '{}'", origin);

    ApiError::new(ORIGIN_REJECTED, origin).with_status(StatusCode::FORBIDDEN)
}
