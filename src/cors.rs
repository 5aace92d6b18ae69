//! Origin allow-list.
//!
//! Browsers only honour CORS headers, so a disallowed origin is also turned
//! away server-side before the request is routed.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: Arc<Vec<String>>,
}

impl AllowedOrigins {
    pub fn new(origins: Vec<String>) -> Self {
        Self {
            origins: Arc::new(origins),
        }
    }

    /// Exact string match, no wildcards.
    pub fn allows(&self, origin: &HeaderValue) -> bool {
        origin
            .to_str()
            .is_ok_and(|origin| self.origins.iter().any(|allowed| allowed == origin))
    }

    fn header_values(&self) -> Vec<HeaderValue> {
        self.origins
            .iter()
            .filter_map(|origin| {
                // tower-http panics on a wildcard inside an origin list
                if origin.trim() == "*" {
                    tracing::warn!("Ignoring wildcard allowed origin");
                    return None;
                }
                match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(
                            "Ignoring allowed origin '{}': not a valid header value",
                            origin
                        );
                        None
                    }
                }
            })
            .collect()
    }

    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.header_values()))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Requests without an `Origin` header are treated as same-origin or
/// non-browser callers and pass through.
pub async fn origin_guard(
    State(allowed): State<AllowedOrigins>,
    request: Request,
    next: Next,
) -> Response {
    match request.headers().get(header::ORIGIN) {
        Some(origin) if !allowed.allows(origin) => {
            tracing::warn!("Rejected request from origin {:?}", origin);
            (StatusCode::FORBIDDEN, "Not allowed by CORS").into_response()
        }
        _ => next.run(request).await,
    }
}
