pub mod config;
pub mod cors;
pub mod dto;
pub mod handler;
pub mod mailer;
pub mod service;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use std::sync::Arc;

use cors::AllowedOrigins;
use service::EmailService;

/// Builds the HTTP surface around an already-initialised service.
///
/// The origin guard is the outermost layer so a disallowed origin never
/// reaches the CORS layer or the handlers.
pub fn app(service: Arc<EmailService>, origins: AllowedOrigins) -> Router {
    Router::new()
        .route("/send-email", post(handler::send_email))
        .route("/", get(handler::health_check))
        .with_state(service)
        .layer(origins.cors_layer())
        .layer(middleware::from_fn_with_state(origins, cors::origin_guard))
        .layer(TraceLayer::new_for_http())
}
