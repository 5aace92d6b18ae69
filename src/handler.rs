use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use crate::dto::{SendEmailRequest, SendEmailResponse};
use crate::service::{EmailService, EmailServiceError};

#[debug_handler]
pub async fn send_email(
    State(service): State<Arc<EmailService>>,
    Json(payload): Json<SendEmailRequest>,
) -> Response {
    match service.send_email(payload).await {
        Ok(r) => (StatusCode::OK, Json(r)).into_response(),
        Err(e) => {
            tracing::error!("Failed to send email: {e}");
            let status = match &e {
                EmailServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(SendEmailResponse::failed(e.to_string()))).into_response()
        }
    }
}

#[debug_handler]
pub async fn health_check() -> Response {
    (StatusCode::OK, "Hello from Vibae mailer!").into_response()
}
