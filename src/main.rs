use tracing_subscriber::EnvFilter;
use vibae_mailer::{
    app, config, cors::AllowedOrigins, mailer::SmtpMailer, service::EmailService,
};

use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to locate or load config: {e}");
    });
    tracing::info!("Successfully loaded mailer config");
    tracing::info!("Allowed origins: {:?}", cfg.allowed_origins);

    // Outbound transport is built once and shared by every request
    let mailer = SmtpMailer::new(&cfg).unwrap_or_else(|e| {
        tracing::error!("Failed to set up mail transport: {e}");
        panic!("failed to set up mail transport: {e}");
    });

    // Setup service
    let service = EmailService::new(&cfg, Arc::new(mailer)).unwrap_or_else(|e| {
        tracing::error!("Invalid mailer configuration: {e}");
        panic!("invalid mailer configuration: {e}");
    });

    // Setup router
    let router = app(
        Arc::new(service),
        AllowedOrigins::new(cfg.allowed_origins.clone()),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Failed to read local address");

    tracing::info!("Email server running on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    tracing::info!("Email server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
