use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tutorbook::config::AppConfig;
use tutorbook::db;
use tutorbook::events::EventBus;
use tutorbook::handlers;
use tutorbook::models::timestamp;
use tutorbook::services::mail::log::LogMailer;
use tutorbook::services::mail::smtp::SmtpMailer;
use tutorbook::services::mail::Mailer;
use tutorbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let mut conn = db::init_db(&config.database_url)?;
    if config.seed_demo_data {
        db::seed::seed_demo_data(&mut conn, timestamp::now())?;
    }

    let mailer: Arc<dyn Mailer> = if config.smtp_host.is_empty() {
        tracing::info!("SMTP_HOST not set, booking emails will only be logged");
        Arc::new(LogMailer)
    } else {
        tracing::info!("using SMTP mailer (host: {})", config.smtp_host);
        Arc::new(SmtpMailer::new(
            &config.smtp_host,
            config.smtp_port,
            &config.smtp_user,
            &config.smtp_pass,
            &config.email_from,
        )?)
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        events: EventBus::new(config.event_capacity),
        mailer,
    });

    let cors = match &config.client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let app = handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
