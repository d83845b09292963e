use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tenant_cms::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    google::{GoogleState, HttpGoogleVerifier, MockGoogleVerifier},
    mailer::{MailerState, MockMailer, SmtpMailer},
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for initializing
/// all core components: Configuration, Logging, Database, Mail, Federation and
/// the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tenant_cms=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // Instantiate the Repository, wrapping it in an Arc for thread-safe sharing.
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Mail Initialization
    // Local runs without SMTP settings get the recording mock instead of a relay.
    let mailer: MailerState = match (&config.smtp_host, &config.smtp_user, &config.smtp_password)
    {
        (Some(host), Some(user), Some(password)) => Arc::new(
            SmtpMailer::new(
                host,
                user,
                password,
                &config.mail_from,
                &config.activation_base_url,
            )
            .expect("FATAL: Failed to build SMTP transport."),
        ),
        _ => {
            tracing::warn!("SMTP not configured; activation mail will not be delivered");
            Arc::new(MockMailer::new())
        }
    };

    // 6. Federation Verifier Initialization
    let google: GoogleState = match &config.google_client_id {
        Some(client_id) => Arc::new(HttpGoogleVerifier::new(client_id)),
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; google authentication is disabled");
            Arc::new(MockGoogleVerifier::new_failing())
        }
    };

    // 7. Unified State Assembly
    let app_state = AppState {
        repo,
        mailer,
        google,
        config,
    };

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
