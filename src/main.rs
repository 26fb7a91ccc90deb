use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trustflow::{
    api::{self, AppState},
    config,
    core::notify::{LogNotifier, Notifier, WebhookNotifier},
    errors::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;

    // 4. Connect and create tables
    let db = config::database::create_connection(&app_config.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed service templates from config.toml
    config::templates::seed_templates(
        &db,
        &app_config.server.seed_owner_id,
        &app_config.templates,
    )
    .await
    .inspect(|created| info!("Seeded {created} service templates."))
    .inspect_err(|e| error!("Failed to seed templates: {}", e))?;

    // 6. Serve
    let notifier: Arc<dyn Notifier> = match &app_config.server.notify_webhook_url {
        Some(url) => {
            info!("Step notifications go to the configured webhook");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    api::serve(AppState::new(db, notifier), app_config.server.bind_addr).await
}
