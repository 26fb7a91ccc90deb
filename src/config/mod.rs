/// Database configuration and connection management
pub mod database;

/// Server and notification settings from environment variables
pub mod server;

/// Service template seeding from config.toml
pub mod templates;

use crate::errors::Result;
use tracing::info;

/// Everything the binary needs to start.
#[derive(Debug)]
pub struct AppConfig {
    /// Database connection string
    pub database_url: String,
    /// HTTP and notification settings
    pub server: server::ServerConfig,
    /// Templates to seed on start-up
    pub templates: templates::TemplatesConfig,
}

/// Loads the full application configuration from the environment and `config.toml`.
///
/// `TRUSTFLOW_CONFIG` overrides the config file location.
pub fn load_app_configuration() -> Result<AppConfig> {
    let config_path =
        std::env::var("TRUSTFLOW_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    let app_config = AppConfig {
        database_url: database::get_database_url(),
        server: server::ServerConfig::from_env()?,
        templates: templates::load_templates_if_present(&config_path)?,
    };
    info!(
        "Loaded configuration ({} seed templates)",
        app_config.templates.templates.len()
    );
    Ok(app_config)
}
