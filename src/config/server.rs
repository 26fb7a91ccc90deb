//! Server settings read from the environment.

use crate::errors::{Error, Result};
use std::net::SocketAddr;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Runtime settings for the HTTP server and notification hook.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the API listens on (`TRUSTFLOW_BIND`)
    pub bind_addr: SocketAddr,
    /// Where step-completion notifications are POSTed (`NOTIFY_WEBHOOK_URL`)
    pub notify_webhook_url: Option<String>,
    /// Owner id that seeded templates belong to (`SEED_OWNER_ID`)
    pub seed_owner_id: String,
}

impl ServerConfig {
    /// Reads the settings from environment variables, applying defaults.
    ///
    /// # Errors
    /// Returns `Error::Config` if `TRUSTFLOW_BIND` is not a socket address.
    pub fn from_env() -> Result<Self> {
        let bind =
            std::env::var("TRUSTFLOW_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind.parse().map_err(|e| Error::Config {
            message: format!("Invalid TRUSTFLOW_BIND {bind:?}: {e}"),
        })?;

        let notify_webhook_url = std::env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let seed_owner_id =
            std::env::var("SEED_OWNER_ID").unwrap_or_else(|_| "system".to_string());

        Ok(Self {
            bind_addr,
            notify_webhook_url,
            seed_owner_id,
        })
    }
}
