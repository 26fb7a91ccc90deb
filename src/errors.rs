//! Unified error type for the Trust Flow service.
//!
//! Every core operation returns [`Result`]; the API layer maps the variants onto HTTP
//! status codes.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or rejected input.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A referenced record does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"Customer"`
        entity: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// A monetary amount is zero, negative, or not finite where that is not allowed.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A status change that the record's current status does not permit.
    #[error("Cannot {action} a {entity} that is {status}")]
    InvalidTransition {
        /// Entity kind, e.g. `"quotation"`
        entity: &'static str,
        /// The attempted action, e.g. `"approve"`
        action: &'static str,
        /// Current status of the record
        status: String,
    },

    /// The request does not say which owner it acts for.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable explanation
        message: String,
    },

    /// The record is still referenced and cannot be removed.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable explanation
        message: String,
    },

    /// The notification hook failed.
    #[error("Notification error: {0}")]
    Notification(#[from] reqwest::Error),

    /// I/O failure (config file, listener socket).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] keyed by a numeric id.
    #[must_use]
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
