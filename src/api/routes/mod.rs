//! Route handlers organized by entity.

/// Application, board, and workflow step routes
pub mod applications;
/// Customer and document routes
pub mod customers;
/// Dashboard route
pub mod dashboard;
/// Invoice and payment routes
pub mod invoices;
/// Account and transaction routes
pub mod ledger;
/// Public customer portal route
pub mod portal;
/// Provider routes
pub mod providers;
/// Quotation routes
pub mod quotations;
/// Staff routes
pub mod staff;
/// Template routes
pub mod templates;

use serde::Deserialize;

/// `?search=` query parameter shared by the list routes.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive search term
    #[serde(default)]
    pub search: Option<String>,
}

impl SearchQuery {
    /// The term, if one was given
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }
}
