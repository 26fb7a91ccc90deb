//! Request extractors.

use crate::errors::Error;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the caller's owner id.
pub const OWNER_HEADER: &str = "x-user-id";

/// The owner a request acts for, taken from the [`OWNER_HEADER`] header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    /// The owner id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| Error::Unauthorized {
                message: format!("missing {OWNER_HEADER} header"),
            })
    }
}
