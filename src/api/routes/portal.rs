use crate::{
    api::AppState,
    core::portal::{self, Portal},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

/// No owner header: the portal link is shared with the customer.
async fn show(State(state): State<AppState>, Path(customer_id): Path<i64>) -> Result<Json<Portal>> {
    Ok(Json(portal::get_portal(&*state.db, customer_id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/portal/{customer_id}", get(show))
}
