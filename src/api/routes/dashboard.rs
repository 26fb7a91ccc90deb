use crate::{
    api::{AppState, extract::Owner},
    core::dashboard::{self, Dashboard},
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::get};

async fn show(State(state): State<AppState>, owner: Owner) -> Result<Json<Dashboard>> {
    let dashboard = dashboard::get_dashboard(&*state.db, owner.id(), chrono::Utc::now()).await?;
    Ok(Json(dashboard))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(show))
}
