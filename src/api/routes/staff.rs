use crate::{
    api::{AppState, extract::Owner},
    core::staff::{self, NewStaff},
    entities::staff as staff_entity,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ActiveFlag {
    is_active: bool,
}

async fn list(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<staff_entity::Model>>> {
    Ok(Json(staff::list_staff(&*state.db, owner.id()).await?))
}

async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewStaff>,
) -> Result<(StatusCode, Json<staff_entity::Model>)> {
    let member = staff::add_staff(&*state.db, owner.id(), new).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn set_active(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Result<Json<staff_entity::Model>> {
    Ok(Json(
        staff::set_staff_active(&*state.db, owner.id(), id, flag.is_active).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/staff", get(list).post(create))
        .route("/staff/{id}/active", put(set_active))
}
