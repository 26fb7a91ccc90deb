use crate::{
    api::{AppState, extract::Owner},
    core::provider::{self, ProviderAssignment, ProviderInput},
    entities::service_provider,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

async fn list(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<service_provider::Model>>> {
    Ok(Json(provider::list_providers(&*state.db, owner.id()).await?))
}

async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(input): Json<ProviderInput>,
) -> Result<(StatusCode, Json<service_provider::Model>)> {
    let provider = provider::create_provider(&*state.db, owner.id(), input).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

async fn update(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(input): Json<ProviderInput>,
) -> Result<Json<service_provider::Model>> {
    Ok(Json(
        provider::update_provider(&*state.db, owner.id(), id, input).await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    provider::delete_provider(&*state.db, owner.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assignments(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProviderAssignment>>> {
    Ok(Json(
        provider::list_assignments(&*state.db, owner.id(), id).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(list).post(create))
        .route("/providers/{id}", put(update).delete(remove))
        .route("/providers/{id}/assignments", get(assignments))
}
