use crate::{
    api::{AppState, extract::Owner},
    core::template::{self, TemplateUpdate, TemplateWithSteps},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

async fn list(State(state): State<AppState>, owner: Owner) -> Result<Json<Vec<TemplateWithSteps>>> {
    Ok(Json(template::list_templates(&*state.db, owner.id()).await?))
}

/// Creates the template, then stores its steps.
async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<TemplateUpdate>,
) -> Result<(StatusCode, Json<TemplateWithSteps>)> {
    let created = template::create_template(
        &*state.db,
        owner.id(),
        new.name.clone(),
        new.description.clone(),
        new.base_charge,
    )
    .await?;
    let template = template::update_template(&*state.db, owner.id(), created.id, new).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn show(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<TemplateWithSteps>> {
    template::get_template_with_steps(&*state.db, owner.id(), id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Template", id))
}

async fn update(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(update): Json<TemplateUpdate>,
) -> Result<Json<TemplateWithSteps>> {
    Ok(Json(
        template::update_template(&*state.db, owner.id(), id, update).await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    template::delete_template(&*state.db, owner.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list).post(create))
        .route("/templates/{id}", get(show).put(update).delete(remove))
}
