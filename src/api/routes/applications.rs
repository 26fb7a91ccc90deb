use crate::{
    api::{AppState, extract::Owner, routes::SearchQuery},
    core::{
        application::{self, ApplicationOverview, Board, SaveOutcome, WorkflowView},
        workflow::{SubmittedStep, WorkflowDraft},
    },
    entities::application as application_entity,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct NewApplication {
    customer_id: i64,
    service_template_id: i64,
}

#[derive(Debug, Serialize)]
struct ApplicationDetail {
    application: application_entity::Model,
    workflow: WorkflowView,
}

async fn list(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ApplicationOverview>>> {
    let applications =
        application::list_applications(&*state.db, owner.id(), query.term()).await?;
    Ok(Json(applications))
}

async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewApplication>,
) -> Result<(StatusCode, Json<application_entity::Model>)> {
    let application = application::create_application(
        &*state.db,
        owner.id(),
        new.customer_id,
        new.service_template_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn board(State(state): State<AppState>, owner: Owner) -> Result<Json<Board>> {
    Ok(Json(application::get_board(&*state.db, owner.id()).await?))
}

async fn show(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationDetail>> {
    let application = application::require_application(&*state.db, owner.id(), id).await?;
    let workflow = application::get_workflow(&*state.db, owner.id(), id).await?;
    Ok(Json(ApplicationDetail {
        application,
        workflow,
    }))
}

async fn remove(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    application::delete_application(&*state.db, owner.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn steps(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<WorkflowView>> {
    Ok(Json(application::get_workflow(&*state.db, owner.id(), id).await?))
}

/// Replaces the step list with the client's edited draft, in display order.
async fn save_steps(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(submitted): Json<Vec<SubmittedStep>>,
) -> Result<Json<SaveOutcome>> {
    let application = application::require_application(&*state.db, owner.id(), id).await?;
    let stored = application::get_steps(&*state.db, application.id).await?;
    let draft = WorkflowDraft::from_submission(application.id, stored, submitted)?;
    let outcome =
        application::save_workflow(&*state.db, owner.id(), &draft, state.notifier.as_ref()).await?;
    Ok(Json(outcome))
}

async fn close(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<application_entity::Model>> {
    Ok(Json(
        application::close_application(&*state.db, owner.id(), id).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/applications", get(list).post(create))
        .route("/applications/board", get(board))
        .route("/applications/{id}", get(show).delete(remove))
        .route("/applications/{id}/steps", get(steps).put(save_steps))
        .route("/applications/{id}/close", post(close))
}
