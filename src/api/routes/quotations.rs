use crate::{
    api::{AppState, extract::Owner, routes::SearchQuery},
    core::quotation::{self, Approval, NewQuotation, QuotationSummary, QuotationWithItems},
    entities::quotation as quotation_entity,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

async fn list(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<QuotationSummary>>> {
    Ok(Json(
        quotation::list_quotations(&*state.db, owner.id(), query.term()).await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewQuotation>,
) -> Result<(StatusCode, Json<QuotationWithItems>)> {
    let quotation = quotation::create_quotation(&*state.db, owner.id(), new).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn show(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<QuotationWithItems>> {
    Ok(Json(quotation::get_quotation(&*state.db, owner.id(), id).await?))
}

async fn send(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<quotation_entity::Model>> {
    Ok(Json(quotation::mark_sent(&*state.db, owner.id(), id).await?))
}

async fn approve(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<Approval>> {
    Ok(Json(quotation::approve(&*state.db, owner.id(), id).await?))
}

async fn reject(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<quotation_entity::Model>> {
    Ok(Json(quotation::reject(&*state.db, owner.id(), id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quotations", get(list).post(create))
        .route("/quotations/{id}", get(show))
        .route("/quotations/{id}/send", post(send))
        .route("/quotations/{id}/approve", post(approve))
        .route("/quotations/{id}/reject", post(reject))
}
