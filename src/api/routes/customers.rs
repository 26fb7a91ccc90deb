use crate::{
    api::{AppState, extract::Owner, routes::SearchQuery},
    core::{
        customer::{self, CustomerProfile, NewCustomer},
        document::{self, NewDocument},
    },
    entities::{customer as customer_entity, document as document_entity},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};

async fn list(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<customer_entity::Model>>> {
    let customers = customer::list_customers(&*state.db, owner.id(), query.term()).await?;
    Ok(Json(customers))
}

async fn create(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewCustomer>,
) -> Result<(StatusCode, Json<customer_entity::Model>)> {
    let customer = customer::create_customer(&*state.db, owner.id(), new).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn profile(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<CustomerProfile>> {
    Ok(Json(
        customer::get_customer_profile(&*state.db, owner.id(), id).await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    customer::delete_customer(&*state.db, owner.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_documents(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<Vec<document_entity::Model>>> {
    Ok(Json(document::list_documents(&*state.db, owner.id(), id).await?))
}

async fn add_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(new): Json<NewDocument>,
) -> Result<(StatusCode, Json<document_entity::Model>)> {
    let document = document::add_document(&*state.db, owner.id(), id, new).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn delete_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    document::delete_document(&*state.db, owner.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list).post(create))
        .route("/customers/{id}", get(profile).delete(remove))
        .route(
            "/customers/{id}/documents",
            get(list_documents).post(add_document),
        )
        .route("/documents/{id}", delete(delete_document))
}
