use crate::{
    api::{AppState, extract::Owner},
    core::invoice::{self, InvoiceSummary, InvoiceWithItems, Payment, PaymentOutcome},
    entities::invoice::InvoiceStatus,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
struct StatusFilter {
    #[serde(default)]
    status: Option<InvoiceStatus>,
}

#[derive(Debug, Serialize)]
struct OverdueSweep {
    marked: u64,
}

async fn list(
    State(state): State<AppState>,
    owner: Owner,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<InvoiceSummary>>> {
    Ok(Json(
        invoice::list_invoices(&*state.db, owner.id(), filter.status).await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceWithItems>> {
    Ok(Json(invoice::get_invoice(&*state.db, owner.id(), id).await?))
}

async fn pay(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(payment): Json<Payment>,
) -> Result<Json<PaymentOutcome>> {
    Ok(Json(
        invoice::record_payment(&*state.db, owner.id(), id, payment).await?,
    ))
}

/// Flags open invoices whose due date passed before today.
async fn sweep_overdue(State(state): State<AppState>, owner: Owner) -> Result<Json<OverdueSweep>> {
    let today = chrono::Utc::now().date_naive();
    let marked = invoice::mark_overdue_invoices(&*state.db, owner.id(), today).await?;
    Ok(Json(OverdueSweep { marked }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list))
        .route("/invoices/overdue", post(sweep_overdue))
        .route("/invoices/{id}", get(show))
        .route("/invoices/{id}/payments", post(pay))
}
