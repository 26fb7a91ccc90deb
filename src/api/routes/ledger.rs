use crate::{
    api::{AppState, extract::Owner},
    core::ledger::{self, LedgerSummary, NewAccount, NewTransaction, TransactionEntry},
    entities::{account, transaction},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

async fn list_accounts(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<account::Model>>> {
    Ok(Json(ledger::list_accounts(&*state.db, owner.id()).await?))
}

async fn create_account(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewAccount>,
) -> Result<(StatusCode, Json<account::Model>)> {
    let account = ledger::create_account(&*state.db, owner.id(), new).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn list_transactions(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<TransactionEntry>>> {
    Ok(Json(ledger::list_transactions(&*state.db, owner.id()).await?))
}

async fn record_transaction(
    State(state): State<AppState>,
    owner: Owner,
    Json(new): Json<NewTransaction>,
) -> Result<(StatusCode, Json<transaction::Model>)> {
    let transaction = ledger::record_transaction(&*state.db, owner.id(), new).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn summary(State(state): State<AppState>, owner: Owner) -> Result<Json<LedgerSummary>> {
    Ok(Json(ledger::transaction_summary(&*state.db, owner.id()).await?))
}

/// Accounts and the transactions posted to them.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/transactions", get(list_transactions).post(record_transaction))
        .route("/transactions/summary", get(summary))
}
