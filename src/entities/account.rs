//! Account entity - A bank account, card, or cash box money moves through.
//!
//! `current_balance` is only ever changed by recording transactions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank account
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Credit or debit card
    #[sea_orm(string_value = "card")]
    Card,
    /// Petty cash
    #[sea_orm(string_value = "cash")]
    Cash,
}

/// Account database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this account belongs to
    pub owner_id: String,
    /// Display name (e.g. "Emirates NBD")
    pub name: String,
    /// Bank, card, or cash
    pub kind: AccountKind,
    /// Balance when the account was opened
    pub initial_balance: f64,
    /// Balance after all recorded transactions
    pub current_balance: f64,
    /// ISO currency code
    pub currency: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
