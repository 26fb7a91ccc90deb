//! Transaction entity - A single ledger movement on an account.
//!
//! Amounts are always positive; `kind` says whether money came in (`credit`) or went out
//! (`debit`).
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a ledger movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving the account
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Money arriving in the account
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl TransactionKind {
    /// Signed effect of `amount` on the account balance.
    #[must_use]
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account the movement is booked on
    pub account_id: i64,
    /// Debit or credit
    pub kind: TransactionKind,
    /// Booking category, e.g. `"client_payment"`
    pub category: String,
    /// Positive amount of the movement
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Owner id of the user who recorded it
    pub created_by: Option<String>,
    /// When the transaction was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
