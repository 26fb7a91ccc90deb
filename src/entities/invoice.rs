//! Invoice entity - A bill raised against a customer, usually from an approved quotation.
//!
//! Status moves to `partial` or `paid` as payments are recorded against an account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Generated but not yet issued
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Issued, nothing paid
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    /// Some payments recorded
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Fully paid
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Past its due date and not fully paid
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        };
        f.write_str(label)
    }
}

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this invoice belongs to
    pub owner_id: String,
    /// Customer being billed
    pub customer_id: i64,
    /// Application the work belongs to, if any
    pub application_id: Option<i64>,
    /// Printed number, `INV-` followed by six digits
    pub invoice_number: String,
    /// Current lifecycle status
    pub status: InvoiceStatus,
    /// Sum of item totals
    pub subtotal: f64,
    /// VAT on the subtotal
    pub vat: f64,
    /// Amount due
    pub total: f64,
    /// Sum of recorded payments
    pub amount_paid: f64,
    /// Payment due date
    pub due_date: Date,
    /// When the invoice was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invoice bills one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One invoice has many line items
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
