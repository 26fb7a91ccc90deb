//! Quotation entity - A priced offer to a customer.
//!
//! Approving a quotation activates its application and produces a draft invoice.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a quotation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    /// Being prepared
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Handed to the customer
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Accepted; an invoice exists
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl std::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Quotation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    /// Unique identifier for the quotation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this quotation belongs to
    pub owner_id: String,
    /// Customer the offer is made to
    pub customer_id: i64,
    /// Template the offer was built from, if any
    pub service_template_id: Option<i64>,
    /// Current lifecycle status
    pub status: QuotationStatus,
    /// Sum of item totals
    pub subtotal: f64,
    /// VAT on the subtotal
    pub vat: f64,
    /// Subtotal plus VAT
    pub total: f64,
    /// Last day the offer is valid
    pub valid_until: Date,
    /// When the quotation was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Quotation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each quotation is addressed to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One quotation has many line items
    #[sea_orm(has_many = "super::quotation_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quotation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
