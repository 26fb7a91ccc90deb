//! Customer entity - The people and companies services are delivered to.
//!
//! Every customer belongs to one owner (tenant) and is the anchor for applications,
//! documents, quotations, and invoices.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the customer is a private person or an organisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CustomerKind {
    /// A private person
    #[sea_orm(string_value = "Individual")]
    Individual,
    /// A company or other organisation
    #[sea_orm(string_value = "Company")]
    Company,
}

/// Customer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this customer belongs to
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// Individual or company
    pub kind: CustomerKind,
    /// Contact email, required
    pub email: String,
    /// Contact phone number
    pub phone: String,
    /// Optional WhatsApp number used for step notifications
    pub whatsapp: Option<String>,
    /// Free-form notes
    pub details: Option<String>,
    /// Tax registration number, printed on invoices
    pub trn: Option<String>,
    /// When the customer was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One customer has many applications
    #[sea_orm(has_many = "super::application::Entity")]
    Applications,
    /// One customer has many documents
    #[sea_orm(has_many = "super::document::Entity")]
    Documents,
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
