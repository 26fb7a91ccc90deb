//! Application entity - A service workflow instantiated for one customer.
//!
//! Applications are created either directly from a template (status `Active`) or by a
//! quotation (status `Proposed`). `progress` is derived from the steps and rewritten on
//! every workflow save.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ApplicationStatus {
    /// Incoming, not yet offered
    #[sea_orm(string_value = "Draft")]
    Draft,
    /// Offered through a quotation that has not been approved yet
    #[sea_orm(string_value = "Proposed")]
    Proposed,
    /// Work in progress
    #[sea_orm(string_value = "Active")]
    Active,
    /// Finished or abandoned
    #[sea_orm(string_value = "Closed")]
    Closed,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "Draft",
            Self::Proposed => "Proposed",
            Self::Active => "Active",
            Self::Closed => "Closed",
        };
        f.write_str(label)
    }
}

/// Application database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    /// Unique identifier for the application
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this application belongs to
    pub owner_id: String,
    /// Customer the service is delivered to
    pub customer_id: i64,
    /// Template the steps were copied from, if any
    pub service_template_id: Option<i64>,
    /// Quotation that created this application, if any
    pub quotation_id: Option<i64>,
    /// Short description, usually the template name
    pub description: Option<String>,
    /// Current lifecycle status
    pub status: ApplicationStatus,
    /// Percentage of completed steps (0-100)
    pub progress: i32,
    /// When the application was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Application and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each application belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// Each application may originate from one template
    #[sea_orm(
        belongs_to = "super::service_template::Entity",
        from = "Column::ServiceTemplateId",
        to = "super::service_template::Column::Id"
    )]
    ServiceTemplate,
    /// One application owns many steps
    #[sea_orm(has_many = "super::application_step::Entity")]
    Steps,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::service_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceTemplate.def()
    }
}

impl Related<super::application_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
