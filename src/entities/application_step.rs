//! Application step entity - One ordered task within an application's workflow.
//!
//! `position` defines the order; after every save the positions of an application's steps
//! are exactly `0..n-1`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Application step database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "application_steps")]
pub struct Model {
    /// Unique identifier for the step
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Application that owns the step
    pub application_id: i64,
    /// Task label shown on the workflow board
    pub label: String,
    /// Optional details copied from the template
    pub description: Option<String>,
    /// Zero-based order within the application
    pub position: i32,
    /// Whether the task is done
    pub is_completed: bool,
    /// Whether the task is handled by an outside provider
    pub is_outsource: bool,
    /// Provider the task is assigned to
    pub provider_id: Option<i64>,
    /// Provider display name at assignment time
    pub outsource_provider: Option<String>,
    /// Due date for the task
    pub expiry_date: Option<Date>,
    /// When the step was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ApplicationStep` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each step belongs to one application
    #[sea_orm(
        belongs_to = "super::application::Entity",
        from = "Column::ApplicationId",
        to = "super::application::Column::Id"
    )]
    Application,
    /// Outsourced steps may reference a provider
    #[sea_orm(
        belongs_to = "super::service_provider::Entity",
        from = "Column::ProviderId",
        to = "super::service_provider::Column::Id"
    )]
    Provider,
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl Related<super::service_provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
