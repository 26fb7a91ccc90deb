//! Staff entity - Employees of the owning business.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a staff member is paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum SalaryType {
    /// Fixed salary
    #[sea_orm(string_value = "fixed")]
    Fixed,
    /// Commission only
    #[sea_orm(string_value = "commission")]
    Commission,
    /// Salary plus commission
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

/// Staff database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: String,
    pub full_name: String,
    pub role: String,
    pub salary_type: SalaryType,
    /// Percentage, 0-100
    pub commission_rate: f64,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

/// Staff has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
