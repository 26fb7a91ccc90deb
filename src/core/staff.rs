//! Staff business logic.

use crate::{
    entities::{Staff, staff, staff::SalaryType},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Fields of the "add staff member" form.
#[derive(Clone, Debug, Deserialize)]
pub struct NewStaff {
    pub full_name: String,
    pub role: String,
    pub salary_type: SalaryType,
    /// Percentage, 0 to 100
    #[serde(default)]
    pub commission_rate: f64,
}

/// Adds an active staff member.
///
/// # Errors
/// Returns `Error::Config` when the name or role is empty or the commission rate is
/// outside 0 to 100.
pub async fn add_staff(
    db: &DatabaseConnection,
    owner_id: &str,
    new: NewStaff,
) -> Result<staff::Model> {
    if new.full_name.trim().is_empty() || new.role.trim().is_empty() {
        return Err(Error::invalid("Full name and role are required"));
    }
    if !(0.0..=100.0).contains(&new.commission_rate) {
        return Err(Error::invalid(format!(
            "Commission rate must be between 0 and 100, got {}",
            new.commission_rate
        )));
    }

    let member = staff::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        full_name: Set(new.full_name.trim().to_string()),
        role: Set(new.role.trim().to_string()),
        salary_type: Set(new.salary_type),
        commission_rate: Set(new.commission_rate),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(staff_id = member.id, "Staff member added");
    Ok(member)
}

/// An owner's staff, newest first.
pub async fn list_staff(db: &DatabaseConnection, owner_id: &str) -> Result<Vec<staff::Model>> {
    Staff::find()
        .filter(staff::Column::OwnerId.eq(owner_id))
        .order_by_desc(staff::Column::CreatedAt)
        .order_by_desc(staff::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Activates or deactivates a staff member.
pub async fn set_staff_active(
    db: &DatabaseConnection,
    owner_id: &str,
    staff_id: i64,
    active: bool,
) -> Result<staff::Model> {
    let member = Staff::find_by_id(staff_id)
        .filter(staff::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Staff", staff_id))?;

    let mut model: staff::ActiveModel = member.into();
    model.is_active = Set(active);
    model.update(db).await.map_err(Into::into)
}
