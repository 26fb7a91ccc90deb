//! Customer portal - The read-only progress page a customer is sent a link to.
//!
//! Only customer-facing fields are exposed; provider assignments stay internal.

use crate::{
    core::workflow::{self, StepState},
    entities::{
        Application, ApplicationStep, Customer, ServiceTemplate, application,
        application::ApplicationStatus, application_step,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortalStep {
    pub id: i64,
    pub label: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_completed: bool,
    pub expiry_date: Option<NaiveDate>,
    pub state: StepState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortalApplication {
    pub id: i64,
    pub service_name: Option<String>,
    pub service_description: Option<String>,
    pub description: Option<String>,
    pub status: ApplicationStatus,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<PortalStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Portal {
    pub customer_name: String,
    pub applications: Vec<PortalApplication>,
}

fn portal_steps(steps: Vec<application_step::Model>) -> Vec<PortalStep> {
    let states = workflow::step_states(&steps);
    steps
        .into_iter()
        .zip(states)
        .map(|(step, state)| PortalStep {
            id: step.id,
            label: step.label,
            description: step.description,
            position: step.position,
            is_completed: step.is_completed,
            expiry_date: step.expiry_date,
            state,
        })
        .collect()
}

/// Loads the portal page of one customer.
///
/// # Errors
/// Returns `Error::NotFound` for an unknown customer.
pub async fn get_portal(db: &DatabaseConnection, customer_id: i64) -> Result<Portal> {
    let customer = Customer::find_by_id(customer_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Customer", customer_id))?;

    let rows = Application::find()
        .filter(application::Column::CustomerId.eq(customer_id))
        .find_also_related(ServiceTemplate)
        .order_by_desc(application::Column::CreatedAt)
        .order_by_desc(application::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i64> = rows.iter().map(|(a, _)| a.id).collect();
    let mut steps: HashMap<i64, Vec<application_step::Model>> = HashMap::new();
    for step in ApplicationStep::find()
        .filter(application_step::Column::ApplicationId.is_in(ids))
        .order_by_asc(application_step::Column::Position)
        .order_by_asc(application_step::Column::Id)
        .all(db)
        .await?
    {
        steps.entry(step.application_id).or_default().push(step);
    }

    let applications = rows
        .into_iter()
        .map(|(application, template)| PortalApplication {
            id: application.id,
            service_name: template.as_ref().map(|t| t.name.clone()),
            service_description: template.and_then(|t| t.description),
            description: application.description,
            status: application.status,
            progress: application.progress,
            created_at: application.created_at,
            steps: portal_steps(steps.remove(&application.id).unwrap_or_default()),
        })
        .collect();

    Ok(Portal {
        customer_name: customer.name,
        applications,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::application::{create_application, open_workflow, save_workflow};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_portal_shows_progress_and_states() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        let application =
            create_application(&db, TEST_OWNER, customer.id, template.template.id).await?;

        let mut draft = open_workflow(&db, TEST_OWNER, application.id).await?;
        let first = draft.steps()[0].key;
        draft.set_completed(first, true)?;
        save_workflow(&db, TEST_OWNER, &draft, &RecordingNotifier::default()).await?;

        let portal = get_portal(&db, customer.id).await?;
        assert_eq!(portal.customer_name, customer.name);
        assert_eq!(portal.applications.len(), 1);

        let shown = &portal.applications[0];
        assert_eq!(shown.service_name.as_deref(), Some("Golden Visa"));
        assert_eq!(shown.progress, 33);
        let states: Vec<StepState> = shown.steps.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            [StepState::Completed, StepState::Running, StepState::Pending]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_portal_unknown_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_portal(&db, 404).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Customer", .. })));
        Ok(())
    }
}
