//! Dashboard business logic - The owner's overview page.

use crate::{
    core::{application, document, provider},
    entities::{Customer, application::ApplicationStatus, customer},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{PaginatorTrait, prelude::*};
use serde::Serialize;

/// Deadlines further away than this are not listed.
pub const DEADLINE_WINDOW_DAYS: i64 = 30;
/// Outsourced steps due within this many days count as urgent.
pub const URGENT_WINDOW_DAYS: i64 = 3;
/// Number of recent active applications shown.
pub const RECENT_APPLICATIONS: usize = 5;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Document,
    Step,
}

/// Something that expires soon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Deadline {
    pub kind: DeadlineKind,
    /// Document or step id
    pub id: i64,
    /// Document name or step label
    pub title: String,
    pub customer_name: String,
    /// Set for steps
    pub application_id: Option<i64>,
    pub expiry_date: NaiveDate,
    /// Whole days until expiry, rounded up
    pub days_left: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecentApplication {
    pub application_id: i64,
    pub customer_name: String,
    pub service_name: Option<String>,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ProviderStats {
    pub count: usize,
    /// Rounded to one decimal, 0 without providers
    pub average_rating: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutsourcedMetrics {
    pub completed: usize,
    /// Outsourced and still open
    pub assigned: usize,
    /// Open and due within [`URGENT_WINDOW_DAYS`], overdue ones excluded
    pub urgent: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub total_customers: u64,
    pub active_applications: usize,
    pub recent_applications: Vec<RecentApplication>,
    pub pending_steps: usize,
    pub deadlines: Vec<Deadline>,
    pub providers: ProviderStats,
    pub outsourced: OutsourcedMetrics,
}

fn expiry_instant(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Days from `now` until the start of `date`, rounded up; `None` once it has passed.
#[must_use]
pub fn days_until(date: NaiveDate, now: DateTime<Utc>) -> Option<i64> {
    let millis = (expiry_instant(date)? - now).num_milliseconds();
    (millis > 0).then(|| (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
}

fn within_window(date: NaiveDate, now: DateTime<Utc>) -> Option<i64> {
    days_until(date, now).filter(|days| *days <= DEADLINE_WINDOW_DAYS)
}

/// Due within [`URGENT_WINDOW_DAYS`] and not yet passed.
fn is_urgent(date: NaiveDate, now: DateTime<Utc>) -> bool {
    expiry_instant(date).is_some_and(|at| {
        at >= now && at - now <= chrono::Duration::days(URGENT_WINDOW_DAYS)
    })
}

/// Average rating rounded to one decimal.
#[must_use]
pub fn average_rating(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Builds the dashboard for one owner as of `now`.
pub async fn get_dashboard(
    db: &DatabaseConnection,
    owner_id: &str,
    now: DateTime<Utc>,
) -> Result<Dashboard> {
    let total_customers = Customer::find()
        .filter(customer::Column::OwnerId.eq(owner_id))
        .count(db)
        .await?;

    // Newest first
    let applications = application::list_applications(db, owner_id, None).await?;

    let active: Vec<&application::ApplicationOverview> = applications
        .iter()
        .filter(|o| o.application.status == ApplicationStatus::Active)
        .collect();
    let recent_applications = active
        .iter()
        .take(RECENT_APPLICATIONS)
        .map(|o| RecentApplication {
            application_id: o.application.id,
            customer_name: o.customer_name.clone(),
            service_name: o.service_name.clone(),
            progress: o.application.progress,
            created_at: o.application.created_at,
        })
        .collect();
    let pending_steps = applications
        .iter()
        .flat_map(|o| o.steps.iter())
        .filter(|s| !s.is_completed)
        .count();

    let mut deadlines = Vec::new();
    let mut outsourced = OutsourcedMetrics::default();
    for overview in applications
        .iter()
        .filter(|o| o.application.status != ApplicationStatus::Closed)
    {
        for step in &overview.steps {
            if step.is_outsource {
                if step.is_completed {
                    outsourced.completed += 1;
                } else {
                    outsourced.assigned += 1;
                    if step.expiry_date.is_some_and(|d| is_urgent(d, now)) {
                        outsourced.urgent += 1;
                    }
                }
            }

            if step.is_completed {
                continue;
            }
            let Some(expiry_date) = step.expiry_date else {
                continue;
            };
            if let Some(days_left) = within_window(expiry_date, now) {
                deadlines.push(Deadline {
                    kind: DeadlineKind::Step,
                    id: step.id,
                    title: step.label.clone(),
                    customer_name: overview.customer_name.clone(),
                    application_id: Some(overview.application.id),
                    expiry_date,
                    days_left,
                });
            }
        }
    }

    for (doc, owner) in document::documents_with_expiry(db, owner_id).await? {
        let Some(expiry_date) = doc.expiry_date else {
            continue;
        };
        if let Some(days_left) = within_window(expiry_date, now) {
            deadlines.push(Deadline {
                kind: DeadlineKind::Document,
                id: doc.id,
                title: doc.name,
                customer_name: owner.name,
                application_id: None,
                expiry_date,
                days_left,
            });
        }
    }
    deadlines.sort_by_key(|d| (d.days_left, d.expiry_date, d.id));

    let ratings: Vec<f64> = provider::list_providers(db, owner_id)
        .await?
        .iter()
        .map(|p| p.rating)
        .collect();

    Ok(Dashboard {
        total_customers,
        active_applications: active.len(),
        recent_applications,
        pending_steps,
        deadlines,
        providers: ProviderStats {
            count: ratings.len(),
            average_rating: average_rating(&ratings),
        },
        outsourced,
    })
}
