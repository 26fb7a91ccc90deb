//! Customer notifications for completed workflow steps.
//!
//! Delivery is behind the [`Notifier`] trait. [`WebhookNotifier`] POSTs each notification
//! as JSON to an external function that sends the email/WhatsApp message;
//! [`LogNotifier`] only records it in the log.

use crate::core::workflow::WorkflowDraft;
use crate::entities::customer;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Payload sent for one newly completed step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNotification {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_whatsapp: Option<String>,
    pub step_name: String,
    /// One-based number of the step in the workflow
    pub step_number: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub progress_percent: i32,
    pub service_name: String,
    pub application_id: i64,
}

/// Which channels a notification went out on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NotifyOutcome {
    /// An email was sent
    #[serde(default)]
    pub email: bool,
    /// A WhatsApp message was sent
    #[serde(default)]
    pub whatsapp: bool,
}

/// Delivers step notifications to customers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    async fn notify_step_completed(&self, notification: &StepNotification)
    -> Result<NotifyOutcome>;
}

/// Notifier that only writes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_step_completed(
        &self,
        notification: &StepNotification,
    ) -> Result<NotifyOutcome> {
        info!(
            application_id = notification.application_id,
            step = %notification.step_name,
            "Step {}/{} completed for {}",
            notification.step_number,
            notification.total_steps,
            notification.customer_name
        );
        Ok(NotifyOutcome::default())
    }
}

#[derive(Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    results: NotifyOutcome,
}

/// Notifier that POSTs the JSON payload to a webhook.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier for the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_step_completed(
        &self,
        notification: &StepNotification,
    ) -> Result<NotifyOutcome> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        let body: WebhookResponse = response.json().await?;
        Ok(body.results)
    }
}

/// Sends one notification per newly completed step in a saved draft.
///
/// Customers without email and WhatsApp are skipped. Failures are logged and do not
/// stop the remaining notifications. Returns the number of notifications delivered.
pub async fn notify_newly_completed(
    notifier: &dyn Notifier,
    customer: &customer::Model,
    service_name: &str,
    draft: &WorkflowDraft,
) -> usize {
    let has_whatsapp = customer
        .whatsapp
        .as_deref()
        .is_some_and(|w| !w.trim().is_empty());
    if customer.email.trim().is_empty() && !has_whatsapp {
        return 0;
    }

    let newly_completed = draft.newly_completed();
    if newly_completed.is_empty() {
        return 0;
    }

    let total_steps = draft.steps().len();
    let completed_steps = draft.steps().iter().filter(|s| s.is_completed).count();
    let progress_percent = draft.progress();

    let mut delivered = 0;
    for step in newly_completed {
        let notification = StepNotification {
            customer_name: customer.name.clone(),
            customer_email: Some(customer.email.clone()).filter(|e| !e.trim().is_empty()),
            customer_whatsapp: customer.whatsapp.clone().filter(|w| !w.trim().is_empty()),
            step_name: step.label,
            step_number: step.step_number,
            total_steps,
            completed_steps,
            progress_percent,
            service_name: service_name.to_string(),
            application_id: draft.application_id(),
        };

        match notifier.notify_step_completed(&notification).await {
            Ok(_) => delivered += 1,
            Err(e) => warn!(
                "Failed to notify {} about step {}: {}",
                customer.name, step.step_id, e
            ),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::workflow::StepKey;
    use crate::entities::{application_step, customer::CustomerKind};
    use crate::test_utils::RecordingNotifier;
    use chrono::Utc;

    fn customer(email: &str, whatsapp: Option<&str>) -> customer::Model {
        customer::Model {
            id: 1,
            owner_id: "owner".to_string(),
            name: "Layla".to_string(),
            kind: CustomerKind::Individual,
            email: email.to_string(),
            phone: String::new(),
            whatsapp: whatsapp.map(str::to_string),
            details: None,
            trn: None,
            created_at: Utc::now(),
        }
    }

    fn draft() -> WorkflowDraft {
        let step = |id: i64, position: i32| application_step::Model {
            id,
            application_id: 5,
            label: format!("Step {id}"),
            description: None,
            position,
            is_completed: false,
            is_outsource: false,
            provider_id: None,
            outsource_provider: None,
            expiry_date: None,
            created_at: Utc::now(),
        };
        let mut draft = WorkflowDraft::open(5, vec![step(1, 0), step(2, 1)]);
        draft.set_completed(StepKey::Stored(2), true).unwrap();
        draft
    }

    #[tokio::test]
    async fn test_notifies_each_newly_completed_step() {
        let notifier = RecordingNotifier::default();
        let sent = notify_newly_completed(
            &notifier,
            &customer("layla@example.com", None),
            "Golden Visa",
            &draft(),
        )
        .await;

        assert_eq!(sent, 1);
        let recorded = notifier.sent();
        assert_eq!(recorded[0].step_name, "Step 2");
        assert_eq!(recorded[0].step_number, 2);
        assert_eq!(recorded[0].total_steps, 2);
        assert_eq!(recorded[0].completed_steps, 1);
        assert_eq!(recorded[0].progress_percent, 50);
        assert_eq!(recorded[0].application_id, 5);
        assert_eq!(recorded[0].customer_whatsapp, None);
    }

    #[tokio::test]
    async fn test_skips_customer_without_contact() {
        let notifier = RecordingNotifier::default();
        let sent =
            notify_newly_completed(&notifier, &customer("", Some("  ")), "Visa", &draft()).await;
        assert_eq!(sent, 0);
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let payload = StepNotification {
            customer_name: "A".to_string(),
            customer_email: None,
            customer_whatsapp: None,
            step_name: "S".to_string(),
            step_number: 1,
            total_steps: 1,
            completed_steps: 1,
            progress_percent: 100,
            service_name: "X".to_string(),
            application_id: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["stepNumber"], 1);
        assert_eq!(json["progressPercent"], 100);
    }
}
