/// Outbound down-alerts
///
/// Resolves the site owner's contact details, deduplicates per downtime run
/// and hands the message to the mailer. Dispatch failures never block the
/// probe cycle; the caller logs and moves on.
pub mod email;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use self::email::{Mailer, OutboundEmail};
use crate::database::Database;
use crate::database::models::Site;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no owner contact on record for site {site_id}")]
    MissingContact { site_id: i64 },
    #[error("owner lookup failed: {0:#}")]
    ContactLookup(#[source] anyhow::Error),
    #[error("notification state unavailable: {0:#}")]
    State(#[source] anyhow::Error),
    #[error("email dispatch failed: {0:#}")]
    Dispatch(#[source] anyhow::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert the site's owner that its latest check failed. At most one
    /// alert per downtime run.
    async fn notify_down(
        &self,
        site: &Site,
        reason: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<(), NotifyError>;

    /// A healthy check closed the site's downtime run, if one was open.
    async fn mark_recovered(&self, site_id: i64) -> Result<(), NotifyError>;
}

/// Emails the owning user once per outage.
pub struct DownAlertNotifier {
    database: Arc<dyn Database>,
    mailer: Arc<dyn Mailer>,
}

impl DownAlertNotifier {
    pub fn new(database: Arc<dyn Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self { database, mailer }
    }
}

fn down_alert_html(full_name: &str, url: &str, observed_at: DateTime<Utc>) -> String {
    format!(
        "<div>Hello {full_name},</div>\
         <br />\
         <div>Your website is down: {url} at {}</div>\
         <br />\
         <div>Thanks and Regards,<br/>The Pulsemon Team</div>",
        observed_at.format("%a, %d %b %Y %H:%M:%S UTC")
    )
}

#[async_trait]
impl Notifier for DownAlertNotifier {
    async fn notify_down(
        &self,
        site: &Site,
        reason: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        if self.database.notified_run(site.id).await.map_err(NotifyError::State)?.is_some() {
            tracing::debug!(site = site.id, url = %site.url, "outage already alerted, skipping");
            return Ok(());
        }

        let contact = self
            .database
            .site_owner(site.id)
            .await
            .map_err(NotifyError::ContactLookup)?
            .ok_or(NotifyError::MissingContact { site_id: site.id })?;

        let message = OutboundEmail {
            to: contact.email,
            subject: format!("Alert: Your site {} is down", site.url),
            html: down_alert_html(&contact.full_name, &site.url, observed_at),
        };

        self.mailer.send(&message).await.map_err(NotifyError::Dispatch)?;

        // Only mark after a successful send, so a failed dispatch is retried
        // on the next cycle of the same run.
        self.database
            .mark_notified(site.id, observed_at, Utc::now())
            .await
            .map_err(NotifyError::State)?;

        tracing::info!(site = site.id, url = %site.url, reason, "down-alert dispatched");
        Ok(())
    }

    async fn mark_recovered(&self, site_id: i64) -> Result<(), NotifyError> {
        self.database.clear_notified(site_id).await.map_err(NotifyError::State)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use anyhow::{Result, bail};

    use super::email::{Mailer, OutboundEmail};

    /// Mailer that records every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutboundEmail>>,
        pub fail_sends: Mutex<bool>,
    }

    impl RecordingMailer {
        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        pub fn set_failing(&self, failing: bool) {
            *self.fail_sends.lock().unwrap() = failing;
        }
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<()> {
            if *self.fail_sends.lock().unwrap() {
                bail!("simulated provider outage");
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }
}
