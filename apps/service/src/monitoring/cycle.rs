use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{StreamExt, stream};

use super::prober::Prober;
use super::types::{CycleSummary, ProbeOutcome};
use crate::database::Database;
use crate::database::models::{NewCheck, Site};
use crate::notify::Notifier;

/// Drives one probe cycle: roster snapshot, bounded fan-out, one recorded
/// check per site, alerts on failure.
pub struct CycleOrchestrator {
    database: Arc<dyn Database>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    workers: usize,
    include_inactive: bool,
}

impl CycleOrchestrator {
    pub fn new(
        database: Arc<dyn Database>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        workers: usize,
        include_inactive: bool,
    ) -> Self {
        Self { database, prober, notifier, workers, include_inactive }
    }

    /// Visit every roster site exactly once.
    ///
    /// Only a roster read failure aborts the cycle; per-site probe, persist
    /// and notify errors are contained within that site's visit.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let roster =
            self.database.roster(self.include_inactive).await.context("failed to read site roster")?;
        let attempted = roster.len();

        tracing::info!(sites = attempted, "starting probe cycle");

        let outcomes: Vec<bool> = stream::iter(roster)
            .map(|site| self.visit_site(site))
            .buffer_unordered(self.workers.max(1))
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|healthy| **healthy).count();
        let summary = CycleSummary { attempted, succeeded, failed: attempted - succeeded };

        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "probe cycle completed"
        );

        Ok(summary)
    }

    /// Probe, record, alert-or-recover. Returns whether the check was
    /// recorded healthy.
    async fn visit_site(&self, site: Site) -> bool {
        let outcome = self.prober.probe(&site.url).await;
        let observed_at = Utc::now();
        let check = NewCheck::from_outcome(&site, &outcome, observed_at);

        if let Err(error) = self.database.save_check(&check).await {
            tracing::error!(site = site.id, url = %site.url, "failed to record check: {error:#}");
            return false;
        }

        if check.ok {
            if let Err(error) = self.notifier.mark_recovered(site.id).await {
                tracing::warn!(site = site.id, "failed to clear alert state: {error:#}");
            }
            return true;
        }

        let reason = match &outcome {
            ProbeOutcome::Failed { reason, .. } => reason.clone(),
            ProbeOutcome::Completed { status_code, .. } => {
                format!("unhealthy status code {status_code}")
            }
        };

        tracing::warn!(site = site.id, url = %site.url, reason, "check failed");

        if let Err(error) = self.notifier.notify_down(&site, &reason, observed_at).await {
            tracing::warn!(site = site.id, url = %site.url, "down-alert not dispatched: {error:#}");
        }

        false
    }
}
