use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::monitoring::types::ProbeOutcome;

/// Account that owns one or more monitored sites. Managed by the
/// registration flow; read here only to resolve alert recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// A monitored target. Deactivated sites keep their check history but are
/// excluded from probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub user_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Immutable outcome of one probe. Append-only: rows are never updated or
/// deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: i64,
    pub site_id: i64,
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
    /// The site's active flag as it was at probe time.
    pub site_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A check row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewCheck {
    pub site_id: i64,
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub site_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewCheck {
    /// Build the check row for a probe outcome. A completed response keeps
    /// its real status code even when classified unhealthy; a transport
    /// failure has no status code at all.
    pub fn from_outcome(site: &Site, outcome: &ProbeOutcome, observed_at: DateTime<Utc>) -> Self {
        Self {
            site_id: site.id,
            ok: outcome.is_healthy(),
            status_code: outcome.status_code(),
            latency_ms: outcome.latency_ms(),
            error: outcome.error().map(str::to_string),
            site_active: site.active,
            created_at: observed_at,
        }
    }
}

/// Contact details for the user owning a site, resolved for alerting.
#[derive(Debug, Clone)]
pub struct OwnerContact {
    pub email: String,
    pub full_name: String,
}

/// One check joined to its site, as served by the per-user check queries.
#[derive(Debug, Clone, Serialize)]
pub struct UserCheckRow {
    pub check_id: i64,
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub check_created_at: DateTime<Utc>,
    pub url: String,
    pub site_name: String,
    pub site_created_at: DateTime<Utc>,
    pub site_active: bool,
}

/// Convert a timestamp to the millisecond epoch value stored in the database.
pub fn datetime_to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert a stored millisecond epoch value back to a timestamp.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site {
            id: 7,
            url: "https://example.com".into(),
            name: "Example".into(),
            user_id: 1,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn completed_unhealthy_outcome_keeps_status_code() {
        let outcome = ProbeOutcome::Completed { status_code: 503, latency_ms: 120 };
        let check = NewCheck::from_outcome(&site(), &outcome, Utc::now());

        assert!(!check.ok);
        assert_eq!(check.status_code, Some(503));
        assert!(check.error.is_none());
    }

    #[test]
    fn failed_outcome_records_error_without_status() {
        let outcome = ProbeOutcome::Failed { reason: "dns error".into(), latency_ms: 5000 };
        let check = NewCheck::from_outcome(&site(), &outcome, Utc::now());

        assert!(!check.ok);
        assert_eq!(check.status_code, None);
        assert_eq!(check.error.as_deref(), Some("dns error"));
        assert_eq!(check.latency_ms, 5000);
    }

    #[test]
    fn millis_round_trip_preserves_ordering() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(250);

        assert!(datetime_to_millis(earlier) < datetime_to_millis(later));
        assert_eq!(millis_to_datetime(datetime_to_millis(later)).timestamp_millis(), later.timestamp_millis());
    }
}
