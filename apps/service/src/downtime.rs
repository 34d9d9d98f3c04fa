//! Downtime-interval derivation.
//!
//! Turns a site's check history into discrete outage intervals for the
//! alert timeline. Derived on read, never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::models::CheckRecord;

/// A maximal contiguous run of failing checks for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DowntimeEvent {
    pub site_id: i64,
    pub started_at: DateTime<Utc>,
    /// Timestamp of the first healthy check after the run; `None` while the
    /// outage is still ongoing.
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

impl DowntimeEvent {
    pub fn is_ongoing(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Derive downtime intervals from a check history.
///
/// The input is sorted by creation time before scanning, so callers may pass
/// rows in any order. Events come out in chronological discovery order; an
/// unclosed run at the end of the history yields one ongoing event measured
/// against `now`.
pub fn downtime_events(checks: &[CheckRecord], now: DateTime<Utc>) -> Vec<DowntimeEvent> {
    let mut ordered: Vec<&CheckRecord> = checks.iter().collect();
    ordered.sort_by_key(|check| check.created_at);

    let mut events = Vec::new();
    let mut down_since: Option<(i64, DateTime<Utc>)> = None;

    for check in ordered {
        if !check.ok && down_since.is_none() {
            down_since = Some((check.site_id, check.created_at));
        } else if check.ok {
            if let Some((site_id, started_at)) = down_since.take() {
                events.push(DowntimeEvent {
                    site_id,
                    started_at,
                    ended_at: Some(check.created_at),
                    duration_ms: (check.created_at - started_at).num_milliseconds(),
                });
            }
        }
    }

    if let Some((site_id, started_at)) = down_since {
        events.push(DowntimeEvent {
            site_id,
            started_at,
            ended_at: None,
            duration_ms: (now - started_at).num_milliseconds(),
        });
    }

    events
}
