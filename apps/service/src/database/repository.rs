use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};

use super::models::{
    CheckRecord, NewCheck, OwnerContact, Site, User, UserCheckRow, datetime_to_millis,
    millis_to_datetime,
};
use crate::pool::{LibsqlManager, LibsqlPool};

/// Database trait for abstracting storage operations.
#[async_trait]
pub trait Database: Send + Sync {
    /// The set of sites eligible for probing. Inactive sites are excluded
    /// unless explicitly requested.
    async fn roster(&self, include_inactive: bool) -> Result<Vec<Site>>;

    /// Insert a user, or return the existing row for the same email.
    async fn insert_user(&self, email: &str, full_name: &str) -> Result<User>;

    /// Insert a site, or return the existing row for the same URL.
    async fn insert_site(&self, url: &str, name: &str, user_id: i64) -> Result<Site>;

    /// Toggle a site's active flag. The only supported deactivation; sites
    /// with history are never deleted.
    async fn set_site_active(&self, site_id: i64, active: bool) -> Result<()>;

    /// Contact details of the user owning a site.
    async fn site_owner(&self, site_id: i64) -> Result<Option<OwnerContact>>;

    /// All sites registered by a user, active or not.
    async fn sites_for_user(&self, user_id: i64) -> Result<Vec<Site>>;

    /// Append one check row. Never updates existing rows.
    async fn save_check(&self, check: &NewCheck) -> Result<i64>;

    /// All checks for a user's sites, joined to site metadata, newest first.
    async fn checks_for_user(&self, user_id: i64) -> Result<Vec<UserCheckRow>>;

    /// Checks for one of a user's sites, newest first.
    async fn checks_for_site(&self, user_id: i64, site_id: i64) -> Result<Vec<UserCheckRow>>;

    /// Full check history for one site, oldest first.
    async fn check_history(&self, site_id: i64) -> Result<Vec<CheckRecord>>;

    /// Start timestamp of the downtime run this site has already been
    /// alerted for, if any.
    async fn notified_run(&self, site_id: i64) -> Result<Option<DateTime<Utc>>>;

    /// Record that the ongoing downtime run has been alerted.
    async fn mark_notified(
        &self,
        site_id: i64,
        run_started_at: DateTime<Utc>,
        notified_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Clear the alert marker once the site recovers.
    async fn clear_notified(&self, site_id: i64) -> Result<()>;
}

/// LibSQL-backed implementation.
pub struct LibsqlDatabase {
    pool: LibsqlPool,
}

impl LibsqlDatabase {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn site_from_row(row: &Row) -> Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        user_id: row.get(3)?,
        active: row.get::<i64>(4)? != 0,
        created_at: millis_to_datetime(row.get(5)?),
    })
}

fn check_from_row(row: &Row) -> Result<CheckRecord> {
    Ok(CheckRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        ok: row.get::<i64>(2)? != 0,
        status_code: row.get::<Option<i64>>(3)?.map(|v| v as u16),
        latency_ms: row.get::<i64>(4)? as u64,
        error: row.get(5)?,
        site_active: row.get::<i64>(6)? != 0,
        created_at: millis_to_datetime(row.get(7)?),
    })
}

fn user_check_from_row(row: &Row) -> Result<UserCheckRow> {
    Ok(UserCheckRow {
        check_id: row.get(0)?,
        ok: row.get::<i64>(1)? != 0,
        status_code: row.get::<Option<i64>>(2)?.map(|v| v as u16),
        latency_ms: row.get::<i64>(3)? as u64,
        error: row.get(4)?,
        check_created_at: millis_to_datetime(row.get(5)?),
        url: row.get(6)?,
        site_name: row.get(7)?,
        site_created_at: millis_to_datetime(row.get(8)?),
        site_active: row.get::<i64>(9)? != 0,
    })
}

const USER_CHECK_COLUMNS: &str = "checks.id, checks.ok, checks.status_code, checks.latency_ms, \
     checks.error, checks.created_at, sites.url, sites.name, sites.created_at, sites.active";

#[async_trait]
impl Database for LibsqlDatabase {
    async fn roster(&self, include_inactive: bool) -> Result<Vec<Site>> {
        let conn = self.get_conn().await?;
        let sql = if include_inactive {
            "SELECT id, url, name, user_id, active, created_at FROM sites"
        } else {
            "SELECT id, url, name, user_id, active, created_at FROM sites WHERE active = 1"
        };

        let mut rows = conn.query(sql, ()).await?;
        let mut sites = Vec::new();

        while let Some(row) = rows.next().await? {
            sites.push(site_from_row(&row)?);
        }

        Ok(sites)
    }

    async fn insert_user(&self, email: &str, full_name: &str) -> Result<User> {
        let conn = self.get_conn().await?;
        let now = datetime_to_millis(Utc::now());

        conn.execute(
            "INSERT INTO users (email, full_name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(email) DO NOTHING",
            params![email, full_name, now],
        )
        .await?;

        let mut rows = conn
            .query(
                "SELECT id, email, full_name, created_at FROM users WHERE email = ?",
                params![email],
            )
            .await?;

        let row = rows.next().await?.ok_or_else(|| anyhow::anyhow!("user row missing after insert"))?;

        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            created_at: millis_to_datetime(row.get(3)?),
        })
    }

    async fn insert_site(&self, url: &str, name: &str, user_id: i64) -> Result<Site> {
        let conn = self.get_conn().await?;
        let now = datetime_to_millis(Utc::now());

        conn.execute(
            "INSERT INTO sites (url, name, user_id, active, created_at) VALUES (?, ?, ?, 1, ?)
             ON CONFLICT(url) DO NOTHING",
            params![url, name, user_id, now],
        )
        .await?;

        let mut rows = conn
            .query(
                "SELECT id, url, name, user_id, active, created_at FROM sites WHERE url = ?",
                params![url],
            )
            .await?;

        let row = rows.next().await?.ok_or_else(|| anyhow::anyhow!("site row missing after insert"))?;

        site_from_row(&row)
    }

    async fn set_site_active(&self, site_id: i64, active: bool) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "UPDATE sites SET active = ? WHERE id = ?",
            params![if active { 1 } else { 0 }, site_id],
        )
        .await?;

        Ok(())
    }

    async fn site_owner(&self, site_id: i64) -> Result<Option<OwnerContact>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT users.email, users.full_name
                 FROM users JOIN sites ON users.id = sites.user_id
                 WHERE sites.id = ?",
                params![site_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(OwnerContact { email: row.get(0)?, full_name: row.get(1)? }))
        } else {
            Ok(None)
        }
    }

    async fn sites_for_user(&self, user_id: i64) -> Result<Vec<Site>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, url, name, user_id, active, created_at FROM sites
                 WHERE user_id = ? ORDER BY created_at ASC",
                params![user_id],
            )
            .await?;

        let mut sites = Vec::new();

        while let Some(row) = rows.next().await? {
            sites.push(site_from_row(&row)?);
        }

        Ok(sites)
    }

    async fn save_check(&self, check: &NewCheck) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO checks (site_id, ok, status_code, latency_ms, error, site_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                check.site_id,
                if check.ok { 1 } else { 0 },
                check.status_code.map(|v| v as i64),
                check.latency_ms as i64,
                check.error.clone(),
                if check.site_active { 1 } else { 0 },
                datetime_to_millis(check.created_at)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn checks_for_user(&self, user_id: i64) -> Result<Vec<UserCheckRow>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {USER_CHECK_COLUMNS}
             FROM checks JOIN sites ON checks.site_id = sites.id
             WHERE sites.user_id = ?
             ORDER BY checks.created_at DESC"
        );

        let mut rows = conn.query(&sql, params![user_id]).await?;
        let mut checks = Vec::new();

        while let Some(row) = rows.next().await? {
            checks.push(user_check_from_row(&row)?);
        }

        Ok(checks)
    }

    async fn checks_for_site(&self, user_id: i64, site_id: i64) -> Result<Vec<UserCheckRow>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {USER_CHECK_COLUMNS}
             FROM checks JOIN sites ON checks.site_id = sites.id
             WHERE sites.user_id = ? AND sites.id = ?
             ORDER BY checks.created_at DESC"
        );

        let mut rows = conn.query(&sql, params![user_id, site_id]).await?;
        let mut checks = Vec::new();

        while let Some(row) = rows.next().await? {
            checks.push(user_check_from_row(&row)?);
        }

        Ok(checks)
    }

    async fn check_history(&self, site_id: i64) -> Result<Vec<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, site_id, ok, status_code, latency_ms, error, site_active, created_at
                 FROM checks WHERE site_id = ? ORDER BY created_at ASC",
                params![site_id],
            )
            .await?;

        let mut checks = Vec::new();

        while let Some(row) = rows.next().await? {
            checks.push(check_from_row(&row)?);
        }

        Ok(checks)
    }

    async fn notified_run(&self, site_id: i64) -> Result<Option<DateTime<Utc>>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT run_started_at FROM notification_state WHERE site_id = ?",
                params![site_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(millis_to_datetime(row.get(0)?)))
        } else {
            Ok(None)
        }
    }

    async fn mark_notified(
        &self,
        site_id: i64,
        run_started_at: DateTime<Utc>,
        notified_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO notification_state (site_id, run_started_at, notified_at)
             VALUES (?, ?, ?)
             ON CONFLICT(site_id) DO NOTHING",
            params![site_id, datetime_to_millis(run_started_at), datetime_to_millis(notified_at)],
        )
        .await?;

        Ok(())
    }

    async fn clear_notified(&self, site_id: i64) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute("DELETE FROM notification_state WHERE site_id = ?", params![site_id]).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::create_test_database;
    use crate::monitoring::types::ProbeOutcome;

    async fn seed_site(database: &LibsqlDatabase, url: &str) -> (User, Site) {
        let user = database.insert_user("owner@example.com", "Site Owner").await.unwrap();
        let site = database.insert_site(url, "My Site", user.id).await.unwrap();
        (user, site)
    }

    #[tokio::test]
    async fn roster_excludes_inactive_sites_by_default() {
        let (database, _guard) = create_test_database().await.unwrap();
        let (user, site) = seed_site(&database, "https://one.example").await;
        let other = database.insert_site("https://two.example", "Two", user.id).await.unwrap();

        database.set_site_active(other.id, false).await.unwrap();

        let active_only = database.roster(false).await.unwrap();
        assert_eq!(active_only.len(), 1);
        assert_eq!(active_only[0].id, site.id);

        let everything = database.roster(true).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn insert_site_is_idempotent_on_url() {
        let (database, _guard) = create_test_database().await.unwrap();
        let (user, site) = seed_site(&database, "https://one.example").await;

        let again =
            database.insert_site("https://one.example", "Renamed", user.id).await.unwrap();

        assert_eq!(again.id, site.id);
        assert_eq!(again.name, "My Site");
    }

    #[tokio::test]
    async fn save_check_round_trips_failure_fields() {
        let (database, _guard) = create_test_database().await.unwrap();
        let (_user, site) = seed_site(&database, "https://one.example").await;

        let outcome = ProbeOutcome::Failed { reason: "timed out".into(), latency_ms: 5000 };
        let check = NewCheck::from_outcome(&site, &outcome, Utc::now());
        database.save_check(&check).await.unwrap();

        let history = database.check_history(site.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].ok);
        assert_eq!(history[0].status_code, None);
        assert_eq!(history[0].error.as_deref(), Some("timed out"));
        assert_eq!(history[0].latency_ms, 5000);
        assert!(history[0].site_active);
    }

    #[tokio::test]
    async fn checks_for_user_joins_site_metadata_newest_first() {
        let (database, _guard) = create_test_database().await.unwrap();
        let (user, site) = seed_site(&database, "https://one.example").await;

        let base = Utc::now();
        for (offset_ms, status_code) in [(0, 200), (100, 500)] {
            let outcome = ProbeOutcome::Completed { status_code, latency_ms: 40 };
            let check = NewCheck::from_outcome(
                &site,
                &outcome,
                base + chrono::Duration::milliseconds(offset_ms),
            );
            database.save_check(&check).await.unwrap();
        }

        let rows = database.checks_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status_code, Some(500));
        assert_eq!(rows[0].url, "https://one.example");
        assert_eq!(rows[0].site_name, "My Site");
        assert!(rows[0].check_created_at > rows[1].check_created_at);
    }

    #[tokio::test]
    async fn notification_state_round_trip() {
        let (database, _guard) = create_test_database().await.unwrap();
        let (_user, site) = seed_site(&database, "https://one.example").await;

        assert!(database.notified_run(site.id).await.unwrap().is_none());

        let run_start = Utc::now();
        database.mark_notified(site.id, run_start, run_start).await.unwrap();

        let stored = database.notified_run(site.id).await.unwrap().unwrap();
        assert_eq!(stored.timestamp_millis(), run_start.timestamp_millis());

        // A second mark for the same run must not replace the start.
        database
            .mark_notified(site.id, run_start + chrono::Duration::seconds(60), run_start)
            .await
            .unwrap();
        let unchanged = database.notified_run(site.id).await.unwrap().unwrap();
        assert_eq!(unchanged.timestamp_millis(), run_start.timestamp_millis());

        database.clear_notified(site.id).await.unwrap();
        assert!(database.notified_run(site.id).await.unwrap().is_none());
    }
}
